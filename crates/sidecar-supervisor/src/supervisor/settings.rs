use std::time::Duration;

use sidecar_config::{
    Config, DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_STARTUP_TIMEOUT,
};

use crate::error::SupervisorError;

/// Timing policy for start and stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Connect timeout of one readiness probe.
    pub probe_timeout: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
    /// Overall readiness budget for one start attempt.
    pub startup_timeout: Duration,
    /// Time between the graceful request and the forced kill.
    pub grace_period: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl SupervisorSettings {
    /// Extracts timing settings from configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            probe_timeout: config.probe_timeout(),
            poll_interval: config.poll_interval(),
            startup_timeout: config.startup_timeout(),
            grace_period: config.grace_period(),
        }
    }

    /// Rejects timings that would make the readiness loop meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] for a zero poll interval or startup
    /// timeout.
    pub const fn validate(&self) -> Result<(), SupervisorError> {
        if self.poll_interval.is_zero() {
            return Err(SupervisorError::ZeroPollInterval);
        }
        if self.startup_timeout.is_zero() {
            return Err(SupervisorError::ZeroStartupTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SupervisorSettings::default().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let settings = SupervisorSettings {
            poll_interval: Duration::ZERO,
            ..SupervisorSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SupervisorError::ZeroPollInterval)
        ));
    }

    #[test]
    fn zero_startup_timeout_is_rejected() {
        let settings = SupervisorSettings {
            startup_timeout: Duration::ZERO,
            ..SupervisorSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SupervisorError::ZeroStartupTimeout)
        ));
    }

    #[test]
    fn config_timings_are_carried_over() {
        let config = Config {
            poll_interval_ms: 50,
            grace_period_ms: 10,
            ..Config::default()
        };
        let settings = SupervisorSettings::from_config(&config);
        assert_eq!(settings.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.grace_period, Duration::from_millis(10));
    }
}
