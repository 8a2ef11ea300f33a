//! Bounded TCP readiness checks.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::trace;

use crate::PROBE_TARGET;
use crate::error::ProbeError;

/// One-shot check of whether the backend accepts connections.
///
/// Implementations never retry; the caller owns the retry policy.
pub trait ReadinessProbe: Send + Sync {
    /// Returns `true` when the backend accepted a connection.
    fn probe(&self) -> bool;
}

/// Probe that opens and immediately closes a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: SocketAddr,
    timeout: Duration,
}

impl TcpProbe {
    /// Resolves `host:port` once and builds a probe for it.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the address cannot be resolved or the
    /// timeout is zero.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, ProbeError> {
        if timeout.is_zero() {
            return Err(ProbeError::ZeroTimeout);
        }
        let mut addresses =
            (host, port)
                .to_socket_addrs()
                .map_err(|source| ProbeError::Resolve {
                    host: host.to_owned(),
                    port,
                    source,
                })?;
        let address = addresses.next().ok_or_else(|| ProbeError::NoAddress {
            host: host.to_owned(),
            port,
        })?;
        Ok(Self::from_address(address, timeout))
    }

    /// Builds a probe for an already resolved address.
    #[must_use]
    pub const fn from_address(address: SocketAddr, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    /// Address the probe connects to.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }
}

impl ReadinessProbe for TcpProbe {
    fn probe(&self) -> bool {
        match TcpStream::connect_timeout(&self.address, self.timeout) {
            Ok(stream) => {
                drop(stream);
                trace!(target: PROBE_TARGET, address = %self.address, "probe connected");
                true
            }
            Err(error) => {
                trace!(
                    target: PROBE_TARGET,
                    address = %self.address,
                    %error,
                    "probe failed"
                );
                false
            }
        }
    }
}
