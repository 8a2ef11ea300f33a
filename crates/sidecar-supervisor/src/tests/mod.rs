//! Supervisor test suites.
//!
//! - `support`: recording fakes for the probe, resolver and spawner.
//! - `unit`: lifecycle properties exercised with the fakes.
//! - `process`: Unix coverage against real child processes.
//! - `behaviour`: Gherkin scenarios in `tests/features/`.

mod support;
