//! Client configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Program invoked when none is configured
pub const DEFAULT_PROGRAM: &str = "fabric-ca-client";

/// Wall-clock limit for one CA invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How the CA client program is invoked
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Program to run (looked up on `PATH` when not absolute)
    pub program: PathBuf,

    /// Timeout applied to each invocation
    pub timeout: Duration,

    /// Whether to keep a registration ledger
    pub track_registrations: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Default configuration: `fabric-ca-client`, 60s timeout, ledger on
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            timeout: DEFAULT_TIMEOUT,
            track_registrations: true,
        }
    }

    /// Set the program to run
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the per-invocation timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable the registration ledger
    #[must_use]
    pub fn track_registrations(mut self, enabled: bool) -> Self {
        self.track_registrations = enabled;
        self
    }
}
