//! Coordinator configuration.

use std::time::Duration;

/// Configuration for the sync coordinator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Engine host name or address.
    pub host: String,
    /// Engine HTTP port.
    pub port: u16,
    /// Target company; `None` uses the engine's active company.
    pub company: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Timeout for reachability probes.
    pub probe_timeout: Duration,
    /// How often the background scheduler probes while offline and drains
    /// while online.
    pub sync_interval: Duration,
    /// Attempts after which a drain halts on a stuck entry and waits for
    /// an operator.
    pub max_attempts: u32,
}

impl SyncConfig {
    /// Configuration for an engine at the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            company: None,
            timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(2),
            sync_interval: Duration::from_secs(30),
            max_attempts: 8,
        }
    }

    /// Sets the target company.
    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the probe timeout.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the background sync interval.
    #[must_use]
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the stuck-entry attempt limit.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("localhost", 9000)
    }
}
