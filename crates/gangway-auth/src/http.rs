//! Shared outbound HTTP client settings.
//!
//! Every client talking to a remote system carries an independent TCP
//! connect timeout and an overall request timeout, so a stalled connect
//! fails fast instead of eating the whole request budget.

use std::time::Duration;

/// Connect/read timeouts for an outbound HTTP client.
#[derive(Debug, Clone, Copy)]
pub struct ClientTimeouts {
    /// TCP connect timeout (default: 10 seconds).
    pub connect_timeout: Duration,
    /// Overall request timeout (default: 30 seconds).
    pub read_timeout: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientTimeouts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Builds a client with these timeouts applied.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .build()
            .expect("Failed to create HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_separate_connect_from_read() {
        let timeouts = ClientTimeouts::default();
        assert_eq!(timeouts.connect_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builders_override_each_timeout_independently() {
        let timeouts = ClientTimeouts::new()
            .with_connect_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_secs(20));
        assert_eq!(timeouts.connect_timeout, Duration::from_secs(2));
        assert_eq!(timeouts.read_timeout, Duration::from_secs(20));
    }
}
