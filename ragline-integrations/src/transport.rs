//! Explicit transport settings for every outgoing HTTP client.
//!
//! Certificate verification is a property of the client built here and never of the process.
//! Every integration takes its `reqwest::Client` from a [`TransportConfig`], so disabling
//! verification for one endpoint does not affect any other connection.
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Verify TLS certificates. Only disable for endpoints behind self-signed certificates.
    pub verify_tls: bool,
    /// Per request timeout
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Builds a client honouring this configuration.
    ///
    /// # Errors
    ///
    /// Errors if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        if !self.verify_tls {
            tracing::warn!("TLS certificate verification is disabled for this client");
        }

        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!self.verify_tls)
            .user_agent(concat!("ragline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build http client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_verify_tls() {
        let config = TransportConfig::default();
        assert!(config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builds_client_without_verification() {
        let config = TransportConfig::default()
            .with_verify_tls(false)
            .with_timeout(Duration::from_secs(5));
        assert!(config.http_client().is_ok());
    }
}
