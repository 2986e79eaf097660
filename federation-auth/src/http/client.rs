//! HTTP client builder for provider calls.

use std::time::Duration;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout. A timed-out call fails like any other transport failure.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("federation-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for the HTTP client shared by the token exchanger and user-info fetcher.
///
/// Requests are never retried; a failed provider call ends the login attempt.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    pub fn from_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("federation-auth/"));
    }

    #[test]
    fn test_builder_keeps_custom_config() {
        let builder = HttpClientBuilder::from_config(HttpClientConfig {
            timeout: Duration::from_secs(5),
            user_agent: "chat/1.0".to_string(),
        });
        assert_eq!(builder.config.timeout, Duration::from_secs(5));
        assert_eq!(builder.config.user_agent, "chat/1.0");
    }

    #[tokio::test]
    async fn test_build_client() {
        let result = HttpClientBuilder::from_config(HttpClientConfig::default()).build();
        assert!(result.is_ok());
    }
}
