use crate::application::ports::ConnectivityProbe;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Treats the device as online when the backend health endpoint answers.
pub struct HttpConnectivityProbe {
    client: Client,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs.min(5)))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        let base = config.api.base_url.trim_end_matches('/');
        let path = config.network.health_path.trim_start_matches('/');

        Ok(Self {
            client,
            url: format!("{base}/{path}"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_online(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(target: "sync::network", error = %err, "health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_is_built_from_config() {
        let mut config = AppConfig::default();
        config.api.base_url = "http://api.local/v1/".to_string();
        config.network.health_path = "/health".to_string();

        let probe = HttpConnectivityProbe::new(&config).unwrap();
        assert_eq!(probe.url(), "http://api.local/v1/health");
    }

    #[tokio::test]
    async fn unreachable_backend_reads_as_offline() {
        let mut config = AppConfig::default();
        config.api.base_url = "http://127.0.0.1:9".to_string();
        config.api.timeout_secs = 1;

        let probe = HttpConnectivityProbe::new(&config).unwrap();
        assert!(!probe.is_online().await);
    }
}
