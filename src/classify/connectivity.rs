use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Answers from a fixed flag. Used for `--offline` and when no probe URL is set.
pub struct StaticConnectivity(pub bool);

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.0
    }
}

/// Considers the device online when a HEAD probe gets any HTTP answer.
pub struct HttpConnectivity {
    http: Client,
    probe_url: String,
    timeout: Duration,
}

impl HttpConnectivity {
    pub fn new(http: Client, probe_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            probe_url: probe_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connectivity for HttpConnectivity {
    async fn is_online(&self) -> bool {
        match self
            .http
            .head(&self.probe_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(
                    target: "classify",
                    error = %err,
                    probe = %self.probe_url,
                    "connectivity probe failed"
                );
                false
            }
        }
    }
}
