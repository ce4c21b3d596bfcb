use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;
const PROBE_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; EcoSortifyLinkCheck/0.1; +https://github.com/ecosortify)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub reachable: bool,
    pub status: Option<u16>,
    pub final_url: Option<String>,
}

impl ProbeOutcome {
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            status: None,
            final_url: None,
        }
    }
}

/// Checks whether a URL currently answers. Failures are reported as
/// unreachable, never as errors.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

pub struct HttpUrlProbe {
    client: Client,
}

impl HttpUrlProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(PROBE_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UrlProbe for HttpUrlProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                let outcome = ProbeOutcome {
                    reachable: status.is_success(),
                    status: Some(status.as_u16()),
                    final_url: Some(response.url().to_string()),
                };
                if !outcome.reachable {
                    tracing::debug!(target: "news", url, status = status.as_u16(), "url check failed");
                }
                outcome
            }
            Err(err) => {
                tracing::debug!(
                    target: "news",
                    url,
                    error = %err,
                    timeout = err.is_timeout(),
                    "url check errored"
                );
                ProbeOutcome::unreachable()
            }
        }
    }
}
