use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::{config::NewsConfig, domain::CandidateArticle};

/// Pulls candidate articles from a NewsAPI-compatible `everything` endpoint.
#[derive(Clone)]
pub struct NewsApiClient {
    http: Client,
    config: NewsConfig,
}

impl NewsApiClient {
    pub fn new(http: Client, config: NewsConfig) -> Self {
        Self { http, config }
    }

    pub async fn fetch_candidates(&self, query: &str, page_size: u32) -> Result<Vec<CandidateArticle>> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .context("NEWS_API_KEY must be configured to fetch articles")?;

        let page_size = page_size.clamp(1, 100).to_string();
        let response = self
            .http
            .get(&self.config.api_url)
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", query),
                ("language", self.config.language.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .timeout(self.config.timeout)
            .send()
            .await
            .context("news api request failed")?;

        let status = response.status();
        let body: NewsApiResponse = response.json().await?;
        if !status.is_success() || body.status != "ok" {
            bail!(
                "news api returned {}: {}",
                status,
                body.message.unwrap_or_else(|| "no message".into())
            );
        }

        let articles = body.articles;
        tracing::info!(target: "news", query, fetched = articles.len(), "candidate articles fetched");
        Ok(articles)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<CandidateArticle>,
}
