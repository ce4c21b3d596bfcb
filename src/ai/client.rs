use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::{config::GeminiConfig, domain::WasteImage};

use super::inference::{
    build_request, parse_classification, response_text, GenerateContentResponse,
    RemoteClassification,
};

#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(&self, image: &WasteImage) -> Result<RemoteClassification>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl RemoteClassifier for GeminiClient {
    async fn classify(&self, image: &WasteImage) -> Result<RemoteClassification> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .context("GEMINI_API_KEY must be configured for cloud classification")?;

        let request = build_request(image);
        tracing::debug!(target: "ai", model = %self.config.model, bytes = image.bytes.len(), "sending image to generative endpoint");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .context("generative endpoint request failed")?
            .error_for_status()?;

        let body: GenerateContentResponse = response.json().await?;
        let text = response_text(body)?;
        let classification = parse_classification(&text);
        tracing::info!(
            target: "ai",
            trash_type = %classification.trash_type,
            confidence = classification.confidence,
            "cloud classification received"
        );
        Ok(classification)
    }
}
