use std::sync::Arc;

use thiserror::Error;

use crate::{
    ai::RemoteClassifier,
    domain::{ClassificationOutcome, ClassificationResult, ClassificationSource, WasteImage},
};

use super::{category::CategoryMap, connectivity::Connectivity, local::LocalClassifier};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid input image: {0}")]
    InvalidInput(&'static str),
    #[error("local model unavailable and no network connection: {0}")]
    ModelUnavailable(String),
    #[error("cloud classification failed: {0}")]
    Network(String),
}

/// Local model first, cloud fallback when the local answer is weak.
pub struct ClassificationPipeline {
    local: Option<Arc<LocalClassifier>>,
    remote: Arc<dyn RemoteClassifier>,
    connectivity: Arc<dyn Connectivity>,
    threshold: f32,
}

impl ClassificationPipeline {
    pub fn new(
        local: Option<LocalClassifier>,
        remote: Arc<dyn RemoteClassifier>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            local: local.map(Arc::new),
            remote,
            connectivity,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn has_local_model(&self) -> bool {
        self.local.as_ref().map_or(false, |local| local.is_loaded())
    }

    pub async fn classify(&self, image: WasteImage) -> Result<ClassificationOutcome, ClassifyError> {
        if image.bytes.is_empty() {
            return Err(ClassifyError::InvalidInput("image is empty"));
        }
        if !image.is_valid() {
            return Err(ClassifyError::InvalidInput("payload is not an image"));
        }

        let local = match &self.local {
            Some(local) if local.is_loaded() => self.run_local(local.clone(), image.clone()).await,
            _ => Err("no local model loaded".to_string()),
        };

        match local {
            Ok(result) => {
                if result.confidence() >= self.threshold {
                    tracing::info!(
                        target: "classify",
                        label = %result.raw_label(),
                        category = %result.category(),
                        confidence = result.confidence(),
                        "accepted local classification"
                    );
                    return Ok(local_outcome(result));
                }
                if !self.connectivity.is_online().await {
                    tracing::info!(
                        target: "classify",
                        confidence = result.confidence(),
                        "low confidence but offline; keeping local classification"
                    );
                    return Ok(local_outcome(result));
                }
                tracing::info!(
                    target: "classify",
                    confidence = result.confidence(),
                    threshold = self.threshold,
                    "local confidence below threshold; escalating to cloud"
                );
                self.run_remote(&image).await
            }
            Err(reason) => {
                if !self.connectivity.is_online().await {
                    return Err(ClassifyError::ModelUnavailable(reason));
                }
                tracing::info!(target: "classify", reason = %reason, "using cloud classifier only");
                self.run_remote(&image).await
            }
        }
    }

    async fn run_local(
        &self,
        local: Arc<LocalClassifier>,
        image: WasteImage,
    ) -> Result<ClassificationResult, String> {
        match tokio::task::spawn_blocking(move || local.classify(&image)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => {
                tracing::warn!(target: "classify", error = %err, "local inference failed");
                Err(format!("{err:#}"))
            }
            Err(err) => {
                tracing::error!(target: "classify", error = %err, "local inference task aborted");
                Err(err.to_string())
            }
        }
    }

    async fn run_remote(&self, image: &WasteImage) -> Result<ClassificationOutcome, ClassifyError> {
        let remote = self
            .remote
            .classify(image)
            .await
            .map_err(|err| ClassifyError::Network(format!("{err:#}")))?;
        let category = CategoryMap::global().map(&remote.trash_type);
        Ok(ClassificationOutcome {
            result: ClassificationResult::new(remote.trash_type, category, remote.confidence),
            description: remote.description,
            source: ClassificationSource::Remote,
        })
    }

    /// Releases the local model, if any.
    pub fn close(&self) {
        if let Some(local) = &self.local {
            local.close();
        }
    }
}

fn local_outcome(result: ClassificationResult) -> ClassificationOutcome {
    ClassificationOutcome {
        result,
        description: None,
        source: ClassificationSource::Local,
    }
}
