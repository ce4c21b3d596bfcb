use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse waste class every specific label is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteCategory {
    Organic,
    Inorganic,
    Hazardous,
}

impl WasteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Organic => "organic",
            WasteCategory::Inorganic => "inorganic",
            WasteCategory::Hazardous => "hazardous",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    raw_label: String,
    category: WasteCategory,
    confidence: f32,
}

impl ClassificationResult {
    pub fn new(raw_label: impl Into<String>, category: WasteCategory, confidence: f32) -> Self {
        Self {
            raw_label: raw_label.into(),
            category,
            confidence: clamp_confidence(confidence),
        }
    }

    pub fn raw_label(&self) -> &str {
        &self.raw_label
    }

    pub fn category(&self) -> WasteCategory {
        self.category
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// What the pipeline hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationOutcome {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub description: Option<String>,
    pub source: ClassificationSource,
}

/// An encoded image already scaled down by the caller.
#[derive(Debug, Clone)]
pub struct WasteImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl WasteImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.bytes.is_empty() && self.mime_type.starts_with("image/")
    }
}

pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
