use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub news: NewsConfig,
    pub model: ModelConfig,
    pub validator: ValidatorConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub language: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub command: Option<String>,
    pub labels_path: String,
    pub confidence_threshold: f32,
    pub connectivity_probe_url: Option<String>,
    pub inference_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub min_relevance: u8,
    pub max_workers: usize,
    pub task_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for environment variable {key}")]
    Invalid { key: &'static str, value: String },
}
