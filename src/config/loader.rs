use std::{env, str::FromStr, time::Duration};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, GeminiConfig, LoggingConfig, ModelConfig, NewsConfig,
    ValidatorConfig,
};
use crate::{
    classify::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INFERENCE_TIMEOUT},
    news::{
        relevance::DEFAULT_MIN_SCORE,
        validator::{DEFAULT_MAX_WORKERS, DEFAULT_TASK_TIMEOUT},
    },
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let gemini = GeminiConfig {
            api_key: non_empty("GEMINI_API_KEY"),
            api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            timeout: Duration::from_millis(parse_or("GEMINI_TIMEOUT_MS", 30_000u64)?),
        };

        let news = NewsConfig {
            api_key: non_empty("NEWS_API_KEY"),
            api_url: env::var("NEWS_API_URL")
                .unwrap_or_else(|_| "https://newsapi.org/v2/everything".to_string()),
            language: env::var("NEWS_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            timeout: Duration::from_millis(parse_or("NEWS_TIMEOUT_MS", 15_000u64)?),
        };

        let confidence_threshold = parse_or("CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD)?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(ConfigError::Invalid {
                key: "CONFIDENCE_THRESHOLD",
                value: confidence_threshold.to_string(),
            });
        }

        let model = ModelConfig {
            command: non_empty("LOCAL_MODEL_COMMAND"),
            labels_path: env::var("MODEL_LABELS_PATH")
                .unwrap_or_else(|_| "model/labels.txt".to_string()),
            confidence_threshold,
            connectivity_probe_url: match env::var("CONNECTIVITY_PROBE_URL") {
                Ok(value) if value.trim().is_empty() => None,
                Ok(value) => Some(value),
                Err(_) => Some("https://clients3.google.com/generate_204".to_string()),
            },
            inference_timeout: millis_or("LOCAL_MODEL_TIMEOUT_MS", DEFAULT_INFERENCE_TIMEOUT)?,
        };

        let validator = ValidatorConfig {
            min_relevance: parse_or("MIN_RELEVANCE_SCORE", DEFAULT_MIN_SCORE)?.min(100),
            max_workers: parse_or("URL_CHECK_WORKERS", DEFAULT_MAX_WORKERS)?.max(1),
            task_timeout: millis_or("URL_CHECK_TIMEOUT_MS", DEFAULT_TASK_TIMEOUT)?,
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            gemini,
            news,
            model,
            validator,
            directories,
            logging,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(default),
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn millis_or(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = parse_or(key, default.as_millis() as u64)?;
    if millis == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: millis.to_string(),
        });
    }
    Ok(Duration::from_millis(millis))
}
