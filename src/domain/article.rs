use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A news item as it arrives from the feed, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "source_name")]
    pub source: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Feeds send the source either as a plain name or as `{"id", "name"}`.
fn source_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Source {
        Name(String),
        Object { name: Option<String> },
    }

    Ok(match Option::<Source>::deserialize(deserializer)? {
        Some(Source::Name(name)) => Some(name),
        Some(Source::Object { name }) => name,
        None => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub published_at: Option<String>,
    pub relevance_score: u8,
    pub is_reachable: bool,
    pub final_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub total: usize,
    pub valid: usize,
    pub url_failures: usize,
    pub relevance_failures: usize,
    pub format_failures: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub articles: Vec<ValidatedArticle>,
    pub stats: ValidationStats,
    pub checked_at: DateTime<Utc>,
}
