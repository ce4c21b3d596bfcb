use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    ai::GeminiClient,
    classify::{
        ClassificationPipeline, CommandBackend, Connectivity, HttpConnectivity, LocalClassifier,
        StaticConnectivity,
    },
    cli::{guess_mime, Command},
    config::AppConfig,
    domain::{CandidateArticle, WasteImage},
    infrastructure::directories::ResolvedPaths,
    news::{ContentValidator, HttpUrlProbe, NewsApiClient, ValidationOptions},
};

const CONNECTIVITY_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct EcoSortifyApp {
    config: Arc<AppConfig>,
    paths: ResolvedPaths,
    http: Client,
}

/// Article files may be a bare array or a saved NewsAPI response.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleFile {
    List(Vec<CandidateArticle>),
    Feed { articles: Vec<CandidateArticle> },
}

impl EcoSortifyApp {
    pub fn initialize(config: AppConfig, paths: ResolvedPaths) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("ecosortify/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            paths,
            http,
        })
    }

    pub async fn run(self, command: Command) -> Result<()> {
        tokio::select! {
            res = self.dispatch(command) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted; aborting");
                bail!("interrupted")
            }
        }
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Classify {
                image,
                mime,
                offline,
            } => self.classify(&image, mime, offline).await,
            Command::Validate {
                input,
                query,
                page_size,
                sort,
                min_score,
            } => {
                let batch = match (input, query) {
                    (Some(path), _) => read_articles(&path).await?,
                    (None, Some(query)) => {
                        NewsApiClient::new(self.http.clone(), self.config.news.clone())
                            .fetch_candidates(&query, page_size)
                            .await?
                    }
                    (None, None) => bail!("either --input or --query is required"),
                };
                let options = ValidationOptions {
                    min_relevance: min_score.unwrap_or(self.config.validator.min_relevance),
                    sort_by_relevance: sort,
                };
                self.validate(batch, options).await
            }
        }
    }

    async fn classify(&self, path: &Path, mime: Option<String>, offline: bool) -> Result<()> {
        let mime_type = match mime {
            Some(mime) => mime,
            None => guess_mime(path)
                .with_context(|| format!("cannot guess image type of {}; pass --mime", path.display()))?
                .to_string(),
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let connectivity: Arc<dyn Connectivity> = match (&self.config.model.connectivity_probe_url, offline) {
            (_, true) => Arc::new(StaticConnectivity(false)),
            (Some(url), false) => Arc::new(HttpConnectivity::new(
                self.http.clone(),
                url.clone(),
                CONNECTIVITY_PROBE_TIMEOUT,
            )),
            (None, false) => Arc::new(StaticConnectivity(true)),
        };

        let pipeline = ClassificationPipeline::new(
            self.load_local_model(),
            Arc::new(GeminiClient::new(self.http.clone(), self.config.gemini.clone())),
            connectivity,
        )
        .with_threshold(self.config.model.confidence_threshold);
        tracing::info!(
            target: "classify",
            local_model = pipeline.has_local_model(),
            offline,
            "classifying {}",
            path.display()
        );

        let outcome = pipeline.classify(WasteImage::new(bytes, mime_type)).await;
        pipeline.close();
        print_json(&outcome?)
    }

    fn load_local_model(&self) -> Option<LocalClassifier> {
        let backend = self
            .config
            .model
            .command
            .as_deref()
            .and_then(|line| CommandBackend::from_command_line(line, self.config.model.inference_timeout))?;
        match LocalClassifier::load(&self.paths.labels_path, Arc::new(backend)) {
            Ok(local) => {
                tracing::debug!(target: "classify", labels = ?local.labels(), "local model ready");
                Some(local)
            }
            Err(err) => {
                tracing::warn!(
                    target: "classify",
                    error = %err,
                    "local model unavailable; cloud classification only"
                );
                None
            }
        }
    }

    async fn validate(&self, batch: Vec<CandidateArticle>, options: ValidationOptions) -> Result<()> {
        let validator = ContentValidator::new(Arc::new(HttpUrlProbe::new()?))
            .with_max_workers(self.config.validator.max_workers)
            .with_task_timeout(self.config.validator.task_timeout);
        let report = validator.validate(batch, options).await?;
        print_json(&report)
    }
}

async fn read_articles(path: &Path) -> Result<Vec<CandidateArticle>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: ArticleFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not an article list", path.display()))?;
    Ok(match file {
        ArticleFile::List(articles) | ArticleFile::Feed { articles } => articles,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_bare_lists_and_saved_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        tokio::fs::write(
            &list,
            r#"[{"title": "River cleanup", "url": "https://news.mongabay.com/x"}]"#,
        )
        .await
        .unwrap();
        let feed = dir.path().join("feed.json");
        tokio::fs::write(
            &feed,
            r#"{"status": "ok", "articles": [{"title": "A"}, {"title": "B", "publishedAt": "2024-01-01"}]}"#,
        )
        .await
        .unwrap();

        let from_list = read_articles(&list).await.unwrap();
        assert_eq!(from_list.len(), 1);
        assert_eq!(from_list[0].url.as_deref(), Some("https://news.mongabay.com/x"));

        let from_feed = read_articles(&feed).await.unwrap();
        assert_eq!(from_feed.len(), 2);
        assert_eq!(from_feed[1].published_at.as_deref(), Some("2024-01-01"));
    }

    #[tokio::test]
    async fn rejects_non_article_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, r#"{"hello": "world"}"#).await.unwrap();
        assert!(read_articles(&path).await.is_err());
    }
}
