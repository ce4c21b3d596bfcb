use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::Utc;
use futures::{stream, StreamExt};
use thiserror::Error;
use tokio::time::{timeout, Instant};

use crate::domain::{CandidateArticle, ValidatedArticle, ValidationReport, ValidationStats};

use super::{
    format,
    reachability::{ProbeOutcome, UrlProbe},
    relevance,
};

pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("article batch is empty")]
    EmptyBatch,
    #[error("url check worker failed: {0}")]
    Executor(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions {
    pub min_relevance: u8,
    pub sort_by_relevance: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            min_relevance: relevance::DEFAULT_MIN_SCORE,
            sort_by_relevance: false,
        }
    }
}

struct Candidate {
    article: CandidateArticle,
    title: String,
    url: String,
    score: u8,
}

pub struct ContentValidator {
    probe: Arc<dyn UrlProbe>,
    max_workers: usize,
    task_timeout: Duration,
}

impl ContentValidator {
    pub fn new(probe: Arc<dyn UrlProbe>) -> Self {
        Self {
            probe,
            max_workers: DEFAULT_MAX_WORKERS,
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    pub async fn validate(
        &self,
        batch: Vec<CandidateArticle>,
        options: ValidationOptions,
    ) -> Result<ValidationReport, ValidationError> {
        if batch.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        let started = Instant::now();
        let total = batch.len();
        let mut format_failures = 0;
        let mut relevance_failures = 0;
        let mut seen_urls = HashSet::new();
        let mut candidates = Vec::new();

        for article in batch {
            if let Err(reason) = format::check(&article) {
                tracing::debug!(target: "news", title = ?article.title, %reason, "article rejected");
                format_failures += 1;
                continue;
            }
            let (Some(title), Some(url)) = (article.title.clone(), article.url.clone()) else {
                format_failures += 1;
                continue;
            };
            let title = title.trim().to_string();
            let url = url.trim().to_string();
            if !seen_urls.insert(url.clone()) {
                tracing::debug!(target: "news", url = %url, "duplicate article url");
                format_failures += 1;
                continue;
            }

            let score = relevance::score(&title, article.description.as_deref());
            if score < options.min_relevance {
                tracing::debug!(target: "news", title = %title, score, "article not relevant enough");
                relevance_failures += 1;
                continue;
            }
            candidates.push(Candidate {
                article,
                title,
                url,
                score,
            });
        }

        let outcomes = self.check_urls(&candidates).await?;

        let mut url_failures = 0;
        let mut articles = Vec::with_capacity(candidates.len());
        for (candidate, outcome) in candidates.into_iter().zip(outcomes) {
            if !outcome.reachable {
                tracing::debug!(target: "news", url = %candidate.url, status = ?outcome.status, "article url unreachable");
                url_failures += 1;
                continue;
            }
            articles.push(ValidatedArticle {
                title: candidate.title,
                description: candidate.article.description,
                url: candidate.url,
                source: candidate.article.source,
                published_at: candidate.article.published_at,
                relevance_score: candidate.score,
                is_reachable: true,
                final_url: outcome.final_url,
            });
        }

        if options.sort_by_relevance {
            articles.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        }

        let stats = ValidationStats {
            total,
            valid: articles.len(),
            url_failures,
            relevance_failures,
            format_failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            target: "news",
            total = stats.total,
            valid = stats.valid,
            format_failures = stats.format_failures,
            relevance_failures = stats.relevance_failures,
            url_failures = stats.url_failures,
            elapsed_ms = stats.elapsed_ms,
            "article batch validated"
        );

        Ok(ValidationReport {
            articles,
            stats,
            checked_at: Utc::now(),
        })
    }

    /// One spawned check per URL, at most `max_workers` in flight. Results come
    /// back in input order.
    async fn check_urls(&self, candidates: &[Candidate]) -> Result<Vec<ProbeOutcome>, ValidationError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let workers = candidates.len().min(self.max_workers);
        let task_timeout = self.task_timeout;

        let joined = stream::iter(candidates.iter().map(|c| c.url.clone()))
            .map(|url| {
                let probe = self.probe.clone();
                tokio::spawn(async move {
                    match timeout(task_timeout, probe.probe(&url)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            tracing::debug!(target: "news", url = %url, "url check timed out");
                            ProbeOutcome::unreachable()
                        }
                    }
                })
            })
            .buffered(workers)
            .collect::<Vec<_>>()
            .await;

        joined
            .into_iter()
            .map(|result| result.map_err(ValidationError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FakeProbe {
        dead: Vec<&'static str>,
        slow: Vec<&'static str>,
        panics_on: Option<&'static str>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UrlProbe for FakeProbe {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.slow.iter().any(|s| *s == url) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.panics_on == Some(url) {
                panic!("probe blew up");
            }
            if self.dead.iter().any(|d| *d == url) {
                ProbeOutcome {
                    reachable: false,
                    status: Some(404),
                    final_url: Some(url.to_string()),
                }
            } else {
                ProbeOutcome {
                    reachable: true,
                    status: Some(200),
                    final_url: Some(url.to_string()),
                }
            }
        }
    }

    fn article(title: &str, description: &str, url: &str) -> CandidateArticle {
        CandidateArticle {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            url: Some(url.to_string()),
            source: Some("Mongabay".to_string()),
            published_at: Some("2024-05-01T08:00:00Z".to_string()),
        }
    }

    fn mixed_batch() -> Vec<CandidateArticle> {
        vec![
            article(
                "Volunteers clear plastic from the river",
                "A weekend cleanup collected two tonnes of trash.",
                "https://news.mongabay.com/2024/05/river-cleanup",
            ),
            article("[Removed]", "[Removed]", "https://removed.com"),
            article(
                "Volunteers clear plastic from the river",
                "Copy of the same story.",
                "https://example.com/story",
            ),
            article(
                "Stock markets rally on strong earnings",
                "Tech shares led the gains.",
                "https://www.reuters.com/markets/rally",
            ),
            article(
                "Plogging craze turns joggers into litter pickers",
                "Plogging combines jogging with picking up litter and waste.",
                "https://www.theguardian.com/environment/plogging",
            ),
            article(
                "Microplastic found in coastal beach sand",
                "Researchers measured plastic pollution along the beach.",
                "https://www.dead-site.org/beach-microplastic",
            ),
        ]
    }

    fn validator(probe: Arc<FakeProbe>) -> ContentValidator {
        ContentValidator::new(probe)
    }

    #[tokio::test]
    async fn stages_filter_and_count_failures() {
        let probe = Arc::new(FakeProbe {
            dead: vec!["https://www.dead-site.org/beach-microplastic"],
            ..Default::default()
        });
        let report = validator(probe.clone())
            .validate(mixed_batch(), ValidationOptions::default())
            .await
            .unwrap();

        assert_eq!(report.stats.total, 6);
        assert_eq!(report.stats.format_failures, 2);
        assert_eq!(report.stats.relevance_failures, 1);
        assert_eq!(report.stats.url_failures, 1);
        assert_eq!(report.stats.valid, 2);
        assert_eq!(report.articles.len(), 2);
        assert!(report.articles.iter().all(|a| a.is_reachable));
        assert!(report.articles.iter().all(|a| a.relevance_score <= 100));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn sorting_orders_by_score_descending() {
        let probe = Arc::new(FakeProbe::default());
        let options = ValidationOptions {
            sort_by_relevance: true,
            ..Default::default()
        };
        let report = validator(probe).validate(mixed_batch(), options).await.unwrap();
        let scores: Vec<u8> = report.articles.iter().map(|a| a.relevance_score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(scores, sorted);
        assert_eq!(report.articles.len(), 3);
    }

    #[tokio::test]
    async fn validating_twice_gives_the_same_result() {
        let probe = Arc::new(FakeProbe {
            dead: vec!["https://www.dead-site.org/beach-microplastic"],
            ..Default::default()
        });
        let validator = validator(probe);
        let first = validator
            .validate(mixed_batch(), ValidationOptions::default())
            .await
            .unwrap();
        let second = validator
            .validate(mixed_batch(), ValidationOptions::default())
            .await
            .unwrap();
        assert_eq!(first.articles, second.articles);
    }

    #[tokio::test]
    async fn empty_batch_is_an_input_error() {
        let err = validator(Arc::new(FakeProbe::default()))
            .validate(Vec::new(), ValidationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyBatch));
    }

    #[tokio::test]
    async fn slow_url_counts_as_unreachable() {
        let slow = "https://www.theguardian.com/environment/plogging";
        let probe = Arc::new(FakeProbe {
            slow: vec![slow],
            ..Default::default()
        });
        let report = validator(probe)
            .with_task_timeout(Duration::from_millis(200))
            .validate(mixed_batch(), ValidationOptions::default())
            .await
            .unwrap();
        assert_eq!(report.stats.url_failures, 1);
        assert!(report.articles.iter().all(|a| a.url != slow));
    }

    #[tokio::test]
    async fn in_flight_checks_are_bounded() {
        let batch: Vec<CandidateArticle> = (0..12)
            .map(|i| {
                article(
                    &format!("Beach cleanup number {i} collects plastic waste"),
                    "Volunteers removed litter.",
                    &format!("https://www.localnews.id/cleanup/{i}"),
                )
            })
            .collect();
        let probe = Arc::new(FakeProbe::default());
        let report = validator(probe.clone())
            .validate(batch, ValidationOptions::default())
            .await
            .unwrap();
        assert_eq!(report.stats.valid, 12);
        assert!(probe.peak.load(Ordering::SeqCst) <= DEFAULT_MAX_WORKERS);
    }

    #[tokio::test]
    async fn duplicate_urls_are_rejected_after_the_first() {
        let story = article(
            "Plogging craze turns joggers into litter pickers",
            "Plogging combines jogging with picking up litter.",
            "https://www.theguardian.com/environment/plogging",
        );
        let report = validator(Arc::new(FakeProbe::default()))
            .validate(vec![story.clone(), story], ValidationOptions::default())
            .await
            .unwrap();
        assert_eq!(report.stats.valid, 1);
        assert_eq!(report.stats.format_failures, 1);
    }

    #[tokio::test]
    async fn crashed_worker_surfaces_as_executor_error() {
        let probe = Arc::new(FakeProbe {
            panics_on: Some("https://www.theguardian.com/environment/plogging"),
            ..Default::default()
        });
        let err = validator(probe)
            .validate(mixed_batch(), ValidationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::Executor(_)));
    }
}
