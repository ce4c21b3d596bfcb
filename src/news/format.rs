use thiserror::Error;
use url::Url;

use crate::domain::CandidateArticle;

const MIN_TITLE_CHARS: usize = 10;
const MIN_URL_CHARS: usize = 12;

const URL_BLACKLIST: &[&str] = &[
    "removed",
    "deleted",
    "404",
    "not-found",
    "notfound",
    "page-not-found",
    "unavailable",
    "/error",
];

const BLOCKED_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "localhost",
    "127.0.0.1",
    "removed.com",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatRejection {
    #[error("title is missing")]
    MissingTitle,
    #[error("title is too short")]
    ShortTitle,
    #[error("title marks a removed article")]
    RemovedTitle,
    #[error("url is missing")]
    MissingUrl,
    #[error("url is not a valid http(s) address")]
    BadUrl,
    #[error("url is too short")]
    ShortUrl,
    #[error("url contains blacklisted fragment {0:?}")]
    BlacklistedUrl(&'static str),
    #[error("url host {0} is blocked")]
    BlockedDomain(String),
}

pub fn check(article: &CandidateArticle) -> Result<(), FormatRejection> {
    check_title(article.title.as_deref())?;
    check_url(article.url.as_deref())
}

fn check_title(title: Option<&str>) -> Result<(), FormatRejection> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(FormatRejection::MissingTitle);
    }
    let lowered = title.to_lowercase();
    if lowered == "[removed]" || lowered.contains("removed") {
        return Err(FormatRejection::RemovedTitle);
    }
    if title.chars().count() < MIN_TITLE_CHARS {
        return Err(FormatRejection::ShortTitle);
    }
    Ok(())
}

fn check_url(raw: Option<&str>) -> Result<(), FormatRejection> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(FormatRejection::MissingUrl);
    }
    if raw.len() < MIN_URL_CHARS {
        return Err(FormatRejection::ShortUrl);
    }

    let url = match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return Err(FormatRejection::BadUrl),
    };

    let lowered = raw.to_lowercase();
    if let Some(fragment) = URL_BLACKLIST.iter().find(|f| lowered.contains(**f)) {
        return Err(FormatRejection::BlacklistedUrl(*fragment));
    }

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
        .ok_or(FormatRejection::BadUrl)?;
    if BLOCKED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    {
        return Err(FormatRejection::BlockedDomain(host));
    }
    Ok(())
}
