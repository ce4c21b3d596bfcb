pub mod client;
pub mod format;
pub mod reachability;
pub mod relevance;
pub mod validator;

pub use client::NewsApiClient;
pub use reachability::HttpUrlProbe;
pub use validator::{ContentValidator, ValidationOptions};
