use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ecosortify",
    version,
    about = "Classify litter photos and validate environmental news feeds"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify a photo of a piece of litter.
    Classify {
        /// Path to the (already scaled) image.
        image: PathBuf,
        /// MIME type; guessed from the file extension when omitted.
        #[arg(long)]
        mime: Option<String>,
        /// Pretend the network is unreachable.
        #[arg(long)]
        offline: bool,
    },
    /// Filter, score and link-check a batch of news articles.
    Validate {
        /// JSON file holding an array of articles (or a NewsAPI response).
        #[arg(long, required_unless_present = "query", conflicts_with = "query")]
        input: Option<PathBuf>,
        /// Fetch candidates from the news API with this search query.
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 50)]
        page_size: u32,
        /// Sort surviving articles by relevance, highest first.
        #[arg(long)]
        sort: bool,
        /// Override the minimum relevance score.
        #[arg(long)]
        min_score: Option<u8>,
    },
}

pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
