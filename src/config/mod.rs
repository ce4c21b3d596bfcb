pub mod env;
mod loader;

pub use env::{AppConfig, GeminiConfig, NewsConfig};
pub use loader::load_config;
