use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub labels_path: PathBuf,
}

pub fn resolve_paths(config: &AppConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(Path::new(&config.directories.logs_dir))?;
    let labels_path = PathBuf::from(&config.model.labels_path);
    Ok(ResolvedPaths {
        logs_dir,
        labels_path,
    })
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()))
}
