//! Writing comparison results to disk.

use std::path::{Component, Path, PathBuf};

use models_compare_common::RequestError;
use serde::Serialize;

use crate::error::Result;

/// Resolve a caller-supplied file name against `dir`.
///
/// Only plain relative paths are accepted: no root, drive prefix or `..`
/// component, so the result always stays under `dir`.
pub fn resolve_output_path(dir: impl AsRef<Path>, requested: &str) -> Result<PathBuf> {
    let relative = Path::new(requested);
    let confined = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if requested.trim().is_empty() || !confined || relative.file_name().is_none() {
        return Err(RequestError::OutputPath(requested.to_string()).into());
    }
    Ok(dir.as_ref().join(relative))
}

/// Write `value` as pretty-printed JSON, creating parent directories.
pub async fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, json).await?;

    tracing::info!("Results saved to {}", path.display());
    Ok(())
}
