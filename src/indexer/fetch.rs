use std::process::Command;

use crate::config::SourceConfig;
use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Cloned,
}

/// Clones the dataset repository into `data_dir` unless that directory
/// already exists. An existing directory is trusted as-is.
pub fn ensure_dataset(source: &SourceConfig) -> Result<FetchOutcome> {
    if source.data_dir.exists() {
        tracing::info!(
            "Dataset already present at {}, skipping download",
            source.data_dir.display()
        );
        return Ok(FetchOutcome::AlreadyPresent);
    }

    if let Some(parent) = source.data_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    tracing::info!(
        "Dataset not found at {}, cloning {}",
        source.data_dir.display(),
        source.repo_url
    );

    let status = Command::new(&source.git_bin)
        .arg("clone")
        .arg(&source.repo_url)
        .arg(&source.data_dir)
        .status()
        .map_err(|e| IngestError::Io {
            path: source.git_bin.clone().into(),
            source: e,
        })?;

    if !status.success() {
        return Err(IngestError::CloneFailed {
            url: source.repo_url.clone(),
            status,
        });
    }

    tracing::info!("Dataset cloned into {}", source.data_dir.display());
    Ok(FetchOutcome::Cloned)
}
