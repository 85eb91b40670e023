use std::path::Path;

use crate::error::{IngestError, Result};
use crate::models::Dataset;

/// Reads a `problems.json`-style file: a JSON object mapping question ids
/// to question objects. Keys keep their file order.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(IngestError::DatasetNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let dataset: Dataset = serde_json::from_str(&content).map_err(|source| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}
