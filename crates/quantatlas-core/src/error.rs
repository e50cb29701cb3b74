//! Error taxonomy for asset loading.
//!
//! Every variant is recoverable at the per-pair boundary: a failed mesh or
//! prediction fetch marks that pair failed for the load cycle and is
//! aggregated as a count, never re-thrown at the viewer level.

use thiserror::Error;

/// Errors raised while fetching and parsing atlas assets.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// A mesh or prediction request returned a non-success status, or the
    /// file does not exist under the data directory.
    #[error("asset not found: {path} (status {status})")]
    AssetNotFound {
        /// Asset path relative to the data root.
        path: String,
        /// HTTP status code, or 404 for a missing local file.
        status: u16,
    },

    /// Fetched content is not valid JSON or lacks the expected shape.
    #[error("failed to parse {path}: {detail}")]
    ParseFailure {
        /// Asset path relative to the data root.
        path: String,
        /// What was wrong with the document.
        detail: String,
    },

    /// Transport-level failure reading an asset.
    #[error("i/o error reading {path}: {detail}")]
    Io {
        /// Asset path relative to the data root.
        path: String,
        /// Underlying error description.
        detail: String,
    },
}

impl AtlasError {
    /// Parse failure from a serde error.
    #[must_use]
    pub fn parse(path: &str, err: &serde_json::Error) -> Self {
        Self::ParseFailure {
            path: path.to_string(),
            detail: err.to_string(),
        }
    }
}
