//! Asset retrieval seam.
//!
//! Assets are static JSON documents addressed by paths relative to a data
//! root. The viewer only depends on the [`AssetSource`] trait; production
//! code uses the HTTP or directory implementation, tests substitute a
//! scripted source.

use std::path::PathBuf;

use async_trait::async_trait;

use quantatlas_core::{AtlasError, MeshGeometry, PredictionSeries};

/// Retrieves and parses atlas asset documents.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch and parse a mesh document.
    async fn fetch_mesh(&self, path: &str) -> Result<MeshGeometry, AtlasError>;

    /// Fetch and parse a prediction-series document.
    async fn fetch_predictions(&self, path: &str) -> Result<PredictionSeries, AtlasError>;
}

/// Asset source reading from a local directory tree.
#[derive(Clone, Debug)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    /// Source rooted at the given data directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AtlasError> {
        let full = self.root.join(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AtlasError::AssetNotFound {
                    path: path.to_string(),
                    status: 404,
                })
            }
            Err(err) => Err(AtlasError::Io {
                path: path.to_string(),
                detail: err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl AssetSource for DirAssetSource {
    async fn fetch_mesh(&self, path: &str) -> Result<MeshGeometry, AtlasError> {
        let bytes = self.read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| AtlasError::parse(path, &e))
    }

    async fn fetch_predictions(&self, path: &str) -> Result<PredictionSeries, AtlasError> {
        let bytes = self.read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| AtlasError::parse(path, &e))
    }
}

/// Asset source fetching over HTTP from a base URL.
#[derive(Clone, Debug)]
pub struct HttpAssetSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetSource {
    /// Source rooted at the given base URL (trailing slash optional).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, AtlasError> {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await.map_err(|err| {
            AtlasError::Io {
                path: path.to_string(),
                detail: err.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AtlasError::AssetNotFound {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|err| AtlasError::Io {
            path: path.to_string(),
            detail: err.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch_mesh(&self, path: &str) -> Result<MeshGeometry, AtlasError> {
        let bytes = self.get(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| AtlasError::parse(path, &e))
    }

    async fn fetch_predictions(&self, path: &str) -> Result<PredictionSeries, AtlasError> {
        let bytes = self.get(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| AtlasError::parse(path, &e))
    }
}
