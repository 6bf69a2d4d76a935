//! File storage for uploaded documents (release authorizations, PO PDFs).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::StorageConfig;
use crate::errors::ServiceError;

/// Reference to an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ServiceError>;

    fn public_url(&self, path: &str) -> String;
}

/// Stores objects on the local filesystem and serves them from a static
/// base URL.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root, &config.public_url)
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return Err(ServiceError::ValidationError(
                "storage path must not be empty".to_string(),
            ));
        }
        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(ServiceError::ValidationError(format!(
                    "invalid storage path: {}",
                    path
                )));
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ServiceError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!(path = %parent.display(), "failed to create storage directory: {}", e);
                ServiceError::StorageError(e.to_string())
            })?;
        }

        tokio::fs::write(&target, &bytes).await.map_err(|e| {
            error!(path = %target.display(), "failed to write object: {}", e);
            ServiceError::StorageError(e.to_string())
        })?;
        debug!(path, content_type, size = bytes.len(), "object stored");

        let path = path.trim_start_matches('/').to_string();
        Ok(StoredObject {
            url: self.public_url(&path),
            path,
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn upload_writes_nested_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://files.local/");

        let stored = store
            .upload(
                "releases/L-1/R-9.pdf",
                Bytes::from_static(b"%PDF-1.4"),
                "application/pdf",
            )
            .await
            .unwrap();

        assert_eq!(stored.path, "releases/L-1/R-9.pdf");
        assert_eq!(stored.url, "http://files.local/releases/L-1/R-9.pdf");
        let written = std::fs::read(dir.path().join("releases/L-1/R-9.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn upload_rejects_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://files.local");

        let result = store
            .upload("releases/../../etc/passwd", Bytes::new(), "text/plain")
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }
}
