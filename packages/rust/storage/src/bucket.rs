//! Object storage that masterlist uploads land in.
//!
//! [`DocumentSource`] is what the pipeline downloads from. [`LocalBuckets`]
//! maps each bucket to a directory under a root, so an object lives at
//! `<root>/<bucket>/<object path>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use masterlist_shared::{MasterlistError, Result};
use tokio::fs;

/// Read access to uploaded objects.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Download the full contents of `path` in `bucket`.
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes>;
}

/// Filesystem-backed buckets.
#[derive(Debug, Clone)]
pub struct LocalBuckets {
    root: PathBuf,
}

impl LocalBuckets {
    /// Create a bucket store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `bucket` + `key` to a path under the root.
    ///
    /// Keys must be relative and may not contain `..` segments; bucket names
    /// must be a single path segment.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(MasterlistError::validation(format!(
                "invalid bucket name '{bucket}'"
            )));
        }
        if key.is_empty() || key.starts_with('/') {
            return Err(MasterlistError::validation(format!(
                "invalid object key '{key}'"
            )));
        }

        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(MasterlistError::validation(format!(
                "object key '{key}' escapes its bucket"
            )));
        }

        Ok(self.root.join(bucket).join(relative))
    }

    /// Write `data` to `key` in `bucket`, replacing any existing object.
    pub async fn upload(&self, bucket: &str, key: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MasterlistError::io(parent, e))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| MasterlistError::io(&path, e))?;

        tracing::debug!(bucket, key, size = data.len(), "object uploaded");
        Ok(path)
    }
}

#[async_trait]
impl DocumentSource for LocalBuckets {
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes> {
        let file = self
            .object_path(bucket, path)
            .map_err(|e| MasterlistError::fetch(path, e.to_string()))?;

        match fs::read(&file).await {
            Ok(data) => {
                tracing::debug!(bucket, path, size = data.len(), "object downloaded");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MasterlistError::fetch(
                path,
                format!("object not found in bucket '{bucket}'"),
            )),
            Err(e) => Err(MasterlistError::fetch(path, e.to_string())),
        }
    }
}
