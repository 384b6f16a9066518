use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::domain::cache_keys::CacheKey;
use crate::domain::errors::CacheError;
use crate::domain::repositories::ArtifactCache;

/// Artifact cache in a local directory, for development and single-host setups.
///
/// Issued URLs point at `public_base_url` when one is configured (some other
/// web server is expected to serve the directory) and at `file://` otherwise.
/// The `expires` query parameter is advisory; nothing here enforces it.
#[derive(Debug, Clone)]
pub struct FilesystemArtifactCache {
    root: PathBuf,
    public_base_url: Option<Url>,
}

impl FilesystemArtifactCache {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<Url>) -> Self {
        let public_base_url = public_base_url.map(|mut url| {
            if !url.path().ends_with('/') {
                url.set_path(&format!("{}/", url.path()));
            }
            url
        });
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

fn io_error(operation: &str, key: &CacheKey, err: &std::io::Error) -> CacheError {
    let message = format!("failed to {operation} {key}: {err}");
    match err.kind() {
        ErrorKind::PermissionDenied | ErrorKind::NotFound => CacheError::rejected(message),
        _ => CacheError::unavailable(message),
    }
}

#[async_trait]
impl ArtifactCache for FilesystemArtifactCache {
    async fn has(&self, key: &CacheKey) -> Result<bool, CacheError> {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .map_err(|e| io_error("look up", key, &e))
    }

    async fn put(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error("prepare directory for", key, &e))?;

        // Readers only ever see a complete file: write aside, then rename into place.
        let partial = self
            .root
            .join(format!(".{}.{}.partial", key, Uuid::new_v4().simple()));
        if let Err(err) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(io_error("write", key, &err));
        }
        if let Err(err) = tokio::fs::rename(&partial, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(io_error("store", key, &err));
        }

        debug!(key = %key, bytes = bytes.len(), "stored artifact");
        Ok(())
    }

    async fn issue_url(&self, key: &CacheKey, ttl: Duration) -> Result<String, CacheError> {
        let expires = Utc::now().timestamp()
            + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);

        let mut url = match &self.public_base_url {
            Some(base) => base
                .join(key.as_str())
                .map_err(|e| CacheError::rejected(format!("invalid artifact url for {key}: {e}")))?,
            None => {
                let path = std::path::absolute(self.path_for(key))
                    .map_err(|e| io_error("resolve", key, &e))?;
                Url::from_file_path(&path).map_err(|()| {
                    CacheError::rejected(format!("cannot build a file url for {}", path.display()))
                })?
            }
        };
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string());

        Ok(url.to_string())
    }

    async fn read_bytes(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        tokio::fs::read(self.path_for(key))
            .await
            .map_err(|e| io_error("read", key, &e))
    }
}
