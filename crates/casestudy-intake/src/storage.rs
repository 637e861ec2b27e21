//! Size-based upload routing and the object store used for large files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{IntakeError, MediaType, Upload};

/// Files larger than this go through object storage.
pub const DIRECT_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;

/// Holds large uploads and hands back a URL for them.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, upload: &Upload) -> Result<String, IntakeError>;

    async fn fetch(
        &self,
        url: &str,
        filename: &str,
        media_type: &MediaType,
    ) -> Result<Upload, IntakeError>;
}

/// Spools uploads into a local directory and addresses them by `file://` URL.
#[derive(Debug)]
pub struct LocalObjectStorage {
    dir: PathBuf,
    counter: AtomicU64,
}

impl LocalObjectStorage {
    /// Creates the spool directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, IntakeError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, filename: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let safe: String = filename
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{stamp}-{seq}-{safe}"))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, upload: &Upload) -> Result<String, IntakeError> {
        let path = self.object_path(&upload.filename);
        tokio::fs::write(&path, &upload.bytes).await?;
        info!(path = %path.display(), size = upload.size(), "spooled upload");
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(
        &self,
        url: &str,
        filename: &str,
        media_type: &MediaType,
    ) -> Result<Upload, IntakeError> {
        let path = url
            .strip_prefix("file://")
            .ok_or_else(|| IntakeError::Storage(format!("not a local object URL: {url}")))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Upload::new(filename, media_type.clone(), bytes))
    }
}

/// How an upload reaches extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRoute {
    Direct(Upload),
    Stored {
        url: String,
        filename: String,
        media_type: MediaType,
    },
}

/// Sends small files straight through and large ones via object storage.
#[derive(Clone)]
pub struct UploadRouter {
    limit: u64,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl Default for UploadRouter {
    fn default() -> Self {
        Self {
            limit: DIRECT_UPLOAD_LIMIT,
            storage: None,
        }
    }
}

impl UploadRouter {
    /// Everything goes direct.
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn with_storage(storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            limit: DIRECT_UPLOAD_LIMIT,
            storage: Some(storage),
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Storage failures fall back to a direct upload.
    pub async fn route(&self, upload: Upload) -> UploadRoute {
        let Some(storage) = self.storage.as_ref().filter(|_| upload.size() > self.limit) else {
            return UploadRoute::Direct(upload);
        };
        match storage.put(&upload).await {
            Ok(url) => UploadRoute::Stored {
                url,
                filename: upload.filename,
                media_type: upload.media_type,
            },
            Err(e) => {
                warn!(filename = %upload.filename, error = %e, "object storage failed, using direct upload");
                UploadRoute::Direct(upload)
            }
        }
    }

    /// The upload's bytes, fetched back from storage if needed.
    pub async fn resolve(&self, route: UploadRoute) -> Result<Upload, IntakeError> {
        match route {
            UploadRoute::Direct(upload) => Ok(upload),
            UploadRoute::Stored {
                url,
                filename,
                media_type,
            } => {
                let storage = self.storage.as_ref().ok_or_else(|| {
                    IntakeError::Storage("stored upload but no object storage configured".into())
                })?;
                storage.fetch(&url, &filename, &media_type).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStorage;

    #[async_trait]
    impl ObjectStorage for BrokenStorage {
        async fn put(&self, _upload: &Upload) -> Result<String, IntakeError> {
            Err(IntakeError::Storage("quota exceeded".into()))
        }

        async fn fetch(&self, _: &str, _: &str, _: &MediaType) -> Result<Upload, IntakeError> {
            Err(IntakeError::Storage("unreachable".into()))
        }
    }

    fn upload(size: usize) -> Upload {
        Upload::new("casebook.pdf", MediaType::Pdf, vec![b'x'; size])
    }

    #[tokio::test]
    async fn small_files_go_direct() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path()).await.unwrap();
        let router = UploadRouter::with_storage(Arc::new(storage));
        let route = router.route(upload(DIRECT_UPLOAD_LIMIT as usize)).await;
        assert!(matches!(route, UploadRoute::Direct(_)));
    }

    #[tokio::test]
    async fn large_files_are_stored_and_resolved() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path().join("spool")).await.unwrap();
        let router = UploadRouter::with_storage(Arc::new(storage)).with_limit(8);
        let route = router.route(upload(9)).await;
        let UploadRoute::Stored { url, filename, .. } = &route else {
            panic!("expected stored route, got {route:?}");
        };
        assert!(url.starts_with("file://"));
        assert_eq!(filename, "casebook.pdf");
        let resolved = router.resolve(route).await.unwrap();
        assert_eq!(resolved, upload(9));
    }

    #[tokio::test]
    async fn storage_failure_falls_back_to_direct() {
        let router = UploadRouter::with_storage(Arc::new(BrokenStorage)).with_limit(1);
        let route = router.route(upload(10)).await;
        assert_eq!(route, UploadRoute::Direct(upload(10)));
    }

    #[tokio::test]
    async fn without_storage_everything_is_direct() {
        let router = UploadRouter::direct().with_limit(1);
        assert!(matches!(router.route(upload(10)).await, UploadRoute::Direct(_)));
    }

    #[test]
    fn object_names_are_sanitised() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let storage = rt.block_on(LocalObjectStorage::new(dir.path())).unwrap();
        let path = storage.object_path("../Exam 1.pdf");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-.._Exam_1.pdf"));
        assert_eq!(path.parent().unwrap(), storage.dir());
    }
}
