//! Upload handling: store locally, then publish best-effort.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use slug::slugify;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::types::PublishStatus;
use crate::infra::error::InfraError;
use crate::infra::uploads::{StoreTarget, UploadStorage, UploadStorageError, file_extension};

const OCTET_STREAM: &str = "application/octet-stream";

/// Pushes a stored file somewhere durable (e.g. a git remote that backs the CDN).
#[async_trait]
pub trait UploadPublisher: Send + Sync {
    /// Publish `absolute_path`, returning the commit identifier when one exists.
    async fn publish(&self, absolute_path: &Path, message: &str)
    -> Result<Option<String>, InfraError>;
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub folder: String,
    pub slug: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub stored_path: String,
    pub public_url: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub publish: PublishStatus,
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<UploadStorage>,
    publisher: Option<Arc<dyn UploadPublisher>>,
    public_base_path: String,
}

impl UploadService {
    pub fn new(
        storage: Arc<UploadStorage>,
        publisher: Option<Arc<dyn UploadPublisher>>,
        public_base_path: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            publisher,
            public_base_path: public_base_path.into(),
        }
    }

    pub fn public_base_path(&self) -> &str {
        &self.public_base_path
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        let folder = slugify(request.folder.trim());
        if folder.is_empty() {
            return Err(UploadError::Validation("folder is required"));
        }
        let slug = slugify(request.slug.trim());
        if slug.is_empty() {
            return Err(UploadError::Validation("slug is required"));
        }
        if request.bytes.is_empty() {
            return Err(UploadError::Validation("file is empty"));
        }

        let content_type = request
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != OCTET_STREAM)
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&request.filename)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        let extension = file_extension(&request.filename).or_else(|| {
            mime_guess::get_mime_extensions_str(&content_type)
                .and_then(|extensions| extensions.first())
                .map(|ext| ext.to_string())
        });
        let dimensions = imagesize::blob_size(&request.bytes).ok();

        let target = StoreTarget {
            folder: &folder,
            slug: &slug,
            extension: extension.as_deref(),
        };
        let stored = self.storage.store(&target, request.bytes).await?;

        info!(
            target = "florette::uploads",
            stored_path = %stored.stored_path,
            size_bytes = stored.size_bytes,
            content_type = %content_type,
            "upload stored"
        );

        let publish = self.publish(&stored.stored_path).await;

        Ok(UploadOutcome {
            public_url: format!("{}/{}", self.public_base_path, stored.stored_path),
            stored_path: stored.stored_path,
            content_type,
            size_bytes: stored.size_bytes,
            checksum: stored.checksum,
            width: dimensions.map(|size| size.width as u32),
            height: dimensions.map(|size| size.height as u32),
            publish,
        })
    }

    /// Read back a stored file together with its guessed content type.
    pub async fn read(&self, stored_path: &str) -> Result<(Bytes, String), UploadStorageError> {
        let bytes = self.storage.read(stored_path).await?;
        let content_type = mime_guess::from_path(stored_path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok((bytes, content_type))
    }

    async fn publish(&self, stored_path: &str) -> PublishStatus {
        let Some(publisher) = self.publisher.as_ref() else {
            return PublishStatus::Disabled;
        };

        let absolute = match self.storage.absolute_path(stored_path) {
            Ok(path) => path,
            Err(err) => {
                return PublishStatus::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let message = format!("Add upload {stored_path}");
        match publisher.publish(&absolute, &message).await {
            Ok(commit) => {
                info!(
                    target = "florette::uploads",
                    stored_path,
                    commit = commit.as_deref().unwrap_or(""),
                    "upload published"
                );
                PublishStatus::Published { commit }
            }
            Err(err) => {
                counter!("florette_upload_publish_failed_total").increment(1);
                warn!(
                    target = "florette::uploads",
                    stored_path,
                    error = %err,
                    "upload stored but publishing failed"
                );
                PublishStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPublisher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl UploadPublisher for CountingPublisher {
        async fn publish(
            &self,
            absolute_path: &Path,
            _message: &str,
        ) -> Result<Option<String>, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(absolute_path.exists());
            if self.fail {
                Err(InfraError::publish("push", "remote rejected"))
            } else {
                Ok(Some("abc123".to_string()))
            }
        }
    }

    fn request(folder: &str, slug: &str, bytes: &'static [u8]) -> UploadRequest {
        UploadRequest {
            folder: folder.to_string(),
            slug: slug.to_string(),
            filename: "photo.png".to_string(),
            content_type: None,
            bytes: Bytes::from_static(bytes),
        }
    }

    fn service(
        dir: &tempfile::TempDir,
        publisher: Option<Arc<dyn UploadPublisher>>,
    ) -> UploadService {
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");
        UploadService::new(Arc::new(storage), publisher, "/uploads")
    }

    #[tokio::test]
    async fn upload_without_publisher_reports_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = service(&dir, None);

        let outcome = uploads
            .upload(request("Products", "Blush Rose", b"bytes"))
            .await
            .expect("upload");

        assert!(outcome.stored_path.starts_with("products/blush-rose-"));
        assert!(outcome.stored_path.ends_with(".png"));
        assert_eq!(outcome.public_url, format!("/uploads/{}", outcome.stored_path));
        assert_eq!(outcome.content_type, "image/png");
        assert_eq!(outcome.publish, PublishStatus::Disabled);

        let (bytes, content_type) = uploads.read(&outcome.stored_path).await.expect("read");
        assert_eq!(&bytes[..], b"bytes");
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn publish_failure_keeps_stored_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let publisher = Arc::new(CountingPublisher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let uploads = service(&dir, Some(publisher.clone()));

        let outcome = uploads
            .upload(request("banners", "spring", b"bytes"))
            .await
            .expect("upload succeeds despite publish failure");

        assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome.publish, PublishStatus::Failed { .. }));
        assert!(uploads.read(&outcome.stored_path).await.is_ok());
    }

    #[tokio::test]
    async fn publish_success_reports_commit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let publisher = Arc::new(CountingPublisher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let uploads = service(&dir, Some(publisher));

        let outcome = uploads
            .upload(request("banners", "spring", b"bytes"))
            .await
            .expect("upload");

        assert_eq!(
            outcome.publish,
            PublishStatus::Published {
                commit: Some("abc123".to_string())
            }
        );
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = service(&dir, None);

        assert!(matches!(
            uploads.upload(request("  ", "spring", b"bytes")).await,
            Err(UploadError::Validation("folder is required"))
        ));
        assert!(matches!(
            uploads.upload(request("banners", "!!!", b"bytes")).await,
            Err(UploadError::Validation("slug is required"))
        ));
        assert!(matches!(
            uploads.upload(request("banners", "spring", b"")).await,
            Err(UploadError::Validation("file is empty"))
        ));
    }
}
