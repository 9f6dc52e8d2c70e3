//! Runtime upload storage and retrieval helpers.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::{fs, io::AsyncWriteExt};

const MAX_NAME_ATTEMPTS: i128 = 16;

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
    #[error("could not allocate a unique file name for `{stem}`")]
    NameExhausted { stem: String },
}

/// Where a payload should land: `<folder>/<slug>-<unix_millis>.<extension>`.
#[derive(Debug, Clone)]
pub struct StoreTarget<'a> {
    pub folder: &'a str,
    pub slug: &'a str,
    pub extension: Option<&'a str>,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Path relative to the storage root, using `/` separators.
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

/// Filesystem-backed upload storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store the provided payload and return metadata describing the stored asset.
    ///
    /// The payload is streamed to disk to avoid buffering large files in memory.
    pub async fn store_stream<S>(
        &self,
        target: &StoreTarget<'_>,
        stream: S,
    ) -> Result<StoredUpload, UploadStorageError>
    where
        S: futures::Stream<Item = Result<Bytes, UploadStorageError>>,
    {
        let (stored_path, absolute, mut file) = self.create_unique(target).await?;

        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;
        let mut saw_payload = false;

        pin_mut!(stream);
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            if chunk.is_empty() {
                continue;
            }

            saw_payload = true;
            total_bytes = total_bytes
                .checked_add(chunk.len() as u64)
                .ok_or(UploadStorageError::SizeOverflow)?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }

        file.flush().await?;

        if !saw_payload {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(UploadStorageError::EmptyPayload);
        }

        let checksum = hex::encode(&hasher.finalize()[..]);

        Ok(StoredUpload {
            stored_path,
            checksum,
            size_bytes: total_bytes,
        })
    }

    /// Store a fully-buffered payload.
    pub async fn store(
        &self,
        target: &StoreTarget<'_>,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        let stream = stream::once(async move { Ok::<_, UploadStorageError>(data) });
        self.store_stream(target, stream).await
    }

    /// Attempt to read the stored payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    /// Obtain the absolute filesystem path for a stored upload.
    pub fn absolute_path(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        self.resolve(stored_path)
    }

    /// Resolve the absolute filesystem path for a stored upload.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }

    /// Create the destination file exclusively, bumping the timestamp when two
    /// uploads for the same slug land within one millisecond.
    async fn create_unique(
        &self,
        target: &StoreTarget<'_>,
    ) -> Result<(String, PathBuf, fs::File), UploadStorageError> {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

        for offset in 0..MAX_NAME_ATTEMPTS {
            let stored_path = build_stored_path(target, millis + offset);
            let absolute = self.resolve(&stored_path)?;
            if let Some(parent) = absolute.parent() {
                fs::create_dir_all(parent).await?;
            }

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute)
                .await
            {
                Ok(file) => return Ok((stored_path, absolute, file)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(UploadStorageError::NameExhausted {
            stem: format!("{}/{}", target.folder, target.slug),
        })
    }
}

fn build_stored_path(target: &StoreTarget<'_>, millis: i128) -> String {
    match target.extension {
        Some(ext) => format!("{}/{}-{millis}.{ext}", target.folder, target.slug),
        None => format!("{}/{}-{millis}", target.folder, target.slug),
    }
}

/// Lower-cased, alphanumeric extension of a client-supplied file name.
pub fn file_extension(original: &str) -> Option<String> {
    Path::new(original)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| {
            !value.is_empty()
                && value.len() <= 10
                && value.chars().all(|ch| ch.is_ascii_alphanumeric())
        })
}
