//! Storage of admin uploads in the public uploads directory.
//!
//! Files are written chunk by chunk and abandoned as soon as they pass the
//! size cap, so an oversized upload never lands on disk in full.

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File type not allowed: {0}")]
    TypeNotAllowed(String),

    #[error("File too large. Maximum size is {} MB", .0 / 1024 / 1024)]
    TooLarge(u64),

    #[error("Empty file")]
    Empty,

    #[error("Failed to read upload: {0}")]
    Read(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A stored file as reported back to the admin UI
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredUpload {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// `image/jpeg; charset=x` -> `image/jpeg`
pub fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// `{unix_millis}-{8 hex}.{ext}`
pub fn generate_filename(ext: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8],
        ext
    )
}

pub struct UploadService {
    config: UploadConfig,
}

impl UploadService {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    pub fn dir(&self) -> &Path {
        &self.config.path
    }

    /// Extension for an allowed MIME type
    pub fn check_type(&self, content_type: &str) -> Result<&'static str, UploadError> {
        let mime = normalize_mime(content_type);
        if self.config.is_type_allowed(&mime) {
            Ok(self.config.get_extension(&mime))
        } else {
            Err(UploadError::TypeNotAllowed(mime))
        }
    }

    /// Write a stream of chunks to a new file.
    ///
    /// The data goes to a `.part` file that is renamed once complete and
    /// removed on any failure.
    pub async fn store<S, E>(&self, content_type: &str, chunks: S) -> Result<StoredUpload, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let ext = self.check_type(content_type)?;
        fs::create_dir_all(&self.config.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload directory: {}", e))?;

        let filename = generate_filename(ext);
        let final_path = self.config.path.join(&filename);
        let part_path = self.config.path.join(format!("{}.part", filename));

        let written = match self.write_part(&part_path, chunks).await {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        fs::rename(&part_path, &final_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to finalize upload: {}", e))?;

        tracing::info!("Stored upload {} ({} bytes)", filename, written);
        Ok(StoredUpload {
            url: format!("/uploads/{}", filename),
            filename,
            size: written,
            content_type: normalize_mime(content_type),
        })
    }

    async fn write_part<S, E>(&self, path: &Path, chunks: S) -> Result<u64, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let mut file = fs::File::create(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create file: {}", e))?;
        let mut written: u64 = 0;

        futures::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| UploadError::Read(e.to_string()))?;
            written += chunk.len() as u64;
            if written > self.config.max_file_size {
                return Err(UploadError::TooLarge(self.config.max_file_size));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to write file: {}", e))?;
        }

        if written == 0 {
            return Err(UploadError::Empty);
        }
        file.flush()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to flush file: {}", e))?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    fn service(dir: &Path, max: u64) -> UploadService {
        UploadService::new(UploadConfig {
            path: dir.to_path_buf(),
            max_file_size: max,
            ..Default::default()
        })
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_filename_format() {
        let name = generate_filename("pdf");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        let (millis, hex) = stem.split_once('-').unwrap();

        assert_eq!(ext, "pdf");
        assert!(millis.parse::<i64>().unwrap() > 1_600_000_000_000);
        assert_eq!(hex.len(), 8);
        assert!(hex.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_check_type() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), 1024);

        assert_eq!(svc.check_type("image/png").unwrap(), "png");
        assert_eq!(svc.check_type("Application/PDF; name=x").unwrap(), "pdf");
        assert!(matches!(svc.check_type("application/x-msdownload"), Err(UploadError::TypeNotAllowed(_))));
        assert!(matches!(svc.check_type(""), Err(UploadError::TypeNotAllowed(_))));
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), 1024);

        let stored = svc.store("image/jpeg", chunks(&["abc", "def"])).await.unwrap();
        assert_eq!(stored.size, 6);
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.filename.ends_with(".jpg"));

        let on_disk = std::fs::read(dir.path().join(&stored.filename)).unwrap();
        assert_eq!(on_disk, b"abcdef");
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_oversized_upload_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), 4);

        let err = svc.store("image/png", chunks(&["abc", "def"])).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge(4)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_disallowed_type_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), 1024);

        let err = svc.store("text/html", chunks(&["<script>"])).await.unwrap_err();
        assert!(matches!(err, UploadError::TypeNotAllowed(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), 1024);

        let err = svc.store("image/png", chunks(&[])).await.unwrap_err();
        assert!(matches!(err, UploadError::Empty));
        assert_eq!(entries(dir.path()), 0);
    }
}
