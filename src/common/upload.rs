use crate::common::error::PipelineError;
use crate::infrastructure::storage::local::StorageService;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use futures_util::StreamExt;
use std::io;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// An upload persisted to disk, waiting to be transcoded.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

pub struct DiskWriter {
    path: PathBuf,
    file: File,
    written: u64,
}

impl DiskWriter {
    pub async fn new(path: PathBuf) -> Result<Self, PipelineError> {
        let file = File::create_new(&path)
            .await
            .map_err(|source| PipelineError::Storage {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), PipelineError> {
        self.file
            .write_all(&chunk)
            .await
            .map_err(|source| PipelineError::Storage {
                path: self.path.clone(),
                source,
            })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<(PathBuf, u64), PipelineError> {
        let synced = async {
            self.file.flush().await?;
            self.file.sync_all().await
        }
        .await;

        match synced {
            Ok(()) => Ok((self.path, self.written)),
            Err(source) => {
                let path = self.path.clone();
                self.abort().await;
                Err(PipelineError::Storage { path, source })
            }
        }
    }

    /// Drops the partial file.
    pub async fn abort(self) {
        drop(self.file);
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("Failed to remove partial upload {}: {}", self.path.display(), e);
        }
    }
}

/// Errors raised while the multipart body is being read.
pub fn multipart_error(e: MultipartError) -> PipelineError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::PayloadTooLarge
    } else {
        PipelineError::InvalidUpload(e.body_text())
    }
}

fn check_content_type(content_type: Option<&str>) -> Result<(), PipelineError> {
    let Some(raw) = content_type else {
        return Ok(());
    };

    let parsed: mime::Mime = raw
        .parse()
        .map_err(|_| PipelineError::UnsupportedMediaType(raw.to_string()))?;

    if parsed.type_() == mime::VIDEO || parsed.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str() {
        Ok(())
    } else {
        Err(PipelineError::UnsupportedMediaType(raw.to_string()))
    }
}

pub async fn stream_to_disk(
    storage: &StorageService,
    field_name: &str,
    mut field: Field<'_>,
) -> Result<StagedUpload, PipelineError> {
    let content_type = field.content_type().map(str::to_string);
    check_content_type(content_type.as_deref())?;

    let original_name = field.file_name().map(str::to_string);
    let path = storage.staging_path(field_name, original_name.as_deref());

    let mut writer = DiskWriter::new(path).await?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Upload stream error: {}", e);
                let path = writer.path.clone();
                writer.abort().await;
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    return Err(PipelineError::PayloadTooLarge);
                }
                return Err(PipelineError::Storage {
                    path,
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string()),
                });
            }
        };

        if let Err(e) = writer.write_chunk(chunk).await {
            error!("Upload write error: {}", e);
            writer.abort().await;
            return Err(e);
        }
    }

    let (path, size) = writer.finish().await?;
    info!("Staged upload {} ({} bytes)", path.display(), size);

    Ok(StagedUpload {
        path,
        original_name,
        content_type,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_video_and_octet_stream() {
        assert!(check_content_type(None).is_ok());
        assert!(check_content_type(Some("video/mp4")).is_ok());
        assert!(check_content_type(Some("video/x-matroska")).is_ok());
        assert!(check_content_type(Some("application/octet-stream")).is_ok());
    }

    #[test]
    fn rejects_other_media() {
        for ct in ["image/png", "text/plain", "application/json", "not a mime"] {
            assert!(matches!(
                check_content_type(Some(ct)),
                Err(PipelineError::UnsupportedMediaType(_))
            ));
        }
    }

    #[tokio::test]
    async fn writer_persists_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file-1.mp4");

        let mut writer = DiskWriter::new(path.clone()).await.unwrap();
        writer.write_chunk(Bytes::from_static(b"abc")).await.unwrap();
        writer.write_chunk(Bytes::from_static(b"def")).await.unwrap();
        let (written_to, size) = writer.finish().await.unwrap();

        assert_eq!(written_to, path);
        assert_eq!(size, 6);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn aborted_writer_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file-2.mp4");

        let mut writer = DiskWriter::new(path.clone()).await.unwrap();
        writer.write_chunk(Bytes::from_static(b"partial")).await.unwrap();
        writer.abort().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn writer_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.mp4");
        std::fs::write(&path, b"x").unwrap();

        assert!(matches!(
            DiskWriter::new(path).await,
            Err(PipelineError::Storage { .. })
        ));
    }
}
