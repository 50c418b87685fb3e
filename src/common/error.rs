use crate::common::response::ApiError;
use axum::http::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

pub const PROCESSING_FAILED: &str = "Video processing failed";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no `file` field found in multipart request")]
    UploadMissing,

    #[error("malformed multipart request: {0}")]
    InvalidUpload(String),

    #[error("upload exceeds the configured size limit")]
    PayloadTooLarge,

    #[error("unsupported content type `{0}`")]
    UnsupportedMediaType(String),

    #[error("transcoder is at capacity")]
    Busy,

    #[error("failed to stage upload at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prepare {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{tool} {message}")]
    Transcode { tool: String, message: String },

    #[error("transcode output incomplete: {0}")]
    IncompleteOutput(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::UploadMissing | PipelineError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            PipelineError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PipelineError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Storage { .. }
            | PipelineError::Filesystem { .. }
            | PipelineError::Transcode { .. }
            | PipelineError::IncompleteOutput(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = e.status();
        match &e {
            PipelineError::UploadMissing => ApiError(
                "No file field found in multipart request".to_string(),
                status,
            ),
            PipelineError::Busy => ApiError(
                "Transcoder is busy, try again later".to_string(),
                status,
            ),
            PipelineError::InvalidUpload(_)
            | PipelineError::PayloadTooLarge
            | PipelineError::UnsupportedMediaType(_) => {
                ApiError(e.to_string(), status)
            }
            // Callers get one opaque body for every server-side fault.
            _ => {
                error!(error = %e, "Video processing failed");
                ApiError(PROCESSING_FAILED.to_string(), status)
            }
        }
    }
}
