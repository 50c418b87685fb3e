use crate::common::error::PipelineError;
use crate::common::response::{ApiError, ApiSuccess, ErrorBody};
use crate::modules::lesson::dto::*;
use crate::modules::lesson::service::LessonService;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Greeting", body = HelloResponse)
    ),
    tag = "Lessons"
)]
pub async fn hello() -> impl IntoResponse {
    ApiSuccess(
        HelloResponse {
            message: "Hello, World!".to_string(),
        },
        StatusCode::OK,
    )
}

/// Upload a lesson video
/// Stages the file, transcodes it to a multi-rendition HLS ladder and returns
/// the master playlist URL. The response is sent once the transcode finishes.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video converted", body = UploadResponse),
        (status = 400, description = "Missing `file` field or malformed multipart body", body = ErrorBody),
        (status = 413, description = "Upload exceeds the configured size limit", body = ErrorBody),
        (status = 415, description = "Not a video upload", body = ErrorBody),
        (status = 503, description = "Transcoder at capacity", body = ErrorBody),
        (status = 500, description = "Video processing failed", body = ErrorBody)
    ),
    tag = "Lessons"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            return ApiError::from(PipelineError::InvalidUpload(rejection.body_text()))
                .into_response();
        }
    };

    match LessonService::process_upload(state, multipart).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
