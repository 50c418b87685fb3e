use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::lesson::handler::hello,
        crate::modules::lesson::handler::upload_video,
    ),
    components(
        schemas(
            crate::modules::lesson::dto::HelloResponse,
            crate::modules::lesson::dto::UploadResponse,
            crate::common::response::ErrorBody,
        )
    ),
    tags(
        (name = "Lessons", description = "Lesson video upload and HLS transcoding")
    )
)]
pub struct ApiDoc;
