use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod manifest;
pub mod model;
pub mod service;

pub fn router(state: AppState) -> axum::Router<AppState> {
    // Enforced while the multipart body is read, so an oversized upload
    // surfaces as `PayloadTooLarge` and keeps the JSON error body.
    let upload_routes = Router::new()
        .route("/upload", post(handler::upload_video))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/", get(handler::hello))
        .merge(upload_routes)
}
