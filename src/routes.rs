use crate::config::settings::AllowedOrigins;
use crate::docs::ApiDoc;
use crate::state::AppState;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let base = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    match origins {
        AllowedOrigins::Any => base.allow_origin(Any).allow_headers(Any),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Skipping unusable CORS origin {}", o);
                        None
                    }
                })
                .collect();

            base.allow_origin(AllowOrigin::list(values))
                .allow_headers([
                    header::ORIGIN,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static("x-requested-with"),
                ])
                .allow_credentials(true)
        }
    }
}

pub fn configure_routes(state: AppState) -> Router<AppState> {
    let cors = cors_layer(&state.config.cors);
    let uploads = ServeDir::new(state.storage.root());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(crate::modules::lesson::router(state))
        .merge(health_routes())
        .nest_service("/uploads", uploads)
        .layer(cors)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
}
