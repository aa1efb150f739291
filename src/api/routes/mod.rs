pub mod calendar;
pub mod flashcards;
pub mod health;
mod multipart;
pub mod study;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let body_limit = state.config.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/chat", post(study::study_document))
        .route("/calendar", post(calendar::ask_calendar))
        .route("/upload", post(upload::upload_documents))
        .route("/upload/ask", post(upload::ask_documents))
        .route("/create-flash-cards", post(flashcards::create_flashcards))
        .route("/get-flash-cards", get(flashcards::list_flashcards))
        .route("/get-flash-cards/{id}", get(flashcards::get_flashcards))
        .route("/edit-flash-cards", patch(flashcards::edit_flashcards))
        .route("/delete-flash-cards/{id}", delete(flashcards::delete_flashcards))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}
