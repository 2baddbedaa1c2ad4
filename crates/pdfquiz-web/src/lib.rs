//! Web front end: upload a PDF, enter an API key, read the summary, take a quiz.

pub mod handlers;
pub mod session;
pub mod state;
pub mod template;
pub mod upload;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub use state::{AppState, GeminiFactory, ModelFactory};

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(handlers::index::index))
        .route(
            "/upload",
            get(handlers::upload::upload_form).post(handlers::upload::upload_submit),
        )
        .route(
            "/apikey-entry",
            get(handlers::apikey::apikey_form).post(handlers::apikey::apikey_submit),
        )
        .route("/summary", get(handlers::summary::summary))
        .route("/quiz-settings", get(handlers::quiz::quiz_settings))
        .route("/generate-quiz", post(handlers::quiz::generate_quiz))
        .route("/static/style.css", get(template::serve_style))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            session::session_middleware,
        ))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
