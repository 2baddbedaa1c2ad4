use axum::Extension;
use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

use crate::session::SessionId;
use crate::state::AppState;
use crate::template;

pub const MISSING_SUMMARY: &str =
    "Error: The summary could not be found. Please upload a file first.";

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    match state.sessions.get(&session.0).summary {
        Some(ref text) => template::render_summary(Ok(text)),
        None => template::render_summary(Err(MISSING_SUMMARY)),
    }
}
