use axum::Extension;
use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

use crate::session::SessionId;
use crate::state::AppState;
use crate::template;

/// Homepage. Starting over forgets any pending text and the API key.
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    state.sessions.update_existing(&session.0, |s| {
        s.extracted_text = None;
        s.api_key = None;
    });
    template::render_homepage()
}
