use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;
use std::sync::Arc;

use pdfquiz_core::{QuizSettings, create_quiz};

use crate::session::SessionId;
use crate::state::AppState;
use crate::template;

pub const MISSING_API_KEY: &str =
    "API Key is missing. Please restart the process from the upload page.";

#[derive(Debug, Default, Deserialize)]
pub struct QuizForm {
    pub num_questions: Option<String>,
    pub difficulty: Option<String>,
}

/// Settings form; only reachable once a summary exists.
pub async fn quiz_settings(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Response {
    if state.sessions.get(&session.0).summary.is_none() {
        return Redirect::to("/summary").into_response();
    }
    template::render_quiz_settings().into_response()
}

pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<QuizForm>,
) -> Html<String> {
    let data = state.sessions.get(&session.0);
    let Some(api_key) = data.api_key else {
        return template::render_quiz(Err(MISSING_API_KEY));
    };

    match build_quiz(&state, &api_key, data.summary.as_deref(), &form).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(error = %e, "quiz generation failed");
            template::render_quiz(Err(&format!("Quiz generation failed: {}", e)))
        }
    }
}

async fn build_quiz(
    state: &AppState,
    api_key: &str,
    summary: Option<&str>,
    form: &QuizForm,
) -> Result<Html<String>, String> {
    let settings = QuizSettings::from_form(form.num_questions.as_deref(), form.difficulty.as_deref())
        .map_err(|e| e.to_string())?;

    let summary = summary.map(str::trim).unwrap_or_default();
    if summary.is_empty() {
        return Err("Summary is empty; please summarize first.".to_string());
    }

    let model = state.models.for_key(api_key).map_err(|e| e.to_string())?;
    let quiz = create_quiz(model.as_ref(), summary, &settings, state.retry)
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(
        requested = settings.num_questions,
        received = quiz.questions.len(),
        difficulty = %settings.difficulty,
        "quiz generated"
    );
    Ok(template::render_quiz(Ok(&quiz)))
}
