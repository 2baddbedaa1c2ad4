use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;
use std::sync::Arc;

use pdfquiz_core::{generate_summary, write_summary};

use crate::session::SessionId;
use crate::state::AppState;
use crate::template;

#[derive(Debug, Default, Deserialize)]
pub struct ApiKeyForm {
    #[serde(default)]
    pub gemini_api_key: String,
}

pub async fn apikey_form(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Response {
    if state.sessions.get(&session.0).extracted_text.is_none() {
        tracing::debug!("no extracted text in session, back to upload");
        return Redirect::to("/upload").into_response();
    }
    template::render_apikey(None).into_response()
}

pub async fn apikey_submit(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<ApiKeyForm>,
) -> Response {
    let id = session.0.as_str();
    if state.sessions.get(id).extracted_text.is_none() {
        return Redirect::to("/upload").into_response();
    }

    let api_key = form.gemini_api_key.trim().to_string();
    if api_key.is_empty() {
        return template::render_apikey(Some("API Key is required to proceed.")).into_response();
    }

    let text = state.sessions.update(id, |s| {
        s.api_key = Some(api_key.clone());
        s.extracted_text.take()
    });
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Redirect::to("/upload").into_response();
    };

    match summarize(&state, &api_key, &text).await {
        Ok(summary) => {
            state.sessions.update(id, |s| s.summary = Some(summary));
            Redirect::to("/summary").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "summary generation failed");
            // keep the text so the visitor can retry with another key
            state.sessions.update(id, |s| {
                s.extracted_text.get_or_insert(text);
            });
            template::render_apikey(Some(&format!(
                "Error generating summary. Check API Key validity and try again. ({})",
                e
            )))
            .into_response()
        }
    }
}

async fn summarize(state: &AppState, api_key: &str, text: &str) -> Result<String, String> {
    let model = state.models.for_key(api_key).map_err(|e| e.to_string())?;
    let summary = generate_summary(model.as_ref(), text, &state.summary_options)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(ref path) = state.summary_output_path {
        write_summary(path, &summary).map_err(|e| e.to_string())?;
    }

    tracing::info!(model = model.name(), chars = summary.len(), "summary generated");
    Ok(summary)
}
