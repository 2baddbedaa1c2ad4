use std::fmt::Write as _;

use axum::http::header;
use axum::response::{Html, IntoResponse};

use pdfquiz_core::{Question, Quiz};

const HOMEPAGE_HTML: &str = include_str!("../templates/homepage.html");
const UPLOAD_HTML: &str = include_str!("../templates/pdfupload.html");
const APIKEY_HTML: &str = include_str!("../templates/apikey_entry.html");
const SUMMARY_HTML: &str = include_str!("../templates/summary.html");
const QUIZ_SETTINGS_HTML: &str = include_str!("../templates/quizsetting.html");
const QUIZ_HTML: &str = include_str!("../templates/quizpage.html");
const STYLE_CSS: &str = include_str!("../templates/style.css");

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace `{{ name }}` placeholders with pre-rendered HTML fragments.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |html, (name, value)| {
        html.replace(&format!("{{{{ {name} }}}}"), value)
    })
}

fn error_block(error: Option<&str>) -> String {
    match error {
        Some(msg) => format!(r#"<p class="error" role="alert">{}</p>"#, escape_html(msg)),
        None => String::new(),
    }
}

/// Render text as paragraphs, splitting on blank lines.
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_homepage() -> Html<String> {
    Html(HOMEPAGE_HTML.to_string())
}

pub fn render_upload(error: Option<&str>) -> Html<String> {
    Html(fill(UPLOAD_HTML, &[("error", &error_block(error))]))
}

pub fn render_apikey(error: Option<&str>) -> Html<String> {
    Html(fill(APIKEY_HTML, &[("error", &error_block(error))]))
}

/// Summary page. `Err` carries a message shown in place of the summary.
pub fn render_summary(summary: Result<&str, &str>) -> Html<String> {
    let (body, has_summary) = match summary {
        Ok(text) => (paragraphs(text), "true"),
        Err(msg) => (error_block(Some(msg)), "false"),
    };
    Html(fill(
        SUMMARY_HTML,
        &[("summary", &body), ("has_summary", has_summary)],
    ))
}

pub fn render_quiz_settings() -> Html<String> {
    Html(QUIZ_SETTINGS_HTML.to_string())
}

/// Quiz page. `Err` carries a message shown instead of questions.
pub fn render_quiz(quiz: Result<&Quiz, &str>) -> Html<String> {
    let body = match quiz {
        Ok(quiz) if quiz.is_empty() => error_block(Some(
            "The model returned no questions. Please try generating the quiz again.",
        )),
        Ok(quiz) => quiz
            .questions
            .iter()
            .map(render_question)
            .collect::<Vec<_>>()
            .join("\n"),
        Err(msg) => error_block(Some(msg)),
    };
    Html(fill(QUIZ_HTML, &[("questions", &body)]))
}

fn render_question(q: &Question) -> String {
    let n = q.question_number;
    let mut html = String::new();
    let _ = writeln!(html, r#"<section class="question" id="q{n}">"#);
    let _ = writeln!(html, "<h2>Question {n}</h2>");
    let _ = writeln!(html, r#"<p class="prompt">{}</p>"#, escape_html(&q.question));
    if !q.image_url.trim().is_empty() {
        let _ = writeln!(
            html,
            r#"<img src="{}" alt="Illustration for question {n}">"#,
            escape_html(&q.image_url)
        );
    }
    html.push_str("<ol class=\"options\">\n");
    for (i, option) in q.answer_options.iter().enumerate() {
        let _ = writeln!(
            html,
            r#"<li data-correct="{correct}"><label><input type="radio" name="q{n}" value="{i}"> {text}</label><p class="rationale" hidden>{rationale}</p></li>"#,
            correct = option.is_correct,
            text = escape_html(&option.text),
            rationale = escape_html(&option.rationale),
        );
    }
    html.push_str("</ol>\n");
    if !q.hint.trim().is_empty() {
        let _ = writeln!(
            html,
            r#"<details class="hint"><summary>Hint</summary><p>{}</p></details>"#,
            escape_html(&q.hint)
        );
    }
    html.push_str("</section>");
    html
}

/// Serve the stylesheet with correct content type.
pub async fn serve_style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}
