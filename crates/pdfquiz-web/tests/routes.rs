//! Router-level tests: full request flow through the session middleware.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::ServiceExt;

use pdfquiz_core::model::mock::{MockModel, MockResponse};
use pdfquiz_core::config_file::ServerConfig;
use pdfquiz_core::{BackendError, ConfigFile, LanguageModel, ModelError, PdfBackend};
use pdfquiz_web::session::SESSION_COOKIE;
use pdfquiz_web::{AppState, ModelFactory, router};

const BOUNDARY: &str = "pdfquizboundary";

const QUIZ_JSON: &str = r#"{"questions":[{"questionNumber":1,"question":"Which organelle makes ATP?","imageUrl":"","answerOptions":[{"text":"Mitochondria","rationale":"Site of respiration.","isCorrect":true},{"text":"Ribosome","rationale":"Makes proteins.","isCorrect":false}],"hint":"Powerhouse."}]}"#;

/// Returns fixed text for any file.
struct StubBackend(&'static str);

impl PdfBackend for StubBackend {
    fn extract_text(&self, _path: &Path) -> Result<String, BackendError> {
        Ok(self.0.to_string())
    }
}

/// Hands out one shared mock and records which keys were used.
struct MockFactory {
    model: Arc<MockModel>,
    keys: Mutex<Vec<String>>,
}

impl MockFactory {
    fn new(model: MockModel) -> Self {
        Self {
            model: Arc::new(model),
            keys: Mutex::new(Vec::new()),
        }
    }
}

impl ModelFactory for MockFactory {
    fn for_key(&self, api_key: &str) -> Result<Arc<dyn LanguageModel>, ModelError> {
        self.keys.lock().unwrap().push(api_key.to_string());
        Ok(self.model.clone())
    }
}

fn app(text: &'static str, factory: Arc<MockFactory>) -> Router {
    app_with_config(&ConfigFile::default(), text, factory)
}

fn app_with_config(config: &ConfigFile, text: &'static str, factory: Arc<MockFactory>) -> Router {
    let state = AppState::from_config(config, Arc::new(StubBackend(text)), factory);
    router(Arc::new(state))
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf_file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(cookie: Option<&str>, filename: &str, content: &[u8]) -> Request<Body> {
    let mut builder = Request::post("/upload").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder
        .body(Body::from(multipart_body(filename, content)))
        .unwrap()
}

fn form_request(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair from the response's Set-Cookie header.
fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie issued")
        .to_str()
        .unwrap();
    let pair = set_cookie.split(';').next().unwrap().to_string();
    assert!(pair.starts_with(SESSION_COOKIE));
    pair
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Upload a valid PDF and return the session cookie.
async fn upload_ok(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(upload_request(None, "paper.pdf", b"%PDF-1.7 body"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/apikey-entry");
    session_cookie(&response)
}

#[tokio::test]
async fn browsing_without_state_sets_no_cookie() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    for uri in ["/", "/static/style.css", "/upload", "/summary"] {
        let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(
            response.headers().get(header::SET_COOKIE).is_none(),
            "{uri} issued a cookie"
        );
    }
}

#[tokio::test]
async fn stylesheet_served_as_css() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(get_request("/static/style.css", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
}

#[tokio::test]
async fn upload_rejects_wrong_extension() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(upload_request(None, "notes.txt", b"%PDF-1.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("File type not allowed. Please upload a PDF.")
    );
}

#[tokio::test]
async fn upload_rejects_empty_filename() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(upload_request(None, "", b"%PDF-1.7"))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("No file selected."));
}

#[tokio::test]
async fn upload_without_multipart_reports_missing_file() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(form_request("/upload", None, "x=1"))
        .await
        .unwrap();
    assert!(
        body_text(response)
            .await
            .contains("No file part in the request.")
    );
}

#[tokio::test]
async fn upload_without_pdf_header_rejected() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(upload_request(None, "renamed.pdf", b"PK\x03\x04 zip data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().get(header::SET_COOKIE).is_none(),
        "rejected upload stored a session"
    );
    assert!(
        body_text(response)
            .await
            .contains("doesn&#x27;t appear to be a valid PDF")
    );
}

#[tokio::test]
async fn upload_over_body_limit_rejected() {
    let config = ConfigFile {
        server: Some(ServerConfig {
            max_upload_mb: Some(1),
            ..ServerConfig::default()
        }),
        ..ConfigFile::default()
    };
    let app = app_with_config(
        &config,
        "text",
        Arc::new(MockFactory::new(MockModel::text("s"))),
    );
    let mut content = b"%PDF-1.7\n".to_vec();
    content.resize(2 * 1024 * 1024, b'x');

    let response = app
        .oneshot(upload_request(None, "big.pdf", &content))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("File is too large."));
}

#[tokio::test]
async fn upload_of_textless_pdf_is_an_error() {
    let app = app("   \n ", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(upload_request(None, "scan.pdf", b"%PDF-1.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Error processing file"));
}

#[tokio::test]
async fn apikey_page_without_upload_redirects() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(get_request("/apikey-entry", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/upload");
}

#[tokio::test]
async fn empty_api_key_is_rejected() {
    let factory = Arc::new(MockFactory::new(MockModel::text("summary")));
    let app = app("Document text.", factory.clone());
    let cookie = upload_ok(&app).await;

    let response = app
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=++",
        ))
        .await
        .unwrap();
    assert!(
        body_text(response)
            .await
            .contains("API Key is required to proceed.")
    );
    assert!(factory.keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_summary_keeps_text_for_retry() {
    let factory = Arc::new(MockFactory::new(MockModel::with_sequence(vec![
        MockResponse::ApiError(400, "API key not valid".into()),
        MockResponse::Text("A fine summary.".into()),
    ])));
    let app = app("Document text.", factory.clone());
    let cookie = upload_ok(&app).await;

    let response = app
        .clone()
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=bad-key",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("Error generating summary. Check API Key validity and try again.")
    );

    let response = app
        .clone()
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=good-key",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/summary");
    assert_eq!(*factory.keys.lock().unwrap(), vec!["bad-key", "good-key"]);
}

#[tokio::test]
async fn summary_without_session_shows_error() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app.oneshot(get_request("/summary", None)).await.unwrap();
    assert!(
        body_text(response)
            .await
            .contains("The summary could not be found")
    );
}

#[tokio::test]
async fn quiz_without_api_key_shows_error() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(form_request(
            "/generate-quiz",
            None,
            "num_questions=3&difficulty=easy",
        ))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("API Key is missing."));
}

#[tokio::test]
async fn homepage_forgets_upload_and_key() {
    let factory = Arc::new(MockFactory::new(MockModel::text("A summary.")));
    let app = app("Document text.", factory);
    let cookie = upload_ok(&app).await;
    app.clone()
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=k",
        ))
        .await
        .unwrap();

    // upload again so there is pending text to forget
    let response = app
        .clone()
        .oneshot(upload_request(Some(&cookie), "again.pdf", b"%PDF-1.7"))
        .await
        .unwrap();
    assert_eq!(location(&response), "/apikey-entry");

    let response = app
        .clone()
        .oneshot(get_request("/", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/apikey-entry", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/upload");

    let response = app
        .oneshot(form_request(
            "/generate-quiz",
            Some(&cookie),
            "num_questions=3&difficulty=easy",
        ))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("API Key is missing."));
}

#[tokio::test]
async fn quiz_settings_require_summary() {
    let app = app("text", Arc::new(MockFactory::new(MockModel::text("s"))));
    let response = app
        .oneshot(get_request("/quiz-settings", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/summary");
}

#[tokio::test]
async fn full_flow_upload_summary_quiz() {
    let model = MockModel::with_sequence(vec![
        MockResponse::Text("Cells make <energy>.\n\nMitochondria matter.".into()),
        MockResponse::Text(QUIZ_JSON.into()),
    ]);
    let factory = Arc::new(MockFactory::new(model));
    let app = app("Mitochondria are the powerhouse of the cell.", factory.clone());
    let cookie = upload_ok(&app).await;

    let response = app
        .clone()
        .oneshot(get_request("/apikey-entry", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=AIzaTest",
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "/summary");

    let response = app
        .clone()
        .oneshot(get_request("/summary", Some(&cookie)))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert!(html.contains("<p>Cells make &lt;energy&gt;.</p>"));
    assert!(html.contains("<p>Mitochondria matter.</p>"));

    let response = app
        .clone()
        .oneshot(get_request("/quiz-settings", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(form_request(
            "/generate-quiz",
            Some(&cookie),
            "num_questions=1&difficulty=hard",
        ))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert!(html.contains("Which organelle makes ATP?"));
    assert!(html.contains(r#"data-correct="true""#));

    let requests = factory.model.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].user_query.contains("powerhouse of the cell"));
    assert!(requests[1].response_schema.is_some());
    assert!(requests[1].system_prompt.contains("hard"));
    assert!(requests[1].user_query.contains("Mitochondria matter."));
    assert_eq!(*factory.keys.lock().unwrap(), vec!["AIzaTest", "AIzaTest"]);
}

#[tokio::test]
async fn invalid_quiz_settings_reported() {
    let factory = Arc::new(MockFactory::new(MockModel::text("Summary.")));
    let app = app("Text.", factory.clone());
    let cookie = upload_ok(&app).await;
    app.clone()
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=k",
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(form_request(
            "/generate-quiz",
            Some(&cookie),
            "num_questions=500&difficulty=medium",
        ))
        .await
        .unwrap();
    assert!(
        body_text(response)
            .await
            .contains("Quiz generation failed: number of questions must be between 1 and 50")
    );
    assert_eq!(factory.model.call_count(), 1);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let factory = Arc::new(MockFactory::new(MockModel::text("Private summary.")));
    let app = app("Text.", factory);
    let cookie = upload_ok(&app).await;
    app.clone()
        .oneshot(form_request(
            "/apikey-entry",
            Some(&cookie),
            "gemini_api_key=k",
        ))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/summary", None)).await.unwrap();
    let html = body_text(response).await;
    assert!(!html.contains("Private summary."));
    assert!(html.contains("The summary could not be found"));
}
