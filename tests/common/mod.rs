//! Shared fixtures for the integration tests: an in-process HTTP server that
//! plays image host, OAuth2 token endpoint and Sheets API at once.

#![allow(dead_code)]

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use shot2sheet::{PipelineConfig, Secrets};
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub const KEY_JSON: &str = include_str!("../fixtures/service_account.json");

pub const ACCESS_TOKEN: &str = "ya29.test-token";

/// Spreadsheet id for which the fake Sheets API answers 403.
pub const FORBIDDEN_SHEET: &str = "forbidden-sheet";

/// One request received by the fake `values:append` route.
#[derive(Debug, Clone)]
pub struct RecordedAppend {
    pub spreadsheet_id: String,
    pub range: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Recorder {
    appends: Mutex<Vec<RecordedAppend>>,
    token_forms: Mutex<Vec<HashMap<String, String>>>,
}

pub struct TestServer {
    pub base_url: String,
    recorder: Arc<Recorder>,
}

impl TestServer {
    pub async fn start() -> Self {
        let recorder = Arc::new(Recorder::default());

        let app = Router::new()
            .route("/chat.png", get(chat_png))
            .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
            .route("/preview.html", get(preview_html))
            .route("/token", post(token))
            .route("/v4/spreadsheets/{id}/values/{range}", post(append))
            .with_state(recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            recorder,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn appends(&self) -> Vec<RecordedAppend> {
        self.recorder.appends.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.recorder.token_forms.lock().unwrap().clone()
    }

    /// Secrets whose service account exchanges tokens with this server.
    pub fn secrets(&self, spreadsheet_id: &str) -> Secrets {
        let mut secrets = Secrets::new(spreadsheet_id, KEY_JSON).unwrap();
        secrets.service_account.token_uri = self.url("/token");
        secrets
    }

    /// Config pointing the Sheets client at this server.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .sheets_base_url(&self.base_url)
            .build()
            .unwrap()
    }
}

/// Log output captured by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route the crate's INFO logs into a buffer for the current thread.
///
/// Keep the guard alive for as long as logs should be captured. Tests run on
/// the current-thread runtime, so spawned server tasks share the default.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("shot2sheet=info"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}

/// A small solid-colour PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([0, 128, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

async fn chat_png() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], png_bytes())
}

async fn preview_html() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        "<html><body>preview</body></html>",
    )
}

async fn token(
    State(recorder): State<Arc<Recorder>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let ok = form.get("grant_type").map(String::as_str)
        == Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
        && form.get("assertion").is_some_and(|a| a.split('.').count() == 3);
    recorder.token_forms.lock().unwrap().push(form);

    if ok {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": ACCESS_TOKEN,
                "expires_in": 3599,
                "token_type": "Bearer"
            })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT"
            })),
        )
    }
}

async fn append(
    State(recorder): State<Arc<Recorder>>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    recorder.appends.lock().unwrap().push(RecordedAppend {
        spreadsheet_id: spreadsheet_id.clone(),
        range: range.clone(),
        query: query.unwrap_or_default(),
        authorization,
        body,
    });

    if spreadsheet_id == FORBIDDEN_SHEET {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": {
                    "code": 403,
                    "message": "The caller does not have permission",
                    "status": "PERMISSION_DENIED"
                }
            })),
        );
    }

    let sheet = range.trim_end_matches(":append");
    (
        StatusCode::OK,
        Json(json!({
            "spreadsheetId": spreadsheet_id,
            "tableRange": format!("{sheet}!A1:E1"),
            "updates": {
                "spreadsheetId": spreadsheet_id,
                "updatedRange": format!("{sheet}!A2:E2"),
                "updatedRows": 1,
                "updatedColumns": 5,
                "updatedCells": 5
            }
        })),
    )
}
