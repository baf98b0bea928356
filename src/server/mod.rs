//! Web front end (axum).
//!
//! Endpoints:
//! - `GET|POST /`          landing page
//! - `GET /abstractor`     upload form
//! - `POST /abstractor`    run the pipeline, render both summaries and players
//! - `GET /static/{*path}` generated audio
//! - `POST /api/abstract`  same multipart form, JSON result
//! - `GET /api/languages`  selectable target languages (JSON)
//! - `GET /health`         returns "ok"

mod pages;

pub use pages::escape_html;

use crate::abstractor::{AbstractRequest, Abstractor, PipelineFailure};
use crate::error::{AbstractorError, Stage};
use crate::language::{LanguageCode, LanguageOption};
use crate::output::PartialOutput;
use crate::pipeline::input::Document;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    abstractor: Arc<Abstractor>,
}

impl AppState {
    pub fn new(abstractor: Arc<Abstractor>) -> Self {
        Self { abstractor }
    }
}

/// Build the application router.
pub fn router(abstractor: Arc<Abstractor>) -> Router {
    let body_limit = abstractor.config().max_upload_bytes;
    Router::new()
        .route("/", get(index).post(index))
        .route("/abstractor", get(form).post(abstract_html))
        .route("/static/{*path}", get(static_file))
        .route("/api/abstract", axum::routing::post(abstract_json))
        .route("/api/languages", get(languages))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState::new(abstractor))
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(abstractor: Arc<Abstractor>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(abstractor))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Error → HTTP status ──────────────────────────────────────────────────────

/// HTTP status for a request-fatal error.
pub fn status_for(error: &AbstractorError) -> StatusCode {
    use AbstractorError::*;
    match error {
        MissingField { .. } | MalformedForm(_) | EmptyUpload { .. } | NotAPdf { .. } => {
            StatusCode::BAD_REQUEST
        }
        UnsupportedLanguage { .. }
        | FileNotFound { .. }
        | CorruptPdf { .. }
        | PasswordRequired { .. }
        | EmptyPage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SummarizationFailed { source, .. }
        | TranslationFailed { source, .. }
        | SynthesisFailed { source, .. } => {
            if source.is_some() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
        UploadWriteFailed { .. }
        | AudioWriteFailed { .. }
        | PdfiumBindingFailed(_)
        | ProviderNotConfigured { .. }
        | InvalidConfig(_)
        | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    #[serde(skip_serializing_if = "PartialOutput::is_empty")]
    partial: &'a PartialOutput,
}

// ── Form parsing ─────────────────────────────────────────────────────────────

struct UploadForm {
    document: Option<Document>,
    target_lang: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, (StatusCode, String)> {
    let mut form = UploadForm {
        document: None,
        target_lang: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err((e.status(), e.body_text())),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("pdf_file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| (e.status(), e.body_text()))?;
                // Browsers send an empty, unnamed part when no file was chosen.
                if !(file_name.is_empty() && bytes.is_empty()) {
                    form.document = Some(Document::new(file_name, bytes.to_vec()));
                }
            }
            Some("target_lang") => {
                let value = field.text().await.map_err(|e| (e.status(), e.body_text()))?;
                if !value.trim().is_empty() {
                    form.target_lang = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn into_request(form: UploadForm) -> Result<AbstractRequest, AbstractorError> {
    let document = form
        .document
        .ok_or(AbstractorError::MissingField { field: "pdf_file" })?;
    let target_lang = form
        .target_lang
        .ok_or(AbstractorError::MissingField {
            field: "target_lang",
        })?;
    Ok(AbstractRequest {
        document,
        target_lang: LanguageCode::new(target_lang),
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn index() -> Html<String> {
    Html(pages::index_page())
}

async fn form(State(state): State<AppState>) -> Html<String> {
    Html(pages::form_page(&state.abstractor.supported_languages()))
}

/// POST /abstractor - run the pipeline and render the result page.
async fn abstract_html(State(state): State<AppState>, multipart: Multipart) -> Response {
    let languages = state.abstractor.supported_languages();

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err((status, message)) => {
            let err = AbstractorError::MalformedForm(message);
            let html = pages::error_page(&err, &PartialOutput::default(), &languages, None);
            return (status, Html(html)).into_response();
        }
    };
    let selected = form.target_lang.clone();

    let request = match into_request(form) {
        Ok(r) => r,
        Err(e) => {
            let html =
                pages::error_page(&e, &PartialOutput::default(), &languages, selected.as_deref());
            return (status_for(&e), Html(html)).into_response();
        }
    };

    match state.abstractor.process(request).await {
        Ok(output) => Html(pages::result_page(&output, &languages)).into_response(),
        Err(PipelineFailure { error, partial, .. }) => {
            let html = pages::error_page(&error, &partial, &languages, selected.as_deref());
            (status_for(&error), Html(html)).into_response()
        }
    }
}

/// POST /api/abstract - run the pipeline and return JSON.
async fn abstract_json(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err((status, message)) => {
            let body = ErrorBody {
                error: message,
                stage: Stage::Upload,
                request_id: None,
                partial: &PartialOutput::default(),
            };
            return (status, Json(body)).into_response();
        }
    };

    let request = match into_request(form) {
        Ok(r) => r,
        Err(e) => {
            let body = ErrorBody {
                error: e.to_string(),
                stage: e.stage(),
                request_id: None,
                partial: &PartialOutput::default(),
            };
            return (status_for(&e), Json(body)).into_response();
        }
    };

    match state.abstractor.process(request).await {
        Ok(output) => Json(output).into_response(),
        Err(failure) => {
            let body = ErrorBody {
                error: failure.error.to_string(),
                stage: failure.stage(),
                request_id: Some(&failure.request_id),
                partial: &failure.partial,
            };
            (status_for(&failure.error), Json(body)).into_response()
        }
    }
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageOption>> {
    Json(state.abstractor.supported_languages())
}

async fn health_check() -> &'static str {
    "ok"
}

/// GET /static/{*path} - serve a generated file.
async fn static_file(
    AxumPath(path): AxumPath<String>,
    State(state): State<AppState>,
) -> Response {
    let Some(relative) = safe_relative_path(&path) else {
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    };
    let file_path = state.abstractor.config().static_dir.join(relative);

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for(&file_path))],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response(),
    }
}

/// Accept only plain relative paths made of normal components.
fn safe_relative_path(path: &str) -> Option<&Path> {
    if path.is_empty() || path.contains('\\') {
        return None;
    }
    let p = Path::new(path);
    p.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(p)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
