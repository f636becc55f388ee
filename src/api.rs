//! HTTP surface for docsum.
//!
//! This module exposes a compact Axum router over the [`PipelineApi`]:
//!
//! - `POST /documents?filename=<name>` – Upload raw file bytes. Extracts text, stores the
//!   document, and either summarizes inline or queues a background job. Returns `201`.
//! - `GET /documents` – List the caller's documents, newest first.
//! - `DELETE /documents/:id` – Remove a document and its summary.
//! - `GET /documents/:id/summary` – Poll summary status, text, and guidance.
//! - `PATCH /documents/:id/summary` – Retry a failed summary.
//! - `POST /summarize` – Summarize raw text without storing anything.
//! - `GET /metrics` – Observe pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Document routes identify the caller through the `x-owner-id` header; a document owned by
//! someone else is reported as missing.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{PipelineApi, PipelineError, StatusView, rfc3339};
use crate::storage::{Document, DocumentId};
use crate::summarization::SummaryMode;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the caller's identity.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Build the HTTP router exposing the pipeline API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    // One byte of headroom lets an over-limit upload reach the extractor's size check.
    let body_limit = service.max_upload_bytes().saturating_add(1);
    Router::new()
        .route(
            "/documents",
            post(upload_document::<S>).get(list_documents::<S>),
        )
        .route("/documents/:id", delete(delete_document::<S>))
        .route(
            "/documents/:id/summary",
            get(get_summary::<S>).patch(retry_summary::<S>),
        )
        .route("/summarize", post(summarize::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

fn owner_id(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

fn parse_document_id(raw: &str) -> Result<DocumentId, AppError> {
    // Malformed identifiers cannot name an existing document.
    raw.parse().map_err(|_| AppError::Pipeline(PipelineError::NotFound))
}

/// Query string for `POST /documents`.
#[derive(Deserialize)]
struct UploadQuery {
    /// Original filename; its suffix selects the extractor.
    filename: Option<String>,
}

/// Document representation returned by upload and list routes.
#[derive(Serialize)]
struct DocumentResponse {
    id: String,
    original_filename: String,
    text_content: String,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<StatusView>,
}

impl DocumentResponse {
    fn new(document: Document, summary: Option<StatusView>) -> Self {
        Self {
            id: document.id.to_string(),
            original_filename: document.original_filename,
            text_content: document.text_content,
            created_at: rfc3339(document.created_at),
            summary,
        }
    }
}

/// Upload a document and start its summary.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError>
where
    S: PipelineApi,
{
    let owner = owner_id(&headers)?;
    let filename = query
        .filename
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Please provide a file to upload".into()))?;
    if body.is_empty() {
        return Err(AppError::BadRequest("Please provide a file to upload".into()));
    }

    let submission = service
        .submit_upload(&owner, &filename, body.to_vec())
        .await?;
    tracing::info!(
        document_id = %submission.document.id,
        status = %submission.summary.status,
        "Upload request completed"
    );
    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::new(
            submission.document,
            Some(submission.summary.into()),
        )),
    ))
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentResponse>,
}

/// List the caller's documents.
async fn list_documents<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: PipelineApi,
{
    let owner = owner_id(&headers)?;
    let documents = service
        .list_documents(&owner)
        .await?
        .into_iter()
        .map(|document| DocumentResponse::new(document, None))
        .collect();
    Ok(Json(DocumentsResponse { documents }))
}

/// Delete one of the caller's documents.
async fn delete_document<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: PipelineApi,
{
    let owner = owner_id(&headers)?;
    let document_id = parse_document_id(&id)?;
    service.delete_document(document_id, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return summary status, text, and guidance for non-complete states.
async fn get_summary<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<StatusView>, AppError>
where
    S: PipelineApi,
{
    let owner = owner_id(&headers)?;
    let document_id = parse_document_id(&id)?;
    Ok(Json(service.retrieve_status(document_id, &owner).await?))
}

/// Retry a failed summary.
async fn retry_summary<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: PipelineApi,
{
    let owner = owner_id(&headers)?;
    let document_id = parse_document_id(&id)?;
    let summary = service.retry(document_id, &owner).await?;
    Ok(Json(json!({
        "message": "Summary generation retried",
        "status": summary.status,
    })))
}

/// Request body for `POST /summarize`.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Raw text to summarize.
    text: String,
    /// `short`, `detailed`, or `both` (default).
    #[serde(default)]
    mode: SummaryMode,
}

/// Response body for `POST /summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    mode: SummaryMode,
    short_summary: String,
    detailed_notes: String,
}

/// Summarize raw text in the requested mode.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: PipelineApi,
{
    let output = service.summarize_text(&request.text, request.mode).await?;
    Ok(Json(SummarizeResponse {
        mode: request.mode,
        short_summary: output.short_summary,
        detailed_notes: output.detailed_notes,
    }))
}

/// Return a snapshot of pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload_document",
                method: "POST",
                path: "/documents?filename=<name>",
                description: "Upload raw PDF, DOCX, or TXT bytes with an x-owner-id header. Short documents are summarized inline; long ones return a pending summary.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "List the caller's documents, newest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_document",
                method: "DELETE",
                path: "/documents/:id",
                description: "Delete a document and its summary.",
                request_example: None,
            },
            CommandDescriptor {
                name: "get_summary",
                method: "GET",
                path: "/documents/:id/summary",
                description: "Poll summary status (pending, processing, complete, failed) with guidance for non-complete states.",
                request_example: None,
            },
            CommandDescriptor {
                name: "retry_summary",
                method: "PATCH",
                path: "/documents/:id/summary",
                description: "Re-queue a failed summary. Any other status returns 409.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize raw text without storing it.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "mode": "both"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Pipeline(PipelineError),
    BadRequest(String),
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                format!("Missing {OWNER_HEADER} header"),
            ),
            AppError::Pipeline(PipelineError::Extraction(error)) => (
                StatusCode::BAD_REQUEST,
                format!("Unable to process file: {error}"),
            ),
            AppError::Pipeline(PipelineError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            AppError::Pipeline(error @ PipelineError::InvalidState { .. }) => {
                (StatusCode::CONFLICT, error.to_string())
            }
            AppError::Pipeline(error) => {
                tracing::error!(error = %error, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}
