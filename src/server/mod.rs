//! HTTP veneer over the processing pipeline
//!
//! Transport concerns only: multipart decoding, status-code mapping, and
//! download/cleanup endpoints. Operation failures stay 200 with
//! `success: false`; pipeline rejections map to 400 (413 for oversize
//! uploads) and still carry a well-formed body.

use crate::config::ServiceConfig;
use crate::session::manager::{ProcessRequest, Rejection, SessionManager};
use crate::staging::UploadedFile;
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// API server wrapping the session manager
pub struct ApiServer {
    manager: Arc<SessionManager>,
    port: u16,
    body_limit: usize,
}

impl ApiServer {
    pub fn new(config: &ServiceConfig, manager: Arc<SessionManager>) -> Self {
        // leave headroom for multipart framing around the payload ceiling
        let body_limit = (config.max_upload_bytes as usize).saturating_add(1024 * 1024);
        Self {
            manager,
            port: config.port,
            body_limit,
        }
    }

    /// Start serving; runs until the process exits
    pub async fn start(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let app = self.build_router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }

    fn build_router(self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/functions", get(list_functions))
            .route("/api/process", post(process))
            .route("/api/download/{session_id}/{filename}", get(download))
            .route("/api/sessions/{session_id}/cleanup", delete(cleanup))
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(CorsLayer::permissive())
            .with_state(self.manager)
    }
}

async fn health_check(State(manager): State<Arc<SessionManager>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "operations": manager.registry().catalog().len(),
    }))
}

async fn list_functions(State(manager): State<Arc<SessionManager>>) -> Json<serde_json::Value> {
    let functions: BTreeMap<&str, &str> = manager.registry().catalog().into_iter().collect();
    Json(json!({
        "success": true,
        "functions": functions,
    }))
}

async fn process(
    State(manager): State<Arc<SessionManager>>,
    mut multipart: Multipart,
) -> Response {
    let mut operation: Option<String> = None;
    let mut args: Vec<String> = Vec::new();
    let mut files: Vec<UploadedFile> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("Malformed multipart body: {e}")),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("function") => match field.text().await {
                Ok(text) => operation = Some(text.trim().to_string()),
                Err(e) => return bad_request(format!("Invalid function field: {e}")),
            },
            Some("args") => match field.text().await {
                Ok(text) => {
                    args = text
                        .split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(String::from)
                        .collect();
                }
                Err(e) => return bad_request(format!("Invalid args field: {e}")),
            },
            Some("files") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => files.push(UploadedFile::new(filename, bytes.to_vec())),
                    Err(e) => return bad_request(format!("Invalid file upload: {e}")),
                }
            }
            _ => {}
        }
    }

    let Some(operation) = operation.filter(|o| !o.is_empty()) else {
        return bad_request("function parameter is required");
    };
    if files.is_empty() {
        return bad_request("No files uploaded");
    }

    let result = manager
        .process(ProcessRequest {
            operation,
            files,
            args,
        })
        .await;

    let status = match result.rejection {
        Some(Rejection::PayloadTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(Rejection::BadRequest) => StatusCode::BAD_REQUEST,
        None => StatusCode::OK,
    };
    (status, Json(result)).into_response()
}

async fn download(
    State(manager): State<Arc<SessionManager>>,
    Path((session_id, filename)): Path<(String, String)>,
) -> Response {
    match manager.retrieve(&session_id, &filename).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": "File not found",
            })),
        )
            .into_response(),
    }
}

async fn cleanup(
    State(manager): State<Arc<SessionManager>>,
    Path(session_id): Path<String>,
) -> Response {
    match manager.purge(&session_id).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": format!("Session {session_id} cleaned up"),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}
