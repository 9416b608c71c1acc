//! HTTP API for the coordinator
//!
//! - `POST /upload` with `{"fileName", "chunks"}` → chunk → upload URL
//! - `GET /download?fileName=` → chunk → download URL
//! - `DELETE /delete?fileName=` → chunk → delete URL
//! - `GET /list` → file names
//! - `GET /health`

use crate::common::Error;
use crate::coordinator::placement::ChunkRoutes;
use crate::coordinator::service::CoordinatorService;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared coordinator state for HTTP handlers.
#[derive(Clone)]
pub struct CoordState {
    pub service: Arc<CoordinatorService>,
}

/// Body of `POST /upload`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    pub chunks: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileQuery {
    file_name: Option<String>,
}

impl FileQuery {
    fn require(self) -> Result<String, Error> {
        match self.file_name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::InvalidArgument("fileName is required".into())),
        }
    }
}

/// Creates the HTTP router with all coordinator endpoints.
pub fn create_router(state: CoordState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/download", get(download))
        .route("/delete", delete(delete_file))
        .route("/list", get(list))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn upload(
    State(state): State<CoordState>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<ChunkRoutes>, Error> {
    let Json(req) = body.map_err(|e| Error::InvalidArgument(e.body_text()))?;
    let routes = state.service.upload(&req.file_name, req.chunks)?;
    Ok(Json(routes))
}

async fn download(
    State(state): State<CoordState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<ChunkRoutes>, Error> {
    let name = query.require()?;
    Ok(Json(state.service.download(&name)?))
}

async fn delete_file(
    State(state): State<CoordState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<ChunkRoutes>, Error> {
    let name = query.require()?;
    Ok(Json(state.service.delete(&name)?))
}

async fn list(State(state): State<CoordState>) -> Json<Vec<String>> {
    Json(state.service.list())
}

async fn health(State(state): State<CoordState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "files": state.service.index().len(),
        "storage_nodes": state.service.placement().node_count(),
        "persistent": state.service.index().is_persistent(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
