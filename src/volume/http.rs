//! HTTP API for a storage node
//!
//! - `POST|PUT /uploadBlock?chunk=` with the raw chunk bytes
//! - `GET|HEAD /downloadBlock?chunk=`
//! - `DELETE /deleteBlock?chunk=`
//! - `GET /health`

use crate::common::Error;
use crate::volume::store::ChunkStore;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared storage-node state for HTTP handlers.
#[derive(Clone)]
pub struct VolumeState {
    pub store: Arc<ChunkStore>,
    pub node_id: String,
}

#[derive(Debug, Deserialize)]
struct ChunkQuery {
    chunk: Option<String>,
}

impl ChunkQuery {
    fn require(self) -> Result<String, Error> {
        match self.chunk {
            Some(chunk) if !chunk.is_empty() => Ok(chunk),
            _ => Err(Error::InvalidArgument("chunk is required".into())),
        }
    }
}

/// Creates the HTTP router; request bodies above `max_body_bytes` are refused.
pub fn create_router(state: VolumeState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/uploadBlock", post(upload_block).put(upload_block))
        .route("/downloadBlock", get(download_block).head(probe_block))
        .route("/deleteBlock", delete(delete_block))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn upload_block(
    State(state): State<VolumeState>,
    Query(query): Query<ChunkQuery>,
    body: Bytes,
) -> Result<String, Error> {
    let chunk = query.require()?;
    state.store.put(&chunk, &body).await?;
    Ok(format!("Chunk {} uploaded successfully", chunk))
}

async fn download_block(
    State(state): State<VolumeState>,
    Query(query): Query<ChunkQuery>,
) -> Result<impl IntoResponse, Error> {
    let chunk = query.require()?;
    let data = state.store.get(&chunk).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

async fn probe_block(
    State(state): State<VolumeState>,
    Query(query): Query<ChunkQuery>,
) -> Result<StatusCode, Error> {
    let chunk = query.require()?;
    if state.store.contains(&chunk).await? {
        Ok(StatusCode::OK)
    } else {
        Err(Error::NotFound(chunk))
    }
}

async fn delete_block(
    State(state): State<VolumeState>,
    Query(query): Query<ChunkQuery>,
) -> Result<impl IntoResponse, Error> {
    let chunk = query.require()?;
    state.store.delete(&chunk).await?;
    Ok(Json(json!({ "message": "Chunk deleted successfully" })))
}

async fn health(State(state): State<VolumeState>) -> Result<impl IntoResponse, Error> {
    let stats = state.store.stats().await?;
    Ok(Json(json!({
        "status": "healthy",
        "node_id": state.node_id,
        "chunks": stats.total_chunks,
        "bytes": stats.total_bytes,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
