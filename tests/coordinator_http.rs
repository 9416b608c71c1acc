//! Coordinator HTTP API, driven in-process

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chunkfs::common::StorageNodeConfig;
use chunkfs::coordinator::http::{create_router, CoordState};
use chunkfs::coordinator::metadata::MetadataIndex;
use chunkfs::coordinator::placement::{ChunkRoutes, PlacementManager};
use chunkfs::coordinator::CoordinatorService;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn router(addrs: &[&str]) -> Router {
    let nodes = addrs
        .iter()
        .map(|a| StorageNodeConfig {
            addr: a.to_string(),
            directory: PathBuf::from("/tmp"),
        })
        .collect();
    let service = CoordinatorService::new(MetadataIndex::in_memory(), PlacementManager::new(nodes));
    create_router(CoordState {
        service: Arc::new(service),
    })
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn upload(body: Value) -> Request<Body> {
    Request::post("/upload")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_upload_download_delete_list() {
    let app = router(&["10.0.0.1:9001", "10.0.0.2:9002"]);

    let (status, body) = send(
        &app,
        upload(json!({ "fileName": "a.txt", "chunks": ["a.txt_chunk_0", "a.txt_chunk_1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let routes: ChunkRoutes = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        routes["a.txt_chunk_0"],
        "http://10.0.0.1:9001/uploadBlock?chunk=a.txt_chunk_0"
    );
    assert_eq!(
        routes["a.txt_chunk_1"],
        "http://10.0.0.2:9002/uploadBlock?chunk=a.txt_chunk_1"
    );

    let (status, body) = send(&app, get("/download?fileName=a.txt")).await;
    assert_eq!(status, StatusCode::OK);
    let routes: ChunkRoutes = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        routes["a.txt_chunk_1"],
        "http://10.0.0.2:9002/downloadBlock?chunk=a.txt_chunk_1"
    );

    let (status, body) = send(&app, get("/list")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(names, vec!["a.txt".to_string()]);

    let (status, body) = send(&app, delete("/delete?fileName=a.txt")).await;
    assert_eq!(status, StatusCode::OK);
    let routes: ChunkRoutes = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        routes["a.txt_chunk_0"],
        "http://10.0.0.1:9001/deleteBlock?chunk=a.txt_chunk_0"
    );

    let (_, body) = send(&app, get("/list")).await;
    let names: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert!(names.is_empty());

    let (status, _) = send(&app, get("/download?fileName=a.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reupload_drops_old_chunks() {
    let app = router(&["n0:1", "n1:1"]);

    send(
        &app,
        upload(json!({ "fileName": "a.txt", "chunks": ["a.txt_chunk_0", "a.txt_chunk_1"] })),
    )
    .await;
    let (status, _) = send(
        &app,
        upload(json!({ "fileName": "a.txt", "chunks": ["v2_chunk_0", "v2_chunk_1", "v2_chunk_2"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/download?fileName=a.txt")).await;
    let routes: ChunkRoutes = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        routes.keys().cloned().collect::<Vec<_>>(),
        vec!["v2_chunk_0", "v2_chunk_1", "v2_chunk_2"]
    );
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let app = router(&["n0:1"]);
    let (status, body) = send(&app, get("/download?fileName=missing.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].as_str().unwrap().contains("missing.txt"));

    let (status, _) = send(&app, delete("/delete?fileName=missing.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_are_400() {
    let app = router(&["n0:1"]);

    let (status, _) = send(&app, get("/download")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, delete("/delete?fileName=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, upload(json!({ "fileName": "a.txt" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, upload(json!({ "fileName": "a.txt", "chunks": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/list")).await;
    let names: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_out_of_order_chunk_ids_are_400() {
    let app = router(&["n0:1", "n1:1"]);

    let (status, body) = send(
        &app,
        upload(json!({ "fileName": "f", "chunks": ["f_chunk_1", "f_chunk_0"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_slice(&body).unwrap();
    assert!(err["error"].as_str().unwrap().contains("f_chunk_1"));

    let (status, _) = send(&app, get("/download?fileName=f")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_no_storage_nodes_is_503() {
    let app = router(&[]);
    let (status, _) = send(
        &app,
        upload(json!({ "fileName": "a.txt", "chunks": ["a.txt_chunk_0"] })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health() {
    let app = router(&["n0:1", "n1:1", "n2:1"]);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["storage_nodes"], 3);
    assert_eq!(health["files"], 0);
}
