//! Client orchestration
//!
//! The client does all chunk I/O. It asks the coordinator where chunks live,
//! then talks to storage nodes directly. Transfers for one file run
//! concurrently and are joined before the command completes.

use crate::common::{
    assemble, chunk_id, parse_chunk_index, split, Error, IndexedChunk, Result,
};
use crate::coordinator::http::UploadRequest;
use crate::coordinator::placement::ChunkRoutes;
use bytes::Bytes;
use futures_util::future::try_join_all;
use reqwest::StatusCode;
use std::path::Path;

/// Outcome of a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub file_name: String,
    pub bytes: u64,
    pub chunks: usize,
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    master: String,
}

impl Client {
    /// Client for the coordinator at `master` (host:port or full URL)
    pub fn new(master: &str) -> Self {
        Self::with_http(reqwest::Client::new(), master)
    }

    pub fn with_http(http: reqwest::Client, master: &str) -> Self {
        let master = if master.starts_with("http://") || master.starts_with("https://") {
            master.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", master.trim_end_matches('/'))
        };
        Self { http, master }
    }

    pub fn master_url(&self) -> &str {
        &self.master
    }

    /// Split the file at `path` and push it to the cluster under its base name.
    pub async fn upload_file(&self, path: &Path, chunk_size: usize) -> Result<UploadSummary> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("{} has no usable file name", path.display()))
            })?
            .to_string();

        let data = Bytes::from(tokio::fs::read(path).await?);
        self.upload_bytes(&file_name, data, chunk_size).await
    }

    /// Upload `data` as `file_name`
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        data: Bytes,
        chunk_size: usize,
    ) -> Result<UploadSummary> {
        let chunks = split(&data, chunk_size)?;
        if chunks.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "{} is empty; nothing to upload",
                file_name
            )));
        }
        let ids: Vec<String> = (0..chunks.len()).map(|i| chunk_id(file_name, i)).collect();

        let request = UploadRequest {
            file_name: file_name.to_string(),
            chunks: ids.clone(),
        };
        let resp = self
            .http
            .post(format!("{}/upload", self.master))
            .json(&request)
            .send()
            .await?;
        let routes: ChunkRoutes = read_json(resp, file_name).await?;

        tracing::info!(
            "Uploading {} ({} bytes) as {} chunks",
            file_name,
            data.len(),
            chunks.len()
        );

        let pushes = ids.iter().zip(chunks).map(|(id, chunk)| {
            let url = routes.get(id).cloned();
            async move {
                let url = url.ok_or_else(|| {
                    Error::Http(format!("coordinator returned no node for {}", id))
                })?;
                tracing::debug!("PUT {} ({} bytes) -> {}", id, chunk.len(), url);
                let resp = self.http.post(&url).body(chunk).send().await?;
                check_status(resp, id).await?;
                Ok::<_, Error>(())
            }
        });
        try_join_all(pushes).await?;

        Ok(UploadSummary {
            file_name: file_name.to_string(),
            bytes: data.len() as u64,
            chunks: ids.len(),
        })
    }

    /// Fetch every chunk of `file_name` and reassemble it in memory
    pub async fn download_bytes(&self, file_name: &str) -> Result<Bytes> {
        let routes = self.download_routes(file_name).await?;
        let expected = routes.len();

        let pulls = routes.into_iter().map(|(id, url)| async move {
            let index = parse_chunk_index(&id)?;
            tracing::debug!("GET {} <- {}", id, url);
            let resp = self.http.get(&url).send().await?;
            let resp = check_status(resp, &id).await?;
            Ok::<_, Error>(IndexedChunk::new(index, resp.bytes().await?))
        });
        let chunks = try_join_all(pulls).await?;

        assemble(chunks, expected)
    }

    /// Download `file_name` and write it to `dest`
    pub async fn download_file(&self, file_name: &str, dest: &Path) -> Result<u64> {
        let data = self.download_bytes(file_name).await?;
        tokio::fs::write(dest, &data).await?;
        tracing::info!("Downloaded {} -> {}", file_name, dest.display());
        Ok(data.len() as u64)
    }

    /// Remove `file_name` from the coordinator, then its chunks from the nodes.
    ///
    /// Returns the number of chunks deleted. Chunks already missing on their
    /// node are skipped.
    pub async fn delete_file(&self, file_name: &str) -> Result<usize> {
        let resp = self
            .http
            .delete(format!("{}/delete", self.master))
            .query(&[("fileName", file_name)])
            .send()
            .await?;
        let routes: ChunkRoutes = read_json(resp, file_name).await?;

        let removals = routes.into_iter().map(|(id, url)| async move {
            let resp = self.http.delete(&url).send().await?;
            match check_status(resp, &id).await {
                Ok(_) => Ok::<bool, Error>(true),
                Err(Error::NotFound(_)) => {
                    tracing::warn!("Chunk {} was already absent from its node", id);
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        });
        let removed = try_join_all(removals).await?;

        Ok(removed.into_iter().filter(|r| *r).count())
    }

    /// Names of all stored files
    pub async fn list_files(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(format!("{}/list", self.master))
            .send()
            .await?;
        read_json(resp, "list").await
    }

    /// Download routes for `file_name`, without fetching any chunk
    pub async fn download_routes(&self, file_name: &str) -> Result<ChunkRoutes> {
        let resp = self
            .http
            .get(format!("{}/download", self.master))
            .query(&[("fileName", file_name)])
            .send()
            .await?;
        read_json(resp, file_name).await
    }

    /// Does the node behind `url` hold the chunk?
    pub async fn probe_chunk(&self, url: &str) -> Result<bool> {
        let resp = self.http.head(url).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(Error::Http(format!("HEAD {} returned {}", url, s))),
        }
    }
}

/// Map a non-success response onto the error taxonomy
async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound(what.to_string()),
        StatusCode::BAD_REQUEST => Error::InvalidArgument(detail),
        StatusCode::SERVICE_UNAVAILABLE => Error::NoStorageNodesConfigured,
        _ => Error::Http(format!("{}: {} {}", what, status, detail)),
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T> {
    let resp = check_status(resp, what).await?;
    Ok(resp.json().await?)
}
