//! Verify that every recorded chunk actually landed on its node
//!
//! Uploads are a metadata write followed by independent chunk pushes, so a
//! failed push leaves the index pointing at a chunk no node holds. This pass
//! finds those files. It only reads; nothing is repaired or removed.

use crate::client::Client;
use crate::common::Result;
use futures_util::future::join_all;
use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct VerifyReport {
    pub total_files: usize,
    pub healthy_files: usize,
    /// (file, chunk) pairs the assigned node does not hold
    pub missing_chunks: Vec<(String, String)>,
    /// (file, reason) for files whose routes or chunks could not be checked
    pub unreachable_files: Vec<(String, String)>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.missing_chunks.is_empty() && self.unreachable_files.is_empty()
    }
}

pub async fn verify_cluster(client: &Client) -> Result<VerifyReport> {
    tracing::info!("Starting cluster verification");

    let files = client.list_files().await?;
    let mut report = VerifyReport {
        total_files: files.len(),
        ..Default::default()
    };

    for file in files {
        let routes = match client.download_routes(&file).await {
            Ok(routes) => routes,
            Err(e) => {
                tracing::warn!("Cannot resolve {}: {}", file, e);
                report.unreachable_files.push((file, e.to_string()));
                continue;
            }
        };

        let probes = routes.iter().map(|(chunk, url)| async move {
            (chunk.clone(), client.probe_chunk(url).await)
        });

        let mut missing = Vec::new();
        let mut failure = None;
        for (chunk, outcome) in join_all(probes).await {
            match outcome {
                Ok(true) => {}
                Ok(false) => missing.push(chunk),
                Err(e) => failure = Some(e.to_string()),
            }
        }

        if missing.is_empty() && failure.is_none() {
            report.healthy_files += 1;
        }
        if let Some(reason) = failure {
            tracing::warn!("Could not check every chunk of {}: {}", file, reason);
            report.unreachable_files.push((file.clone(), reason));
        }
        for chunk in missing {
            tracing::warn!("{} is missing chunk {}", file, chunk);
            report.missing_chunks.push((file.clone(), chunk));
        }
    }

    tracing::info!(
        "Verification done: {}/{} files healthy",
        report.healthy_files,
        report.total_files
    );
    Ok(report)
}
