//! Storage node server

use crate::common::{shutdown_signal, Result, StorageNodeConfig};
use crate::volume::http::{create_router, VolumeState};
use crate::volume::store::ChunkStore;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct VolumeServer {
    config: StorageNodeConfig,
    node_id: String,
    max_body_bytes: usize,
}

impl VolumeServer {
    pub fn new(config: StorageNodeConfig, node_id: String, max_body_bytes: usize) -> Self {
        Self {
            config,
            node_id,
            max_body_bytes,
        }
    }

    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        self.run(listener).await
    }

    /// Serve on an already-bound listener until ctrl-c
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        tracing::info!("Starting storage node: {}", self.node_id);
        tracing::info!("  HTTP API: {}", listener.local_addr()?);
        tracing::info!("  Data path: {}", self.config.directory.display());

        let store = Arc::new(ChunkStore::open(&self.config.directory).await?);
        let stats = store.stats().await?;
        tracing::info!("  Chunks on disk: {}", stats.total_chunks);

        let router = create_router(
            VolumeState {
                store,
                node_id: self.node_id.clone(),
            },
            self.max_body_bytes,
        );

        tracing::info!("✓ Storage node ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Storage node {} stopped", self.node_id);
        Ok(())
    }
}
