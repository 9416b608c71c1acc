//! Coordinator server

use crate::common::{shutdown_signal, ClusterConfig, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::metadata::MetadataIndex;
use crate::coordinator::placement::PlacementManager;
use crate::coordinator::service::CoordinatorService;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Coordinator {
    config: ClusterConfig,
}

impl Coordinator {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Open the metadata index and wire it to the configured topology
    pub fn build_service(&self) -> Result<CoordinatorService> {
        let index = match &self.config.master.metadata_path {
            Some(path) => MetadataIndex::open(path)?,
            None => {
                tracing::warn!("No metadata_path configured; file index will not survive restart");
                MetadataIndex::in_memory()
            }
        };
        let placement = PlacementManager::new(self.config.storage_nodes.clone());
        let service = CoordinatorService::new(index, placement);

        for name in service.drifted_files() {
            tracing::warn!(
                "{} was uploaded under a different storage node list and is unreachable until it is restored",
                name
            );
        }

        Ok(service)
    }

    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.master.addr).await?;
        self.run(listener).await
    }

    /// Serve on an already-bound listener until ctrl-c
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", listener.local_addr()?);
        match &self.config.master.metadata_path {
            Some(path) => tracing::info!("  Metadata: {}", path.display()),
            None => tracing::info!("  Metadata: in-memory"),
        }
        tracing::info!("  Storage nodes: {}", self.config.storage_nodes.len());
        for (i, node) in self.config.storage_nodes.iter().enumerate() {
            tracing::info!("    [{}] {}", i, node.addr);
        }

        let service = Arc::new(self.build_service()?);
        tracing::info!("  Files: {}", service.index().len());

        let router = create_router(CoordState { service });

        tracing::info!("✓ Coordinator ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Coordinator stopped");
        Ok(())
    }
}
