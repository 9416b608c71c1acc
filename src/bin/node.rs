//! Storage node binary

use anyhow::Result;
use chunkfs::{ClusterConfig, VolumeServer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chunkfs-node")]
#[command(about = "chunkfs storage node: stores chunks as opaque blobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a storage node
    Serve {
        /// Cluster config file (defaults to $CHUNKFS_CONFIG or ./chunkfs.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Which configured storage node to run (starting from 1)
        #[arg(long, default_value = "1")]
        node: usize,

        /// Override the node's data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            node,
            data_dir,
        } => {
            let config = ClusterConfig::load(config.as_deref())?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let mut node_config = config.storage_node(node)?.clone();
            if let Some(dir) = data_dir {
                node_config.directory = dir;
            }

            let server = VolumeServer::new(
                node_config,
                format!("node-{}", node),
                config.max_chunk_bytes,
            );
            server.serve().await?;
        }
    }

    Ok(())
}
