//! Master (coordinator) binary

use chunkfs::{ClusterConfig, Coordinator};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chunkfs-master")]
#[command(about = "chunkfs master: file index and chunk placement")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the master server
    Serve {
        /// Cluster config file (defaults to $CHUNKFS_CONFIG or ./chunkfs.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override master.addr
        #[arg(long)]
        bind: Option<String>,

        /// Override master.metadata_path
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            metadata,
        } => {
            let mut config = ClusterConfig::load(config.as_deref())?;
            if let Some(bind) = bind {
                config.master.addr = bind;
            }
            if let Some(metadata) = metadata {
                config.master.metadata_path = Some(metadata);
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            Coordinator::new(config).serve().await?;
        }
    }

    Ok(())
}
