//! Client CLI: one-shot subcommands or an interactive prompt

use chunkfs::common::format_bytes;
use chunkfs::ops::verify_cluster;
use chunkfs::{Client, ClusterConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "chunkfs")]
#[command(about = "chunkfs client")]
#[command(version)]
struct Cli {
    /// Cluster config file (defaults to $CHUNKFS_CONFIG or ./chunkfs.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Master address, overrides master.addr
    #[arg(long)]
    master: Option<String>,

    /// Chunk size in bytes, overrides chunk_size
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Without a subcommand an interactive prompt is started
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Upload {
        /// Local file path
        path: PathBuf,
    },

    /// Download a stored file
    Download {
        /// Stored file name
        name: String,

        /// Destination path
        dest: PathBuf,
    },

    /// Delete a stored file and its chunks
    Delete {
        /// Stored file name
        name: String,
    },

    /// List stored files
    Ls,

    /// Check that every recorded chunk exists on its node
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let (master, chunk_size) = match (cli.master, cli.chunk_size) {
        (Some(master), Some(size)) => (master, size),
        (master, size) => {
            let config = ClusterConfig::load(cli.config.as_deref())?;
            (
                master.unwrap_or(config.master.addr),
                size.unwrap_or(config.chunk_size),
            )
        }
    };
    let client = Client::new(&master);

    match cli.command {
        Some(command) => run(&client, chunk_size, command).await,
        None => repl(&client, chunk_size).await,
    }
}

async fn run(client: &Client, chunk_size: usize, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Upload { path } => {
            let summary = client.upload_file(&path, chunk_size).await?;
            println!(
                "Uploaded {} ({}, {} chunks)",
                summary.file_name,
                format_bytes(summary.bytes),
                summary.chunks
            );
        }

        Commands::Download { name, dest } => {
            let bytes = client.download_file(&name, &dest).await?;
            println!(
                "Downloaded {} to {} ({})",
                name,
                dest.display(),
                format_bytes(bytes)
            );
        }

        Commands::Delete { name } => {
            let chunks = client.delete_file(&name).await?;
            println!("Deleted {} ({} chunks removed)", name, chunks);
        }

        Commands::Ls => {
            for name in client.list_files().await? {
                println!("{}", name);
            }
        }

        Commands::Verify { json } => {
            let report = verify_cluster(client).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Verification report:");
                println!("  Total files: {}", report.total_files);
                println!("  Healthy: {}", report.healthy_files);
                println!("  Missing chunks: {}", report.missing_chunks.len());
                for (file, chunk) in &report.missing_chunks {
                    println!("    {} -> {}", file, chunk);
                }
                println!("  Unreachable: {}", report.unreachable_files.len());
                for (file, reason) in &report.unreachable_files {
                    println!("    {}: {}", file, reason);
                }
            }
        }
    }

    Ok(())
}

const HELP: &str = "Available commands:
  upload <path>
  download <name> <dst path>
  delete <name>
  ls
  verify
  help
  quit";

async fn repl(client: &Client, chunk_size: usize) -> anyhow::Result<()> {
    println!("Connected to master at {}", client.master_url());
    println!("{}", HELP);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"Client Machine >> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            continue;
        };

        let command = match (cmd, args) {
            ("quit" | "exit", _) => {
                println!("Exiting...");
                break;
            }
            ("help", _) => {
                println!("{}", HELP);
                continue;
            }
            ("upload", [path]) => Commands::Upload {
                path: PathBuf::from(path),
            },
            ("download", [name, dest]) => Commands::Download {
                name: base_name(name),
                dest: PathBuf::from(dest),
            },
            ("delete", [name]) => Commands::Delete {
                name: base_name(name),
            },
            ("ls", _) => Commands::Ls,
            ("verify", _) => Commands::Verify { json: false },
            ("upload", _) => {
                println!("Usage: upload <path>");
                continue;
            }
            ("download", _) => {
                println!("Usage: download <name> <dst path>");
                continue;
            }
            ("delete", _) => {
                println!("Usage: delete <name>");
                continue;
            }
            (other, _) => {
                println!("Unknown command: {}", other);
                continue;
            }
        };

        if let Err(e) = run(client, chunk_size, command).await {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

/// Files are stored under their base name, so accept a path as well
fn base_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
        .to_string()
}
