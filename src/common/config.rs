//! Cluster configuration for chunkfs
//!
//! The topology (master address plus the ordered list of storage nodes) is
//! part of the addressing scheme: chunk placement is recomputed from the node
//! list on every request, so the order of `storage_nodes` must not change
//! while files uploaded under it are still needed.

use crate::common::{blake3_hash, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "CHUNKFS_CONFIG";

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "chunkfs.toml";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Chunk size used by clients when splitting files
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest request body a storage node accepts
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,

    /// Master (coordinator) settings
    pub master: MasterConfig,

    /// Storage nodes, in placement order
    #[serde(default)]
    pub storage_nodes: Vec<StorageNodeConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_chunk_size() -> usize {
    1024 * 1024
}
fn default_max_chunk_bytes() -> usize {
    64 * 1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Master configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// host:port the master listens on and clients dial
    pub addr: String,

    /// Metadata snapshot file; `None` keeps the index in memory only
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,
}

/// A single storage node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNodeConfig {
    /// host:port the node listens on and clients dial
    pub addr: String,

    /// Root directory for this node's chunks
    pub directory: PathBuf,
}

impl ClusterConfig {
    /// Load configuration from a TOML file overlaid with `CHUNKFS__*` env vars.
    ///
    /// With no explicit path, `CHUNKFS_CONFIG` is consulted, then
    /// `chunkfs.toml` in the working directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        tracing::debug!("Loading cluster config from {}", path.display());

        let cfg: ClusterConfig = config::Config::builder()
            .add_source(config::File::from(path.as_path()).format(config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix("CHUNKFS").separator("__"))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse configuration from an in-memory TOML document
    pub fn from_toml(source: &str) -> Result<Self> {
        let cfg: ClusterConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values no component can work with.
    ///
    /// An empty node list is allowed here; placement reports it per request.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.max_chunk_bytes < self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "max_chunk_bytes ({}) must be >= chunk_size ({})",
                self.max_chunk_bytes, self.chunk_size
            )));
        }
        if self.master.addr.trim().is_empty() {
            return Err(Error::InvalidConfig("master.addr is empty".into()));
        }
        for (i, node) in self.storage_nodes.iter().enumerate() {
            if node.addr.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "storage_nodes[{}].addr is empty",
                    i
                )));
            }
            if node.directory.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "storage_nodes[{}].directory is empty",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Look up a storage node by its 1-based position
    pub fn storage_node(&self, ordinal: usize) -> Result<&StorageNodeConfig> {
        if ordinal == 0 || ordinal > self.storage_nodes.len() {
            return Err(Error::InvalidConfig(format!(
                "storage node index {} out of range 1..={}",
                ordinal,
                self.storage_nodes.len()
            )));
        }
        Ok(&self.storage_nodes[ordinal - 1])
    }

    /// Fingerprint of the ordered node list
    pub fn topology_fingerprint(&self) -> String {
        topology_fingerprint(&self.storage_nodes)
    }
}

/// Hash of the ordered node addresses.
///
/// Any change in membership, order or count changes the fingerprint.
pub fn topology_fingerprint(nodes: &[StorageNodeConfig]) -> String {
    let joined = nodes
        .iter()
        .map(|n| n.addr.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    blake3_hash(joined.as_bytes())
}
