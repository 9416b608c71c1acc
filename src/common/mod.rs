//! Common utilities and types shared across chunkfs

pub mod chunk;
pub mod config;
pub mod error;
pub mod hash;
pub mod utils;

pub use chunk::{assemble, chunk_id, parse_chunk_index, split, IndexedChunk};
pub use config::{topology_fingerprint, ClusterConfig, MasterConfig, StorageNodeConfig};
pub use error::{Error, Result};
pub use hash::blake3_hash;
pub use utils::{encode_key, format_bytes, shutdown_signal, validate_key};
