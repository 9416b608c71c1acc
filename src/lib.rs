//! # chunkfs
//!
//! A minimal chunked distributed file store:
//! - Clients split files into fixed-size chunks
//! - A single master maps each file name to its ordered chunk identifiers
//! - Chunk `i` lives on storage node `i mod N`
//! - Storage nodes keep chunks as opaque blobs
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │           Master             │
//!            │  file → [chunk ids]          │
//!            │  placement: index mod N      │
//!            └──────────────▲───────────────┘
//!                           │ where do chunks go?
//!                    ┌──────┴──────┐
//!                    │   Client    │
//!                    └──┬───────┬──┘
//!          chunk bytes  │       │  chunk bytes
//!        ┌──────────────▼┐     ┌▼──────────────┐
//!        │ Storage node 0│ ... │ Storage node N│
//!        └───────────────┘     └───────────────┘
//! ```
//!
//! The master never sees chunk bytes. Placement is recomputed from the
//! ordered node list on every request, so that list must stay the same for
//! as long as the files stored under it are needed.
//!
//! ## Usage
//!
//! ```bash
//! chunkfs-master serve --config chunkfs.toml
//! chunkfs-node serve --config chunkfs.toml --node 1
//! chunkfs --config chunkfs.toml upload ./report.pdf
//! chunkfs --config chunkfs.toml download report.pdf ./copy.pdf
//! chunkfs --config chunkfs.toml        # interactive prompt
//! ```

pub mod client;
pub mod common;
pub mod coordinator;
pub mod ops;
pub mod volume;

// Re-export commonly used types
pub use client::Client;
pub use common::{ClusterConfig, Error, Result};
pub use coordinator::Coordinator;
pub use volume::VolumeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
