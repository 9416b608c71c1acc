//! Storage node implementation
//!
//! Holds chunks as opaque blobs, one file per chunk, with no knowledge of
//! which file they belong to or what other nodes store.

pub mod http;
pub mod server;
pub mod store;

pub use server::VolumeServer;
pub use store::ChunkStore;
