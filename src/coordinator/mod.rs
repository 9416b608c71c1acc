//! Coordinator (master) implementation
//!
//! The coordinator is responsible for:
//! - Metadata management (file → ordered chunk identifiers)
//! - Placement decisions (chunk index mod node count)
//! - Handing clients the node URL for every chunk

pub mod http;
pub mod metadata;
pub mod placement;
pub mod server;
pub mod service;

pub use server::Coordinator;
pub use service::CoordinatorService;
