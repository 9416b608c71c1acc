//! Coordinator request handling
//!
//! The coordinator never touches chunk bytes. It records which chunks make up
//! a file and tells the client which node holds (or should hold) each one;
//! the client moves the bytes itself.

use crate::common::{parse_chunk_index, validate_key, Error, Result};
use crate::coordinator::metadata::{FileEntry, MetadataIndex};
use crate::coordinator::placement::{ChunkRoutes, NodeEndpoint, PlacementManager};
use std::collections::HashSet;

pub struct CoordinatorService {
    index: MetadataIndex,
    placement: PlacementManager,
}

impl CoordinatorService {
    pub fn new(index: MetadataIndex, placement: PlacementManager) -> Self {
        Self { index, placement }
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn placement(&self) -> &PlacementManager {
        &self.placement
    }

    /// Record `name` as the ordered `chunks` and return where to push each one.
    ///
    /// Routes are resolved before the index is touched, so a cluster with no
    /// nodes never records a file.
    pub fn upload(&self, name: &str, chunks: Vec<String>) -> Result<ChunkRoutes> {
        validate_key(name)?;
        if chunks.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "upload of {} has no chunks",
                name
            )));
        }
        let mut seen = HashSet::with_capacity(chunks.len());
        for (position, chunk) in chunks.iter().enumerate() {
            validate_key(chunk)?;
            if !seen.insert(chunk.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate chunk identifier {}",
                    chunk
                )));
            }
            // Readers reassemble by the index in the identifier; it must match placement.
            if let Ok(index) = parse_chunk_index(chunk) {
                if index != position {
                    return Err(Error::InvalidArgument(format!(
                        "chunk {} is at position {} but names index {}",
                        chunk, position, index
                    )));
                }
            }
        }

        let routes = self.placement.route(&chunks, NodeEndpoint::Upload)?;
        let count = chunks.len();
        let entry = FileEntry::new(chunks, self.placement.fingerprint());

        match self.index.put(name, entry)? {
            Some(previous) => tracing::info!(
                "Replaced {} ({} chunks, was {})",
                name,
                count,
                previous.chunks.len()
            ),
            None => tracing::info!("Recorded {} ({} chunks)", name, count),
        }

        Ok(routes)
    }

    /// Where to fetch each chunk of `name`
    pub fn download(&self, name: &str) -> Result<ChunkRoutes> {
        let entry = self.index.get(name)?;
        self.check_topology(name, &entry)?;
        tracing::debug!("Resolved {} for download ({} chunks)", name, entry.chunks.len());
        self.placement.route(&entry.chunks, NodeEndpoint::Download)
    }

    /// Forget `name` and return where each of its chunks must be deleted.
    ///
    /// Removing the chunks from the nodes is the caller's job.
    pub fn delete(&self, name: &str) -> Result<ChunkRoutes> {
        let mut routes = None;
        let entry = self.index.delete_if(name, |entry| {
            self.check_topology(name, entry)?;
            routes = Some(self.placement.route(&entry.chunks, NodeEndpoint::Delete)?);
            Ok(())
        })?;
        tracing::info!("Deleted {} ({} chunks)", name, entry.chunks.len());
        routes.ok_or_else(|| Error::Internal(format!("no routes computed for {}", name)))
    }

    /// Names of all stored files
    pub fn list(&self) -> Vec<String> {
        self.index.list()
    }

    /// Files recorded under a different node list than the current one
    pub fn drifted_files(&self) -> Vec<String> {
        self.index
            .entries()
            .into_iter()
            .filter(|(_, e)| e.topology != self.placement.fingerprint())
            .map(|(name, _)| name)
            .collect()
    }

    fn check_topology(&self, name: &str, entry: &FileEntry) -> Result<()> {
        if entry.topology != self.placement.fingerprint() {
            return Err(Error::TopologyChanged {
                file: name.to_string(),
                recorded: entry.topology.clone(),
                current: self.placement.fingerprint().to_string(),
            });
        }
        Ok(())
    }
}
