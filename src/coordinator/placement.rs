//! Placement policy
//!
//! A chunk's node is a pure function of its sequence index and the ordered
//! node list: `index mod node_count`. Nothing about placement is persisted;
//! it is recomputed on every download and delete, which makes the node list
//! itself part of every chunk's address.

use crate::common::{encode_key, topology_fingerprint, Error, Result, StorageNodeConfig};
use std::collections::BTreeMap;

/// Chunk identifier → node URL
pub type ChunkRoutes = BTreeMap<String, String>;

/// Map a chunk's sequence index to a node ordinal
pub fn assign(index: usize, node_count: usize) -> Result<usize> {
    if node_count == 0 {
        return Err(Error::NoStorageNodesConfigured);
    }
    Ok(index % node_count)
}

/// Storage-node endpoint a route points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEndpoint {
    Upload,
    Download,
    Delete,
}

impl NodeEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            NodeEndpoint::Upload => "uploadBlock",
            NodeEndpoint::Download => "downloadBlock",
            NodeEndpoint::Delete => "deleteBlock",
        }
    }
}

/// PlacementManager resolves chunks to storage-node URLs for a fixed topology.
pub struct PlacementManager {
    /// Storage nodes in placement order
    nodes: Vec<StorageNodeConfig>,
    /// Fingerprint of `nodes`
    fingerprint: String,
}

impl PlacementManager {
    pub fn new(nodes: Vec<StorageNodeConfig>) -> Self {
        let fingerprint = topology_fingerprint(&nodes);
        Self { nodes, fingerprint }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Node responsible for the chunk at `index`
    pub fn select_node(&self, index: usize) -> Result<&StorageNodeConfig> {
        let ordinal = assign(index, self.nodes.len())?;
        Ok(&self.nodes[ordinal])
    }

    /// Resolve every chunk (by its position in `chunks`) to a node URL.
    pub fn route(&self, chunks: &[String], endpoint: NodeEndpoint) -> Result<ChunkRoutes> {
        let mut routes = ChunkRoutes::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let node = self.select_node(index)?;
            routes.insert(chunk.clone(), chunk_url(&node.addr, endpoint, chunk));
        }
        Ok(routes)
    }
}

/// URL of `endpoint` for `chunk` on the node at `addr`
pub fn chunk_url(addr: &str, endpoint: NodeEndpoint, chunk: &str) -> String {
    format!(
        "http://{}/{}?chunk={}",
        addr,
        endpoint.path(),
        encode_key(chunk)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn nodes(addrs: &[&str]) -> Vec<StorageNodeConfig> {
        addrs
            .iter()
            .map(|a| StorageNodeConfig {
                addr: a.to_string(),
                directory: PathBuf::from(format!("/data/{}", a)),
            })
            .collect()
    }

    fn chunk_ids(name: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| crate::common::chunk_id(name, i)).collect()
    }

    #[test]
    fn test_assign_is_modulo() {
        assert_eq!(assign(0, 3).unwrap(), 0);
        assert_eq!(assign(1, 3).unwrap(), 1);
        assert_eq!(assign(2, 3).unwrap(), 2);
        assert_eq!(assign(3, 3).unwrap(), 0);
        assert_eq!(assign(7, 1).unwrap(), 0);
    }

    #[test]
    fn test_assign_without_nodes() {
        assert!(matches!(assign(0, 0), Err(Error::NoStorageNodesConfigured)));
    }

    #[test]
    fn test_assign_is_deterministic() {
        for count in 1..8 {
            for index in 0..64 {
                let first = assign(index, count).unwrap();
                for _ in 0..4 {
                    assert_eq!(assign(index, count).unwrap(), first);
                }
                assert!(first < count);
            }
        }
    }

    #[test]
    fn test_route_two_nodes() {
        let manager = PlacementManager::new(nodes(&["n0:1", "n1:1"]));
        let routes = manager
            .route(&chunk_ids("a.txt", 2), NodeEndpoint::Upload)
            .unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(
            routes["a.txt_chunk_0"],
            "http://n0:1/uploadBlock?chunk=a.txt_chunk_0"
        );
        assert_eq!(
            routes["a.txt_chunk_1"],
            "http://n1:1/uploadBlock?chunk=a.txt_chunk_1"
        );
    }

    #[test]
    fn test_route_encodes_chunk_id() {
        let manager = PlacementManager::new(nodes(&["n0:1"]));
        let routes = manager
            .route(&["a b&c_chunk_0".to_string()], NodeEndpoint::Download)
            .unwrap();
        assert_eq!(
            routes["a b&c_chunk_0"],
            "http://n0:1/downloadBlock?chunk=a%20b%26c_chunk_0"
        );
    }

    #[test]
    fn test_route_without_nodes() {
        let manager = PlacementManager::new(Vec::new());
        assert!(matches!(
            manager.route(&chunk_ids("f", 1), NodeEndpoint::Upload),
            Err(Error::NoStorageNodesConfigured)
        ));
    }

    #[test]
    fn test_permuted_topology_moves_chunks() {
        // Same members, different order: chunks resolve to different nodes,
        // so data uploaded under one order is unreachable under the other.
        let abc = PlacementManager::new(nodes(&["a:1", "b:1", "c:1"]));
        let bac = PlacementManager::new(nodes(&["b:1", "a:1", "c:1"]));

        assert_ne!(
            abc.select_node(0).unwrap().addr,
            bac.select_node(0).unwrap().addr
        );
        assert_ne!(
            abc.select_node(1).unwrap().addr,
            bac.select_node(1).unwrap().addr
        );
        assert_eq!(
            abc.select_node(2).unwrap().addr,
            bac.select_node(2).unwrap().addr
        );
        assert_ne!(abc.fingerprint(), bac.fingerprint());
    }
}
