//! Hashing utilities for chunkfs
//!
//! BLAKE3 is used to fingerprint the storage topology.

/// Compute BLAKE3 hash of data, return hex string
pub fn blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
