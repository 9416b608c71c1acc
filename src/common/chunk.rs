//! Chunk codec
//!
//! Splits a file's bytes into fixed-size chunks and puts them back together
//! from chunks that may arrive in any order. Chunk identifiers carry the
//! sequence index (`<file>_chunk_<index>`), which is what makes out-of-order
//! reassembly possible.

use crate::common::{Error, Result};
use bytes::{Bytes, BytesMut};

/// Separator between file name and sequence index in a chunk identifier
const CHUNK_ID_MARKER: &str = "_chunk_";

/// A chunk's bytes together with its position in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedChunk {
    pub index: usize,
    pub data: Bytes,
}

impl IndexedChunk {
    pub fn new(index: usize, data: impl Into<Bytes>) -> Self {
        Self {
            index,
            data: data.into(),
        }
    }
}

/// Partition `data` into consecutive chunks of at most `chunk_size` bytes.
///
/// The last chunk may be shorter. Empty input yields no chunks, and an exact
/// multiple of `chunk_size` yields no trailing empty chunk. Chunks share the
/// input buffer.
pub fn split(data: &Bytes, chunk_size: usize) -> Result<Vec<Bytes>> {
    if chunk_size == 0 {
        return Err(Error::InvalidArgument("chunk size must be > 0".into()));
    }

    let mut chunks = Vec::with_capacity(data.len().div_ceil(chunk_size));
    let mut start = 0;
    while start < data.len() {
        let end = usize::min(start + chunk_size, data.len());
        chunks.push(data.slice(start..end));
        start = end;
    }
    Ok(chunks)
}

/// Concatenate chunks by ascending index.
///
/// Every index in `0..expected` must be present exactly once.
pub fn assemble(mut chunks: Vec<IndexedChunk>, expected: usize) -> Result<Bytes> {
    chunks.sort_by_key(|c| c.index);

    for pair in chunks.windows(2) {
        if pair[0].index == pair[1].index {
            return Err(Error::DuplicateIndex(pair[0].index));
        }
    }

    if let Some(last) = chunks.last() {
        if last.index >= expected {
            return Err(Error::InvalidArgument(format!(
                "chunk index {} outside expected range 0..{}",
                last.index, expected
            )));
        }
    }

    if chunks.len() < expected {
        let mut present = chunks.iter().map(|c| c.index).peekable();
        let mut missing = Vec::new();
        for i in 0..expected {
            if present.peek() == Some(&i) {
                present.next();
            } else {
                missing.push(i);
            }
        }
        return Err(Error::IncompleteData { missing });
    }

    let total = chunks.iter().map(|c| c.data.len()).sum();
    let mut out = BytesMut::with_capacity(total);
    for chunk in &chunks {
        out.extend_from_slice(&chunk.data);
    }
    Ok(out.freeze())
}

/// Build the identifier of chunk `index` of `file_name`
pub fn chunk_id(file_name: &str, index: usize) -> String {
    format!("{}{}{}", file_name, CHUNK_ID_MARKER, index)
}

/// Recover the sequence index from a chunk identifier
pub fn parse_chunk_index(chunk_id: &str) -> Result<usize> {
    let invalid =
        || Error::InvalidArgument(format!("no chunk index found in chunk id: {}", chunk_id));

    let (prefix, digits) = chunk_id.rsplit_once('_').ok_or_else(invalid)?;
    if !prefix.ends_with(CHUNK_ID_MARKER.trim_end_matches('_')) {
        return Err(invalid());
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}
