//! Chunk repository
//!
//! Layout: one file per chunk directly under the node's root, named by the
//! percent-encoded chunk key. Encoding removes every path separator, so a key
//! can never resolve outside the root. Keys whose encoding exceeds the
//! file-name limit are stored as `~<blake3 hex>`; encoded names never contain
//! a raw `~`, so the two forms cannot collide. Writes land in a temporary
//! file that is renamed into place, so readers see either the old or the new
//! bytes.

use crate::common::{blake3_hash, encode_key, validate_key, Error, Result};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Prefix of in-flight writes; never a valid encoded key
const TMP_PREFIX: &str = ".tmp-";

/// Prefix of hashed file names
const HASHED_PREFIX: char = '~';

/// Longest file name common filesystems accept
const MAX_FILE_NAME: usize = 255;

/// On-disk file name for `key`
fn file_name(key: &str) -> String {
    let encoded = encode_key(key);
    if encoded.len() <= MAX_FILE_NAME {
        encoded
    } else {
        format!("{}{}", HASHED_PREFIX, blake3_hash(key.as_bytes()))
    }
}

/// Chunk store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub total_bytes: u64,
}

pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    /// Open or create the store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        tracing::info!("ChunkStore opened at {}", root.display());
        Ok(Self { root })
    }

    fn chunk_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        if key.starts_with(TMP_PREFIX) {
            return Err(Error::InvalidArgument(format!("key {} is reserved", key)));
        }
        Ok(self.root.join(file_name(key)))
    }

    /// Write or overwrite `key`
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.chunk_path(key)?;
        let tmp = self
            .root
            .join(format!("{}{}", TMP_PREFIX, uuid::Uuid::new_v4()));

        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!("Stored chunk {} ({} bytes)", key, data.len());
        Ok(())
    }

    /// Read `key`
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.chunk_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Does `key` exist?
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let path = self.chunk_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Remove `key`
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.chunk_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted chunk {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Count stored chunks and their bytes
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                stats.total_chunks += 1;
                stats.total_bytes += meta.len();
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path()).await.unwrap();

        store.put("a.txt_chunk_0", b"hello").await.unwrap();
        assert_eq!(&store.get("a.txt_chunk_0").await.unwrap()[..], b"hello");
        assert!(store.contains("a.txt_chunk_0").await.unwrap());

        store.delete("a.txt_chunk_0").await.unwrap();
        assert!(!store.contains("a.txt_chunk_0").await.unwrap());
        assert!(matches!(
            store.get("a.txt_chunk_0").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete("a.txt_chunk_0").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path()).await.unwrap();

        store.put("k", b"first version").await.unwrap();
        store.put("k", b"second").await.unwrap();
        assert_eq!(&store.get("k").await.unwrap()[..], b"second");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.total_bytes, 6);
    }

    #[tokio::test]
    async fn test_keys_stay_inside_root() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("node");
        let store = ChunkStore::open(&root).await.unwrap();

        store.put("../escape", b"x").await.unwrap();
        store.put("nested/dir/key", b"y").await.unwrap();

        assert!(!outer.path().join("escape").exists());
        assert!(root.join("..%2Fescape").exists());
        assert!(root.join("nested%2Fdir%2Fkey").exists());
        assert_eq!(&store.get("../escape").await.unwrap()[..], b"x");

        assert!(matches!(
            store.put("..", b"z").await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            store.put("", b"z").await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_non_ascii_key() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path()).await.unwrap();
        let key = format!("{}.txt_chunk_0", "文".repeat(30));

        store.put(&key, b"hello").await.unwrap();
        assert_eq!(&store.get(&key).await.unwrap()[..], b"hello");
        assert!(store.contains(&key).await.unwrap());
        store.delete(&key).await.unwrap();
        assert!(!store.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_long_keys_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path()).await.unwrap();
        let long_a = format!("{}_chunk_0", "a".repeat(1000));
        let long_b = format!("{}_chunk_1", "a".repeat(1000));

        store.put(&long_a, b"first").await.unwrap();
        store.put(&long_b, b"second").await.unwrap();
        assert_eq!(&store.get(&long_a).await.unwrap()[..], b"first");
        assert_eq!(&store.get(&long_b).await.unwrap()[..], b"second");

        // A short key spelling out a hashed name still maps elsewhere.
        let hashed = file_name(&long_a);
        assert!(hashed.starts_with(HASHED_PREFIX));
        store.put(&hashed, b"decoy").await.unwrap();
        assert_eq!(&store.get(&long_a).await.unwrap()[..], b"first");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 3);
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            assert!(entry.unwrap().file_name().len() <= MAX_FILE_NAME);
        }
    }

    #[tokio::test]
    async fn test_empty_chunk() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path()).await.unwrap();
        store.put("empty", b"").await.unwrap();
        assert!(store.get("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_same_key() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(ChunkStore::open(dir.path()).await.unwrap());
        let a = vec![b'a'; 64 * 1024];
        let b = vec![b'b'; 64 * 1024];

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let data = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                store.put("shared", &data).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let got = store.get("shared").await.unwrap();
        assert!(got[..] == a[..] || got[..] == b[..]);
        assert_eq!(store.stats().await.unwrap().total_chunks, 1);
    }
}
