//! Key-addressed byte-blob caches used to avoid refetching remote assets.
//!
//! Keys are request URLs. Values are raw response bodies. Nothing here
//! expires or invalidates entries; eviction, if any, is the store's business.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A URL-keyed blob store shared between renders.
///
/// Implementations must tolerate concurrent `lookup`/`put` pairs and
/// duplicate `put`s for the same key (last write wins).
pub trait AssetCache: Send + Sync {
    /// Return the blob stored under `url`, or `None` on a miss.
    fn lookup(&self, url: &str) -> Option<Vec<u8>>;

    /// Store `data` under `url`, overwriting any previous entry.
    fn put(&self, url: &str, data: Vec<u8>) -> Result<()>;
}

/// In-process cache backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(url))
            .unwrap_or(false)
    }

    /// Keys currently stored, sorted for stable assertions.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl AssetCache for MemoryCache {
    fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(url).cloned()
    }

    fn put(&self, url: &str, data: Vec<u8>) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::CacheError(format!("memory cache poisoned: {}", e)))?;
        entries.insert(url.to_string(), data);
        Ok(())
    }
}

/// Persistent cache storing one file per URL under a directory.
///
/// File names are the hex SHA-256 of the key so arbitrary URLs map to safe
/// paths. Writes go to a temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            Error::CacheError(format!("cannot create cache dir {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.root.join(hex::encode(digest))
    }
}

impl AssetCache for DiskCache {
    fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        std::fs::read(self.entry_path(url)).ok()
    }

    fn put(&self, url: &str, data: Vec<u8>) -> Result<()> {
        let path = self.entry_path(url);
        // unique per thread so racing duplicate puts never share a temp file
        let tmp = path.with_extension(format!(
            "tmp-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::write(&tmp, &data)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&tmp);
                Error::CacheError(format!("cannot write cache entry for {}: {}", url, e))
            })
    }
}
