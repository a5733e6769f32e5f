//! Content-addressed WAV result cache
//!
//! Each entry is a complete WAV file named by the hex sha256 digest of
//! `(text, full voice id, serialized option set)`. The cache is strictly
//! best-effort: a corrupt or missing entry, an unreadable directory, or a
//! failed write never blocks synthesis. Concurrent writers to the same key
//! overwrite each other with identical content, which is harmless.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::error::{Result, TtsError};

/// On-disk WAV cache
pub struct WavCache {
    dir: PathBuf,
}

impl WavCache {
    /// Open (creating if needed) a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            TtsError::config(
                format!("cannot create cache directory: {e}"),
                Some(dir.clone()),
            )
        })?;

        debug!("caching WAV files in {}", dir.display());
        Ok(Self { dir })
    }

    /// Deterministic cache key over text, voice, and option values
    pub fn key(text: &str, voice: &str, settings: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{text}-{voice}-{settings}").as_bytes());
        hex_digest(&hasher.finalize())
    }

    /// Load a cached WAV; any failure reads as a miss
    pub fn load(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        if !path.is_file() {
            return None;
        }

        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => {
                debug!("cache hit: {}", path.display());
                Some(bytes)
            }
            Ok(_) => {
                warn!("empty cache entry ignored: {}", path.display());
                None
            }
            Err(e) => {
                warn!("cache load failed for {}: {e}", path.display());
                None
            }
        }
    }

    /// Store a WAV under `key`; failures are logged and swallowed
    pub fn store(&self, key: &str, wav: &[u8]) {
        if wav.is_empty() {
            return;
        }

        let path = self.entry_path(key);
        if let Err(e) = std::fs::write(&path, wav) {
            warn!("cache write failed for {}: {e}", path.display());
        } else {
            debug!("cached {} byte(s) at {}", wav.len(), path.display());
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.wav"))
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = WavCache::key("hello", "espeak:en", "ssml=false");
        let b = WavCache::key("hello", "espeak:en", "ssml=false");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_key_varies_with_settings() {
        let a = WavCache::key("hello", "espeak:en", "noise_scale=Some(0.5)");
        let b = WavCache::key("hello", "espeak:en", "noise_scale=Some(0.7)");
        assert_ne!(a, b);
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WavCache::new(dir.path()).unwrap();

        let key = WavCache::key("text", "engine:voice", "");
        assert!(cache.load(&key).is_none());

        cache.store(&key, b"RIFFdata");
        assert_eq!(cache.load(&key).unwrap(), b"RIFFdata");
    }

    #[test]
    fn test_store_to_removed_dir_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WavCache::new(dir.path().join("sub")).unwrap();
        std::fs::remove_dir_all(cache.dir()).unwrap();

        let key = WavCache::key("text", "engine:voice", "");
        cache.store(&key, b"RIFFdata");
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn test_empty_entry_reads_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WavCache::new(dir.path()).unwrap();

        let key = WavCache::key("text", "engine:voice", "");
        std::fs::write(dir.path().join(format!("{key}.wav")), b"").unwrap();
        assert!(cache.load(&key).is_none());
    }
}
