//! Export cache for incremental builds.
//!
//! Every artifact the pipeline writes (rendered pages, `book.json` dumps,
//! `<modid>.hexdoc.json` metadata) goes through an [`Exporter`]. Rebuilding a
//! multi-language book rewrites mostly identical files, and touching them
//! anyway defeats downstream tools that watch modification times (static
//! site deploys, `rsync`, CI artifact caches).
//!
//! ## Cache keys
//!
//! The cache is **content-addressed per output path**: the manifest maps each
//! export path (relative to the export directory) to the SHA-256 of the bytes
//! last written there. A write is skipped when:
//! 1. An entry for the path exists with the same content hash
//! 2. The file is still on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<cache_dir>/export-manifest.json`. The
//! cache directory comes from `cache_dir` in `hexbook.toml` and is safe to
//! delete; `--no-cache` loads an empty manifest so every file is rewritten.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the cache manifest file within the cache directory.
const MANIFEST_FILENAME: &str = "export-manifest.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single exported file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub content_hash: String,
}

/// On-disk manifest mapping export paths to the hash last written there.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(cache_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(cache_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the cache directory, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(cache_dir), json)
    }

    /// True when `export_path` was last written with `content_hash` and is
    /// still present under `export_dir`.
    pub fn is_fresh(&self, export_path: &str, content_hash: &str, export_dir: &Path) -> bool {
        self.entries
            .get(export_path)
            .is_some_and(|e| e.content_hash == content_hash)
            && export_dir.join(export_path).exists()
    }

    pub fn insert(&mut self, export_path: String, content_hash: String) {
        self.entries
            .insert(export_path, CacheEntry { content_hash });
    }
}

/// SHA-256 hash of some bytes, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub unchanged: u32,
    pub written: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.unchanged + self.written
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unchanged > 0 {
            write!(
                f,
                "{} unchanged, {} written ({} total)",
                self.unchanged,
                self.written,
                self.total()
            )
        } else {
            write!(f, "{} written", self.written)
        }
    }
}

/// Resolve the cache manifest path for a cache directory.
pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILENAME)
}

/// Writes artifacts under an export directory, skipping unchanged files.
///
/// Shared across per-language workers, so the manifest and stats sit
/// behind mutexes.
#[derive(Debug)]
pub struct Exporter {
    export_dir: PathBuf,
    cache_dir: PathBuf,
    manifest: Mutex<CacheManifest>,
    stats: Mutex<CacheStats>,
}

impl Exporter {
    pub fn new(export_dir: PathBuf, cache_dir: PathBuf, use_cache: bool) -> Self {
        let manifest = if use_cache {
            CacheManifest::load(&cache_dir)
        } else {
            CacheManifest::empty()
        };
        Self {
            export_dir,
            cache_dir,
            manifest: Mutex::new(manifest),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Write `content` to `export_dir/path`. Returns `false` if the file
    /// already held these bytes.
    pub fn export(&self, path: &Path, content: &[u8]) -> io::Result<bool> {
        let key = path.to_string_lossy().replace('\\', "/");
        let hash = hash_bytes(content);

        let mut manifest = lock(&self.manifest);
        if manifest.is_fresh(&key, &hash, &self.export_dir) {
            lock(&self.stats).unchanged += 1;
            log::debug!("unchanged: {key}");
            return Ok(false);
        }

        let dest = self.export_dir.join(path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, content)?;
        manifest.insert(key.clone(), hash);
        lock(&self.stats).written += 1;
        log::debug!("exported: {key}");
        Ok(true)
    }

    /// Persist the manifest and return the run's stats.
    pub fn finish(&self) -> io::Result<CacheStats> {
        lock(&self.manifest).save(&self.cache_dir)?;
        Ok(lock(&self.stats).clone())
    }
}

/// A poisoned lock only means another worker panicked mid-export; the
/// manifest is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
