//! Route Cache - persists the enumerated route set as one JSON document
//!
//! The document is an envelope `{version, fingerprint, routes}`. 64-bit
//! error-node ids above the JSON safe-integer bound are written as tagged
//! strings by `ErrorNodeId`'s serde impls, so the round trip is exact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::enumerate::RouteDescriptor;
use crate::{Error, Result};

/// Envelope version written by this build
pub const CACHE_VERSION: u32 = 1;

/// Default cache file name
pub const DEFAULT_CACHE_FILE: &str = "routes.json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    routes: Vec<RouteDescriptor>,
}

/// Borrowing twin of `CacheEnvelope` so writes don't clone the routes
#[derive(Serialize)]
struct CacheEnvelopeRef<'a> {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<&'a str>,
    routes: &'a [RouteDescriptor],
}

#[derive(Debug, Clone)]
pub struct RouteCache {
    path: PathBuf,
}

impl RouteCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and validate the cache file.
    ///
    /// Every failure is reported as `CacheRead`; callers that only care
    /// about hit or miss should use [`RouteCache::load`].
    pub fn read(&self, expected_fingerprint: Option<&str>) -> Result<Vec<RouteDescriptor>> {
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| Error::CacheRead(format!("{}: {}", self.path.display(), e)))?;
        let envelope: CacheEnvelope = serde_json::from_str(&contents)
            .map_err(|e| Error::CacheRead(format!("{}: {}", self.path.display(), e)))?;

        if envelope.version != CACHE_VERSION {
            return Err(Error::CacheRead(format!(
                "unsupported cache version {} (expected {})",
                envelope.version, CACHE_VERSION
            )));
        }

        if let (Some(expected), Some(recorded)) = (expected_fingerprint, envelope.fingerprint.as_deref()) {
            if expected != recorded {
                return Err(Error::CacheRead(format!(
                    "store fingerprint changed ({} -> {})",
                    recorded, expected
                )));
            }
        }

        Ok(envelope.routes)
    }

    /// Load cached routes, or `None` on any kind of miss.
    pub fn load(&self, expected_fingerprint: Option<&str>) -> Option<Vec<RouteDescriptor>> {
        if !self.exists() {
            tracing::debug!("No route cache at {}", self.path.display());
            return None;
        }

        match self.read(expected_fingerprint) {
            Ok(routes) => {
                tracing::info!("Loaded {} routes from {}", routes.len(), self.path.display());
                Some(routes)
            }
            Err(e) => {
                tracing::warn!("Ignoring route cache: {}", e);
                None
            }
        }
    }

    /// Persist `routes`, replacing any previous cache.
    ///
    /// The document is written next to the target and renamed over it, so a
    /// failed write never leaves a truncated cache behind.
    pub fn store(&self, routes: &[RouteDescriptor], fingerprint: Option<&str>) -> Result<()> {
        let envelope = CacheEnvelopeRef {
            version: CACHE_VERSION,
            fingerprint,
            routes,
        };
        let json = serde_json::to_string(&envelope).map_err(|e| Error::CachePersist(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::CachePersist(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| Error::CachePersist(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::CachePersist(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::info!("Persisted {} routes to {}", routes.len(), self.path.display());
        Ok(())
    }
}

/// blake3 hash of a store file, used to tie a cache to the store it came from
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
