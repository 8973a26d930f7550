use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, VerdictError};
use crate::types::GeoCacheEntry;

/// How long a cache entry counts as primary truth
pub fn freshness_window() -> Duration {
    Duration::hours(24)
}

/// Content-addressed on-disk cache: one JSON file per IP, filename derived
/// from a blake3 hash of the IP string. Entries are overwritten whole on
/// refresh, never merged.
#[derive(Debug, Clone)]
pub struct GeoCache {
    dir: PathBuf,
}

impl GeoCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn entry_path(&self, ip: IpAddr) -> PathBuf {
        let hash = blake3::hash(ip.to_string().as_bytes());
        self.dir.join(format!("{}.json", hex::encode(hash.as_bytes())))
    }

    /// Entry for `ip` regardless of age; None on missing or corrupt files
    pub async fn load(&self, ip: IpAddr) -> Option<GeoCacheEntry> {
        let path = self.entry_path(ip);
        let content = fs::read_to_string(&path).await.ok()?;

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Discarding corrupt cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    /// Entry for `ip` only when still inside the freshness window
    pub async fn load_fresh(&self, ip: IpAddr) -> Option<GeoCacheEntry> {
        let entry = self.load(ip).await?;
        let age = Utc::now().signed_duration_since(entry.timestamp);

        if age < freshness_window() {
            Some(entry)
        } else {
            debug!("Cache entry for {} is stale ({}h old)", ip, age.num_hours());
            None
        }
    }

    /// Persist a freshly looked-up location for `ip`
    pub async fn store(&self, ip: IpAddr, location: &str) -> Result<()> {
        self.store_entry(
            ip,
            &GeoCacheEntry {
                location: location.to_string(),
                timestamp: Utc::now(),
            },
        )
        .await
    }

    /// Write an entry via a temp file and atomic rename, so a concurrent
    /// reader never observes a partially written file. The temp name is
    /// unique per write; racing writers for one IP each commit a complete
    /// file and the last rename wins.
    pub async fn store_entry(&self, ip: IpAddr, entry: &GeoCacheEntry) -> Result<()> {
        static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| VerdictError::Cache(format!("Failed to create cache dir: {}", e)))?;

        let path = self.entry_path(ip);
        let tmp_path = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            WRITE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let content = serde_json::to_string(entry)?;

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| VerdictError::Cache(format!("Failed to write cache entry: {}", e)))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| VerdictError::Cache(format!("Failed to commit cache entry: {}", e)))?;

        Ok(())
    }
}
