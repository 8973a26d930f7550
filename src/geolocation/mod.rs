use std::net::IpAddr;
use std::path::Path;

use tracing::{debug, warn};

use crate::classifier::intel::{HttpIpIntel, IpIntel};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::types::IpIntelRecord;

pub mod cache;

use cache::GeoCache;

/// Fixed description for loopback/unspecified input; no I/O is done for it
pub const LOCAL_LOCATION: &str = "Local network (loopback)";

/// Sentinel returned when the lookup fails and no cache entry exists
pub const LOOKUP_FAILED: &str = "Location lookup failed";

/// Marker appended to stale cache values served as fallback data
pub const CACHED_MARKER: &str = " [cached]";

/// Rate-limit-friendly geolocation with a 24-hour on-disk cache and
/// stale-cache fallback. `locate` always returns a string, never errors.
pub struct GeoLocator<I: IpIntel> {
    cache: GeoCache,
    intel: I,
}

impl GeoLocator<HttpIpIntel> {
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            cache: GeoCache::new(&config.cache_dir),
            intel: HttpIpIntel::new(&config.intel)?,
        })
    }
}

impl<I: IpIntel> GeoLocator<I> {
    pub fn with_intel<P: AsRef<Path>>(cache_dir: P, intel: I) -> Self {
        Self {
            cache: GeoCache::new(cache_dir),
            intel,
        }
    }

    /// Human-readable location description for `ip`
    pub async fn locate(&self, ip: IpAddr) -> String {
        if ip.is_loopback() || ip.is_unspecified() {
            return LOCAL_LOCATION.to_string();
        }

        if let Some(entry) = self.cache.load_fresh(ip).await {
            debug!("Geolocation cache hit for {}", ip);
            return entry.location;
        }

        match self.intel.lookup(ip).await {
            Ok(record) => {
                let location = format_location(&record);
                // Best-effort write; a failed persist still returns the
                // fresh value
                if let Err(e) = self.cache.store(ip, &location).await {
                    warn!("Failed to cache location for {}: {}", ip, e);
                }
                location
            }
            Err(e) => {
                debug!("Geolocation lookup failed for {}: {}", ip, e);
                match self.cache.load(ip).await {
                    Some(stale) => format!("{}{}", stale.location, CACHED_MARKER),
                    None => LOOKUP_FAILED.to_string(),
                }
            }
        }
    }
}

/// Format a description from the service's country/region/city/zip/ISP fields
fn format_location(record: &IpIntelRecord) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for field in [&record.city, &record.region_name, &record.country] {
        if let Some(value) = field.as_deref() {
            if !value.is_empty() {
                parts.push(value);
            }
        }
    }

    let mut description = parts.join(", ");
    if let Some(zip) = record.zip.as_deref() {
        if !zip.is_empty() {
            description = format!("{} {}", description, zip).trim().to_string();
        }
    }
    if let Some(isp) = record.isp.as_deref() {
        if !isp.is_empty() {
            if description.is_empty() {
                description = format!("({})", isp);
            } else {
                description = format!("{} ({})", description, isp);
            }
        }
    }

    if description.is_empty() {
        "Unknown location".to_string()
    } else {
        description
    }
}
