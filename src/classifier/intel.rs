use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::IntelConfig;
use crate::error::{Result, VerdictError};
use crate::types::IpIntelRecord;

/// Fields requested from the intelligence endpoint
const INTEL_FIELDS: &str = "status,message,country,regionName,city,zip,isp,org,query,proxy,hosting";

/// Failure modes of the external lookup. Consumed with an explicit
/// "on error, proceed with None" policy at the call site.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("service reported failure: {0}")]
    Service(String),
}

pub type LookupResult = std::result::Result<IpIntelRecord, LookupError>;

/// Seam for the external IP-intelligence service
#[async_trait]
pub trait IpIntel: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> LookupResult;
}

/// Production client querying an ip-api style JSON endpoint with bounded
/// connect and request timeouts
pub struct HttpIpIntel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIpIntel {
    pub fn new(config: &IntelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| VerdictError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IpIntel for HttpIpIntel {
    async fn lookup(&self, ip: IpAddr) -> LookupResult {
        let url = format!("{}/{}?fields={}", self.endpoint, ip, INTEL_FIELDS);
        debug!("Querying IP intelligence for {}", ip);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }

        let record: IpIntelRecord = response.json().await?;
        if record.status != "success" {
            return Err(LookupError::Service(
                record
                    .message
                    .unwrap_or_else(|| format!("status {}", record.status)),
            ));
        }

        Ok(record)
    }
}
