use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Outcome of the IP resolution chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Most plausible true origin address of the client
    pub client_ip: IpAddr,

    /// True when the socket peer is a private/reserved address, implying a
    /// reverse proxy or CDN terminated the connection
    pub via_frontend: bool,
}

/// Confidence-scored anonymization judgment for a single request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the address appears to be a VPN endpoint
    pub is_vpn: bool,

    /// Whether the address appears to be a proxy of some kind
    pub is_proxy: bool,

    /// Whether a Tor marker was observed
    pub is_tor: bool,

    /// VPN label when a commercial brand or keyword matched
    pub vpn_type: Option<String>,

    /// Reported proxy label; Tor > VPN > generic proxy precedence
    pub proxy_type: Option<String>,

    /// Heuristic score, unclamped upward. Not a probability.
    pub confidence: i32,

    /// All valid addresses found in the forwarded-chain header, hop order
    pub source_ip_chain: Vec<IpAddr>,

    /// First public address in the chain, or the resolved IP itself
    pub possible_source_ip: IpAddr,

    /// Audit trail of every signal that fired, in order
    pub detection_methods: Vec<String>,

    /// External intelligence payload, when the lookup succeeded
    pub ip_info: Option<IpIntelRecord>,
}

impl DetectionResult {
    /// All-false, zero-confidence result for loopback/unspecified input
    pub fn direct(ip: IpAddr) -> Self {
        Self {
            is_vpn: false,
            is_proxy: false,
            is_tor: false,
            vpn_type: None,
            proxy_type: None,
            confidence: 0,
            source_ip_chain: Vec::new(),
            possible_source_ip: ip,
            detection_methods: vec!["local_address".to_string()],
            ip_info: None,
        }
    }

    /// True when any anonymization category fired
    pub fn is_anonymized(&self) -> bool {
        self.is_vpn || self.is_proxy || self.is_tor
    }
}

/// Payload returned by the external IP-intelligence service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpIntelRecord {
    /// Service-reported lookup status ("success" on a usable record)
    #[serde(default)]
    pub status: String,

    /// Failure detail when status is not "success"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub region_name: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub zip: Option<String>,

    #[serde(default)]
    pub isp: Option<String>,

    #[serde(default)]
    pub org: Option<String>,

    /// The address the service actually resolved
    #[serde(default)]
    pub query: Option<String>,

    /// Service-side known-proxy flag
    #[serde(default)]
    pub proxy: Option<bool>,

    /// Service-side datacenter/hosting flag
    #[serde(default)]
    pub hosting: Option<bool>,
}

/// One cached geolocation description, one file per IP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoCacheEntry {
    /// Human-readable location description
    pub location: String,

    /// Write time; entries older than the freshness window are fallback-only
    pub timestamp: DateTime<Utc>,
}

/// API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Success status
    pub success: bool,

    /// Response data
    pub data: Option<T>,

    /// Error message if success is false
    pub error: Option<String>,

    /// Response timestamp
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an error response
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intel_record_parses_wire_names() {
        let raw = r#"{
            "status": "success",
            "country": "Netherlands",
            "regionName": "North Holland",
            "city": "Amsterdam",
            "zip": "1012",
            "isp": "Example ISP",
            "org": "Example Org",
            "query": "203.0.113.9",
            "proxy": true,
            "hosting": false
        }"#;

        let record: IpIntelRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, "success");
        assert_eq!(record.region_name.as_deref(), Some("North Holland"));
        assert_eq!(record.proxy, Some(true));
        assert_eq!(record.hosting, Some(false));
    }

    #[test]
    fn intel_record_tolerates_missing_fields() {
        let record: IpIntelRecord = serde_json::from_str(r#"{"status":"fail"}"#).unwrap();
        assert_eq!(record.status, "fail");
        assert!(record.country.is_none());
        assert!(record.proxy.is_none());
    }
}
