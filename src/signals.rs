use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::http::HeaderMap;
use tracing::debug;

// CDN-specific client IP headers
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const FASTLY_CLIENT_IP: &str = "fastly-client-ip";
pub const TRUE_CLIENT_IP: &str = "true-client-ip";
pub const CLOUDFRONT_VIEWER_ADDRESS: &str = "cloudfront-viewer-address";

// CDN presence markers that never carry a client IP
pub const CF_RAY: &str = "cf-ray";
pub const CF_IPCOUNTRY: &str = "cf-ipcountry";

// Generic forwarding headers
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const FORWARDED: &str = "forwarded";
pub const FORWARDED_FOR: &str = "forwarded-for";
pub const VIA: &str = "via";
pub const X_FORWARDED: &str = "x-forwarded";
pub const X_CLUSTER_CLIENT_IP: &str = "x-cluster-client-ip";
pub const X_PROXY_ID: &str = "x-proxy-id";
pub const PROXY_CONNECTION: &str = "proxy-connection";

// Tor marker header
pub const X_TOR: &str = "x-tor";

/// Every header the engine ever reads; nothing else is captured.
const CAPTURED_HEADERS: &[&str] = &[
    CF_CONNECTING_IP,
    CF_RAY,
    CF_IPCOUNTRY,
    FASTLY_CLIENT_IP,
    TRUE_CLIENT_IP,
    CLOUDFRONT_VIEWER_ADDRESS,
    X_FORWARDED_FOR,
    X_REAL_IP,
    FORWARDED,
    FORWARDED_FOR,
    VIA,
    X_FORWARDED,
    X_CLUSTER_CLIENT_IP,
    X_PROXY_ID,
    PROXY_CONNECTION,
    X_TOR,
];

/// Immutable snapshot of the request signals the engine consumes.
///
/// Captured once at the entry boundary; no component reads ambient request
/// state directly.
#[derive(Debug, Clone)]
pub struct RequestSignals {
    values: BTreeMap<&'static str, String>,

    /// Transport-layer peer address, when known
    pub peer_addr: Option<IpAddr>,
}

impl RequestSignals {
    /// Capture the relevant headers and the socket peer address
    pub fn from_parts(headers: &HeaderMap, peer: SocketAddr) -> Self {
        let mut values = BTreeMap::new();

        for &name in CAPTURED_HEADERS {
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                values.insert(name, value.trim().to_string());
            }
        }

        Self {
            values,
            peer_addr: Some(peer.ip()),
        }
    }

    /// Build signals from raw (name, value) pairs, for CLI and test use
    pub fn from_pairs<I, K, V>(pairs: I, peer: Option<IpAddr>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = BTreeMap::new();

        for (name, value) in pairs {
            let lowered = name.as_ref().to_ascii_lowercase();
            if let Some(&canonical) = CAPTURED_HEADERS.iter().find(|&&h| h == lowered) {
                values.insert(canonical, value.into().trim().to_string());
            }
        }

        Self {
            values,
            peer_addr: peer,
        }
    }

    /// Raw header value, if captured
    pub fn header(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether the header was present at all
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Header value parsed as a single IP literal
    pub fn header_ip(&self, name: &str) -> Option<IpAddr> {
        self.header(name).and_then(parse_ip)
    }

    /// Whether the Tor marker header is present
    pub fn tor_marker(&self) -> bool {
        self.has(X_TOR)
    }

    /// Valid addresses from the forwarded-chain header, in hop order.
    /// Unparsable entries are silently dropped.
    pub fn forwarded_chain(&self) -> Vec<IpAddr> {
        let Some(raw) = self.header(X_FORWARDED_FOR) else {
            return Vec::new();
        };

        raw.split(',').filter_map(parse_ip).collect()
    }
}

/// Parse one header value as an IP literal, tolerating the port and bracket
/// decorations seen in the wild (`1.2.3.4:5678`, `[::1]:443`, quoted values).
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.starts_with('[') {
        // IPv6 with possible port
        match trimmed.find(']') {
            Some(end_bracket) => &trimmed[1..end_bracket],
            None => trimmed,
        }
    } else if let Some(colon_pos) = trimmed.rfind(':') {
        // Possible IPv4 with port; bare IPv6 keeps its colons
        if trimmed[..colon_pos].contains('.') && !trimmed[..colon_pos].contains(':') {
            &trimmed[..colon_pos]
        } else {
            trimmed
        }
    } else {
        trimmed
    };

    match IpAddr::from_str(candidate) {
        Ok(ip) => Some(ip),
        Err(_) => {
            debug!("Discarding unparsable IP literal: {}", raw);
            None
        }
    }
}

/// Whether an address is publicly routable for resolution purposes.
/// Documentation ranges count as public; only private, loopback, link-local
/// and unspecified addresses are excluded.
pub fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified())
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            let unique_local = (segments[0] & 0xfe00) == 0xfc00;
            let link_local = (segments[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn parses_plain_and_decorated_literals() {
        assert_eq!(
            parse_ip("203.0.113.9"),
            Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)))
        );
        assert_eq!(
            parse_ip(" 203.0.113.9:8443 "),
            Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)))
        );
        assert_eq!(
            parse_ip("[2001:db8::1]:443"),
            Some(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)))
        );
        assert_eq!(
            parse_ip("2001:db8::1"),
            Some(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)))
        );
        assert_eq!(parse_ip("\"198.51.100.2\""), Some("198.51.100.2".parse().unwrap()));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_ip(""), None);
        assert_eq!(parse_ip("unknown"), None);
        assert_eq!(parse_ip("999.1.1.1"), None);
        assert_eq!(parse_ip("203.0.113"), None);
    }

    #[test]
    fn publicness_classification() {
        assert!(is_public(&"203.0.113.9".parse().unwrap()));
        assert!(is_public(&"2001:db8::1".parse().unwrap()));
        assert!(!is_public(&"10.0.0.5".parse().unwrap()));
        assert!(!is_public(&"192.168.1.1".parse().unwrap()));
        assert!(!is_public(&"127.0.0.1".parse().unwrap()));
        assert!(!is_public(&"169.254.0.1".parse().unwrap()));
        assert!(!is_public(&"::1".parse().unwrap()));
        assert!(!is_public(&"fe80::1".parse().unwrap()));
        assert!(!is_public(&"fd00::1".parse().unwrap()));
    }

    #[test]
    fn captures_only_relevant_headers() {
        let signals = RequestSignals::from_pairs(
            [
                ("CF-Connecting-IP", "203.0.113.9"),
                ("X-Forwarded-For", "10.0.0.5, 203.0.113.9"),
                ("Cookie", "secret=1"),
            ],
            None,
        );

        assert_eq!(signals.header(CF_CONNECTING_IP), Some("203.0.113.9"));
        assert!(signals.has(X_FORWARDED_FOR));
        assert!(!signals.has("cookie"));
        assert!(signals.peer_addr.is_none());
    }

    #[test]
    fn forwarded_chain_drops_invalid_entries() {
        let signals = RequestSignals::from_pairs(
            [(X_FORWARDED_FOR, "10.0.0.5, garbage, 198.51.100.2")],
            None,
        );

        let chain = signals.forwarded_chain();
        assert_eq!(
            chain,
            vec![
                "10.0.0.5".parse::<IpAddr>().unwrap(),
                "198.51.100.2".parse::<IpAddr>().unwrap()
            ]
        );
    }
}
