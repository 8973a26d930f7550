use std::net::{IpAddr, Ipv4Addr};

use tracing::debug;

use crate::signals::{self, RequestSignals};
use crate::types::ResolutionResult;

/// CDN client-IP headers in fixed precedence order. The first valid IPv4
/// value short-circuits resolution; the first valid IPv6 value is kept as a
/// fallback candidate while scanning continues.
const CDN_CLIENT_IP_HEADERS: &[(&str, &str)] = &[
    (signals::CF_CONNECTING_IP, "cloudflare"),
    (signals::FASTLY_CLIENT_IP, "fastly"),
    (signals::TRUE_CLIENT_IP, "akamai/keycdn"),
    (signals::CLOUDFRONT_VIEWER_ADDRESS, "cloudfront"),
];

/// Pick the most plausible true client address from the captured signals.
///
/// Pure with respect to its inputs: depends only on header values and the
/// peer address, and never returns an invalid address.
pub fn resolve_client_ip(signals: &RequestSignals) -> ResolutionResult {
    let via_frontend = signals
        .peer_addr
        .map(|peer| !signals::is_public(&peer))
        .unwrap_or(false);

    let mut ipv4_candidate: Option<IpAddr> = None;
    let mut fallback: Option<IpAddr> = None;

    // CDN headers take absolute precedence
    for &(header, vendor) in CDN_CLIENT_IP_HEADERS {
        if let Some(ip) = signals.header_ip(header) {
            if ip.is_ipv4() {
                debug!("Resolved client IP {} from {} header", ip, vendor);
                return ResolutionResult {
                    client_ip: ip,
                    via_frontend,
                };
            }
            if fallback.is_none() {
                fallback = Some(ip);
            }
        }
    }

    // Forwarded chain, filtered to public addresses, IPv4 preferred
    let public_chain: Vec<IpAddr> = signals
        .forwarded_chain()
        .into_iter()
        .filter(signals::is_public)
        .collect();
    if let Some(&v4) = public_chain.iter().find(|ip| ip.is_ipv4()) {
        ipv4_candidate = Some(v4);
    } else if fallback.is_none() {
        fallback = public_chain.first().copied();
    }

    // Secondary single-value forwarded header may overwrite the v4 candidate
    if let Some(ip) = signals.header_ip(signals::X_REAL_IP) {
        if ip.is_ipv4() {
            ipv4_candidate = Some(ip);
        } else if fallback.is_none() {
            fallback = Some(ip);
        }
    }

    let client_ip = if via_frontend {
        // A front-end terminated the connection; the peer itself is only the
        // last resort
        ipv4_candidate.or(fallback).or(signals.peer_addr)
    } else {
        match signals.peer_addr {
            Some(peer) if signals::is_public(&peer) && peer.is_ipv4() => Some(peer),
            peer => ipv4_candidate.or(fallback).or(peer),
        }
    };

    ResolutionResult {
        client_ip: client_ip.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        via_frontend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn cdn_ipv4_header_short_circuits() {
        let signals = RequestSignals::from_pairs(
            [
                ("CF-Connecting-IP", "203.0.113.9"),
                ("X-Forwarded-For", "198.51.100.2"),
                ("X-Real-IP", "198.51.100.7"),
            ],
            Some(ip("10.0.0.1")),
        );

        let result = resolve_client_ip(&signals);
        assert_eq!(result.client_ip, ip("203.0.113.9"));
        assert!(result.via_frontend);
    }

    #[test]
    fn cdn_header_precedence_is_fixed() {
        let signals = RequestSignals::from_pairs(
            [
                ("True-Client-IP", "198.51.100.7"),
                ("Fastly-Client-IP", "203.0.113.9"),
            ],
            Some(ip("10.0.0.1")),
        );

        let result = resolve_client_ip(&signals);
        assert_eq!(result.client_ip, ip("203.0.113.9"));
    }

    #[test]
    fn cdn_ipv6_value_survives_as_fallback() {
        let signals = RequestSignals::from_pairs(
            [("CF-Connecting-IP", "2001:db8::7")],
            Some(ip("10.0.0.1")),
        );

        let result = resolve_client_ip(&signals);
        assert_eq!(result.client_ip, ip("2001:db8::7"));
        assert!(result.via_frontend);
    }

    #[test]
    fn chain_prefers_first_public_ipv4() {
        let signals = RequestSignals::from_pairs(
            [("X-Forwarded-For", "10.0.0.5, 203.0.113.9, 198.51.100.2")],
            Some(ip("192.168.0.10")),
        );

        let result = resolve_client_ip(&signals);
        assert_eq!(result.client_ip, ip("203.0.113.9"));
        assert!(result.via_frontend);
    }

    #[test]
    fn chain_ipv6_used_when_no_ipv4_present() {
        let signals = RequestSignals::from_pairs(
            [("X-Forwarded-For", "fd00::5, 2001:db8::9")],
            Some(ip("10.0.0.1")),
        );

        let result = resolve_client_ip(&signals);
        assert_eq!(result.client_ip, ip("2001:db8::9"));
    }

    #[test]
    fn real_ip_header_overwrites_v4_candidate() {
        let signals = RequestSignals::from_pairs(
            [
                ("X-Forwarded-For", "2001:db8::9"),
                ("X-Real-IP", "198.51.100.7"),
            ],
            Some(ip("10.0.0.1")),
        );

        let result = resolve_client_ip(&signals);
        assert_eq!(result.client_ip, ip("198.51.100.7"));
    }

    #[test]
    fn private_peer_with_no_headers_falls_back_to_peer() {
        let signals = RequestSignals::from_pairs::<[(&str, &str); 0], _, _>([], Some(ip("10.0.0.1")));

        let result = resolve_client_ip(&signals);
        assert!(result.via_frontend);
        assert_eq!(result.client_ip, ip("10.0.0.1"));
    }

    #[test]
    fn public_ipv4_peer_is_a_direct_connection() {
        let signals =
            RequestSignals::from_pairs::<[(&str, &str); 0], _, _>([], Some(ip("203.0.113.50")));

        let result = resolve_client_ip(&signals);
        assert!(!result.via_frontend);
        assert_eq!(result.client_ip, ip("203.0.113.50"));
    }

    #[test]
    fn public_ipv6_peer_yields_to_ipv4_candidate() {
        let signals = RequestSignals::from_pairs(
            [("X-Forwarded-For", "198.51.100.2")],
            Some(ip("2001:db8::50")),
        );

        let result = resolve_client_ip(&signals);
        assert!(!result.via_frontend);
        assert_eq!(result.client_ip, ip("198.51.100.2"));
    }

    #[test]
    fn no_signals_at_all_defaults_to_loopback() {
        let signals = RequestSignals::from_pairs::<[(&str, &str); 0], _, _>([], None);

        let result = resolve_client_ip(&signals);
        assert!(!result.via_frontend);
        assert_eq!(result.client_ip, ip("127.0.0.1"));
    }
}
