use std::net::IpAddr;

use tracing::{debug, info};

use crate::signals::{self, RequestSignals};
use crate::types::{DetectionResult, IpIntelRecord};

pub mod intel;
mod keywords;

pub use intel::{HttpIpIntel, IpIntel, LookupError};

/// Generic proxy-indicating headers. Under CDN these are expected artifacts
/// and are logged without counting as evidence.
const PROXY_HEADERS: &[&str] = &[
    signals::VIA,
    signals::X_PROXY_ID,
    signals::X_CLUSTER_CLIENT_IP,
    signals::X_FORWARDED,
    signals::FORWARDED_FOR,
    signals::FORWARDED,
    signals::PROXY_CONNECTION,
];

/// CDN presence markers with the vendor each identifies
const CDN_MARKERS: &[(&str, &str)] = &[
    (signals::CF_CONNECTING_IP, "cloudflare"),
    (signals::CF_RAY, "cloudflare"),
    (signals::CF_IPCOUNTRY, "cloudflare"),
    (signals::FASTLY_CLIENT_IP, "fastly"),
    (signals::TRUE_CLIENT_IP, "akamai/keycdn"),
    (signals::CLOUDFRONT_VIEWER_ADDRESS, "cloudfront"),
];

/// Header evidence above this makes the external lookup unnecessary
const SKIP_LOOKUP_THRESHOLD: i32 = 50;

/// Suppression floor: CDN presence plus proxy evidence below this is a misfire
const SUPPRESSION_THRESHOLD: i32 = 50;

/// One audit-trail entry with its signed score contribution. Confidence is
/// the sum of weights, computed once at finalize so trail and arithmetic
/// cannot drift apart.
#[derive(Debug, Clone)]
struct Evidence {
    method: String,
    weight: i32,
}

/// Mutable working state for one classification pass
#[derive(Debug, Default)]
struct Assessment {
    evidence: Vec<Evidence>,
    is_vpn: bool,
    is_proxy: bool,
    is_tor: bool,
    is_cdn: bool,
    vpn_type: Option<String>,
    proxy_type: Option<String>,
}

impl Assessment {
    fn add(&mut self, method: impl Into<String>, weight: i32) {
        self.evidence.push(Evidence {
            method: method.into(),
            weight,
        });
    }

    fn confidence(&self) -> i32 {
        self.evidence.iter().map(|e| e.weight).sum()
    }

    /// Reduce the evidence list into the final result, applying the CDN
    /// misfire suppression rule and the Tor > VPN > proxy label precedence
    fn finalize(
        mut self,
        ip: IpAddr,
        source_ip_chain: Vec<IpAddr>,
        possible_source_ip: IpAddr,
        ip_info: Option<IpIntelRecord>,
    ) -> DetectionResult {
        let mut confidence = self.confidence();

        if self.is_cdn && self.is_proxy && confidence < SUPPRESSION_THRESHOLD {
            debug!(
                "Suppressing low-confidence proxy verdict for {} (confidence {})",
                ip, confidence
            );
            self.is_proxy = false;
            self.proxy_type = None;
            confidence = 0;
            self.add("cdn_misfire_suppressed", 0);
        }

        if self.is_tor {
            self.proxy_type = Some("Tor".to_string());
            self.vpn_type = Some("Tor".to_string());
        } else if self.is_vpn && self.proxy_type.is_none() {
            self.proxy_type = self.vpn_type.clone();
        }

        DetectionResult {
            is_vpn: self.is_vpn,
            is_proxy: self.is_proxy,
            is_tor: self.is_tor,
            vpn_type: self.vpn_type,
            proxy_type: self.proxy_type,
            confidence,
            source_ip_chain,
            possible_source_ip,
            detection_methods: self.evidence.into_iter().map(|e| e.method).collect(),
            ip_info,
        }
    }
}

/// CDN/proxy/Tor signal fusion over header evidence and external intelligence
pub struct Classifier<I: IpIntel> {
    intel: I,
}

impl<I: IpIntel> Classifier<I> {
    pub fn new(intel: I) -> Self {
        Self { intel }
    }

    /// Produce a confidence-scored anonymization judgment for `ip`.
    ///
    /// Best-effort throughout: the external lookup failing only means
    /// classification proceeds without `ip_info`. Never errors.
    pub async fn classify(&self, ip: IpAddr, signals: &RequestSignals) -> DetectionResult {
        if ip.is_loopback() || ip.is_unspecified() {
            return DetectionResult::direct(ip);
        }

        let mut assessment = Assessment::default();

        // CDN vendor detection gates the generic-header and peer-mismatch
        // evidence below
        let mut vendors: Vec<&str> = CDN_MARKERS
            .iter()
            .filter(|(header, _)| signals.has(header))
            .map(|&(_, vendor)| vendor)
            .collect();
        vendors.dedup();
        if !vendors.is_empty() {
            assessment.is_cdn = true;
            assessment.add(format!("cdn_headers:{}", vendors.join(",")), 0);
        }

        // Legacy proxy headers
        let present: Vec<&str> = PROXY_HEADERS
            .iter()
            .filter(|h| signals.has(h))
            .copied()
            .collect();
        if !present.is_empty() {
            if assessment.is_cdn {
                assessment.add(format!("cdn_expected_headers:{}", present.join(",")), 0);
            } else {
                assessment.is_proxy = true;
                assessment.proxy_type = Some("HTTP proxy".to_string());
                assessment.add(format!("proxy_headers:{}", present.join(",")), 25);
            }
        }

        // Forwarded-chain sourcing
        let source_ip_chain = signals.forwarded_chain();
        let mut possible_source_ip = ip;
        if source_ip_chain.len() > 1 {
            if let Some(&public) = source_ip_chain.iter().find(|e| signals::is_public(e)) {
                possible_source_ip = public;
                assessment.add(format!("forwarded_chain_source:{}", public), 0);
            }
        }

        // Tor marker
        if signals.tor_marker() {
            assessment.is_tor = true;
            assessment.proxy_type = Some("Tor".to_string());
            assessment.add("tor_marker_header", 50);
        }

        // External intelligence, skipped when header evidence already decided
        let ip_info = if assessment.confidence() > SKIP_LOOKUP_THRESHOLD {
            assessment.add("intel_lookup_skipped", 0);
            None
        } else {
            match self.intel.lookup(ip).await {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("IP intelligence unavailable for {}: {}", ip, e);
                    assessment.add("intel_unavailable", 0);
                    None
                }
            }
        };

        let mut intel_cdn = false;
        if let Some(record) = &ip_info {
            let org_isp = format!(
                "{} {}",
                record.isp.as_deref().unwrap_or(""),
                record.org.as_deref().unwrap_or("")
            )
            .to_lowercase();

            if let Some(keyword) = keywords::first_match(&org_isp, keywords::CDN_KEYWORDS) {
                intel_cdn = true;
                assessment.add(format!("intel_cdn_confirmed:{}", keyword), 0);
            } else if !assessment.is_cdn {
                if let Some(keyword) = keywords::first_match(&org_isp, keywords::VPN_KEYWORDS) {
                    assessment.is_vpn = true;
                    assessment.add(format!("intel_keyword:{}", keyword), 30);
                }
            }

            if record.hosting == Some(true)
                && !assessment.is_cdn
                && !intel_cdn
                && assessment.confidence() > 30
            {
                assessment.is_proxy = true;
                assessment.proxy_type = Some("datacenter/hosted".to_string());
                assessment.add("intel_hosting_flag", 15);
            }

            if record.proxy == Some(true) {
                assessment.is_proxy = true;
                assessment.proxy_type = Some("confirmed proxy".to_string());
                assessment.add("intel_proxy_flag", 40);
            }
        }

        // Peer-address mismatch points at a reverse proxy or load balancer
        if let Some(peer) = signals.peer_addr {
            if peer != ip && !signals::is_public(&peer) {
                if assessment.is_cdn {
                    assessment.add("cdn_expected_peer_mismatch", 0);
                } else {
                    assessment.is_proxy = true;
                    if assessment.proxy_type.is_none() {
                        assessment.proxy_type = Some("reverse proxy/load balancer".to_string());
                    }
                    assessment.add("private_peer_mismatch", 20);
                }
            }
        }

        // Known commercial VPN brands
        if let Some(org) = ip_info.as_ref().and_then(|r| r.org.as_deref()) {
            let org_lower = org.to_lowercase();
            if let Some(brand) = keywords::first_match(&org_lower, keywords::VPN_BRANDS) {
                assessment.is_vpn = true;
                assessment.vpn_type = Some(format!("{} VPN", brand));
                assessment.add(format!("vpn_brand:{}", brand), 50);
            }
        }

        let result = assessment.finalize(ip, source_ip_chain, possible_source_ip, ip_info);
        info!(
            "Classified {}: vpn={} proxy={} tor={} confidence={}",
            ip, result.is_vpn, result.is_proxy, result.is_tor, result.confidence
        );

        result
    }
}
