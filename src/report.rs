use serde::{Deserialize, Serialize};

use crate::types::{DetectionResult, ResolutionResult};

/// Engine output bundle handed to consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    /// Resolution outcome
    #[serde(flatten)]
    pub resolution: ResolutionResult,

    /// Anonymization judgment
    pub detection: DetectionResult,

    /// Human-readable location description
    pub location: String,
}

/// Categorical verdict derived from the detection flags, Tor > VPN > proxy
pub fn verdict_label(detection: &DetectionResult) -> String {
    if detection.is_tor {
        "Tor".to_string()
    } else if detection.is_vpn {
        detection
            .vpn_type
            .clone()
            .unwrap_or_else(|| "VPN".to_string())
    } else if detection.is_proxy {
        detection
            .proxy_type
            .clone()
            .unwrap_or_else(|| "proxy".to_string())
    } else {
        "direct".to_string()
    }
}

/// One-line summary for the request log
pub fn log_line(report: &InspectionReport) -> String {
    format!(
        "client={} via_frontend={} verdict={} confidence={} location={} methods=[{}]",
        report.resolution.client_ip,
        report.resolution.via_frontend,
        verdict_label(&report.detection),
        report.detection.confidence,
        report.location,
        report.detection.detection_methods.join(", "),
    )
}

/// Plain warning-page body shown to flagged clients
pub fn warning_page(report: &InspectionReport) -> String {
    let detection = &report.detection;

    if !detection.is_anonymized() {
        return format!(
            "Connection from {} ({}) looks direct.\n",
            report.resolution.client_ip, report.location
        );
    }

    let mut body = format!(
        "Anonymized connection detected.\n\nAddress:    {}\nLocation:   {}\nVerdict:    {}\nConfidence: {}\n",
        report.resolution.client_ip,
        report.location,
        verdict_label(detection),
        detection.confidence,
    );

    if detection.possible_source_ip != report.resolution.client_ip {
        body.push_str(&format!(
            "Likely origin behind the chain: {}\n",
            detection.possible_source_ip
        ));
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn report(detection: DetectionResult) -> InspectionReport {
        InspectionReport {
            resolution: ResolutionResult {
                client_ip: "203.0.113.9".parse().unwrap(),
                via_frontend: true,
            },
            detection,
            location: "Amsterdam, Netherlands".to_string(),
        }
    }

    fn base_detection() -> DetectionResult {
        DetectionResult::direct("203.0.113.9".parse::<IpAddr>().unwrap())
    }

    #[test]
    fn verdict_precedence_tor_over_vpn_over_proxy() {
        let mut detection = base_detection();
        detection.is_proxy = true;
        detection.proxy_type = Some("HTTP proxy".to_string());
        assert_eq!(verdict_label(&detection), "HTTP proxy");

        detection.is_vpn = true;
        detection.vpn_type = Some("nordvpn VPN".to_string());
        assert_eq!(verdict_label(&detection), "nordvpn VPN");

        detection.is_tor = true;
        assert_eq!(verdict_label(&detection), "Tor");
    }

    #[test]
    fn direct_connections_get_a_calm_page() {
        let page = warning_page(&report(base_detection()));
        assert!(page.contains("looks direct"));
    }

    #[test]
    fn flagged_connections_get_the_warning_body() {
        let mut detection = base_detection();
        detection.is_vpn = true;
        detection.vpn_type = Some("nordvpn VPN".to_string());
        detection.confidence = 80;
        detection.possible_source_ip = "198.51.100.2".parse().unwrap();

        let page = warning_page(&report(detection));
        assert!(page.contains("Anonymized connection detected"));
        assert!(page.contains("nordvpn VPN"));
        assert!(page.contains("198.51.100.2"));
    }

    #[test]
    fn log_line_carries_the_audit_trail() {
        let mut detection = base_detection();
        detection.detection_methods = vec!["a".to_string(), "b".to_string()];

        let line = log_line(&report(detection));
        assert!(line.contains("client=203.0.113.9"));
        assert!(line.contains("methods=[a, b]"));
    }
}
