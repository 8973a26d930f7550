//! Fixed keyword tables used to classify ISP/organization strings.
//! All matching is lower-cased substring containment.

/// Keywords identifying CDN and large cloud operators. A match confirms CDN
/// presence and must never count as VPN evidence.
pub const CDN_KEYWORDS: &[&str] = &[
    "cloudflare",
    "fastly",
    "akamai",
    "cloudfront",
    "keycdn",
    "maxcdn",
    "cdn",
    "alibaba",
    "tencent cloud",
    "aliyun",
    "aws",
    "azure",
    "google cloud",
];

/// Generic anonymizer keywords checked against ISP/org strings
pub const VPN_KEYWORDS: &[&str] = &["vpn", "proxy", "tor"];

/// Named commercial VPN brands; a match sets the VPN label outright
pub const VPN_BRANDS: &[&str] = &[
    "nordvpn",
    "expressvpn",
    "surfshark",
    "cyberghost",
    "private internet access",
    "protonvpn",
    "mullvad",
    "windscribe",
    "ipvanish",
    "purevpn",
    "hotspot shield",
    "tunnelbear",
    "strongvpn",
    "vyprvpn",
];

/// First keyword from `table` contained in `haystack` (already lower-cased)
pub fn first_match<'a>(haystack: &str, table: &[&'a str]) -> Option<&'a str> {
    table.iter().find(|kw| haystack.contains(*kw)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_table_has_fourteen_entries() {
        assert_eq!(VPN_BRANDS.len(), 14);
    }

    #[test]
    fn every_brand_in_the_table_matches_its_org_string() {
        for brand in VPN_BRANDS {
            let org = format!("{} llc", brand);
            assert_eq!(first_match(&org, VPN_BRANDS), Some(*brand));
        }
        assert_eq!(first_match("strongvpn llc", VPN_BRANDS), Some("strongvpn"));
    }

    #[test]
    fn first_match_respects_table_order() {
        assert_eq!(first_match("nordvpn s.a.", VPN_BRANDS), Some("nordvpn"));
        assert_eq!(first_match("some vpn provider", VPN_KEYWORDS), Some("vpn"));
        assert_eq!(first_match("comcast cable", VPN_KEYWORDS), None);
        // "cdn" is deliberately late in the table so vendor names win
        assert_eq!(first_match("keycdn gmbh", CDN_KEYWORDS), Some("keycdn"));
    }
}
