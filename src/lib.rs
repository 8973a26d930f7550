//! Client-identity resolution and anonymization-inference engine.
//!
//! Fuses untrusted request signals (forwarded-IP headers, CDN markers,
//! external IP intelligence) into a single resolved client address and a
//! confidence-scored judgment of whether that address is a CDN edge, VPN
//! endpoint, proxy, Tor exit, or direct client.

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod report;
pub mod resolver;
pub mod signals;
pub mod types;
