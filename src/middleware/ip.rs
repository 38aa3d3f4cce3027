//! Client identity resolution for rate limiting and request logs.
//!
//! # Header Priority
//!
//! Checks in order (returns first usable value):
//! 1. `X-Forwarded-For` (first address of the comma-separated chain)
//! 2. `X-Real-IP`
//! 3. `CF-Connecting-IP`
//! 4. `True-Client-IP`
//! 5. The socket peer address from `ConnectInfo`
//! 6. [`UNKNOWN_IP`]
//!
//! A header whose trimmed value is empty or the literal `unknown` is skipped.
//! IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`) are reduced to `a.b.c.d`.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **These headers are client-controlled.** Deploy behind a reverse proxy that
//! overwrites them, otherwise a client can rotate spoofed addresses to dodge
//! per-client rate limits.
//!
//! # The "unknown" Fallback
//!
//! When nothing identifies the client, all such requests share the `"unknown"`
//! key and are rate-limited collectively.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use tracing::trace;

/// Fallback value when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Where a resolved address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractedIp<'a> {
    FromXff(&'a str),
    FromRealIp(&'a str),
    FromCloudflare(&'a str),
    FromTrueClientIp(&'a str),
    NotFound,
}

impl<'a> ExtractedIp<'a> {
    fn value(self) -> Option<&'a str> {
        match self {
            ExtractedIp::FromXff(ip)
            | ExtractedIp::FromRealIp(ip)
            | ExtractedIp::FromCloudflare(ip)
            | ExtractedIp::FromTrueClientIp(ip) => Some(ip),
            ExtractedIp::NotFound => None,
        }
    }
}

fn usable(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && !value.eq_ignore_ascii_case(UNKNOWN_IP)).then_some(value)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[inline]
fn extract_ip_from_headers(headers: &HeaderMap) -> ExtractedIp<'_> {
    // Format: "client, proxy1, proxy2" - we want the first (client) address
    if let Some(value) = header_value(headers, "x-forwarded-for")
        && let Some(first) = value.split(',').next()
        && let Some(ip) = usable(first)
    {
        return ExtractedIp::FromXff(ip);
    }

    if let Some(ip) = header_value(headers, "x-real-ip").and_then(usable) {
        return ExtractedIp::FromRealIp(ip);
    }

    if let Some(ip) = header_value(headers, "cf-connecting-ip").and_then(usable) {
        return ExtractedIp::FromCloudflare(ip);
    }

    if let Some(ip) = header_value(headers, "true-client-ip").and_then(usable) {
        return ExtractedIp::FromTrueClientIp(ip);
    }

    ExtractedIp::NotFound
}

/// Render a socket peer, unwrapping IPv4-mapped IPv6 addresses.
fn peer_ip(peer: SocketAddr) -> String {
    match peer.ip() {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        IpAddr::V4(v4) => v4.to_string(),
    }
}

/// Resolve a best-effort client address.
///
/// `peer` is the connection's remote address when the server was started
/// with `ConnectInfo`; it is only consulted when no proxy header is usable.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Cow<'static, str> {
    let extracted = extract_ip_from_headers(headers);
    if let Some(ip) = extracted.value() {
        trace!(source = ?extracted, "Client IP resolved from proxy header");
        return Cow::Owned(ip.to_string());
    }

    match peer {
        Some(addr) => Cow::Owned(peer_ip(addr)),
        None => Cow::Borrowed(UNKNOWN_IP),
    }
}
