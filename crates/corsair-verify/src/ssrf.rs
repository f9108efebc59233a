// SPDX-License-Identifier: MIT OR Apache-2.0
//! The SSRF guard shared by every outbound resolution this crate performs
//! (DID:web documents today; transparency-log/`trust.txt` fetches reuse it
//! too). Blocks loopback, RFC 1918, link-local, unique-local, `0.0.0.0/8`,
//! and known cloud metadata hostnames, and restricts schemes to
//! `http`/`https`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use corsair_error::{CorsairError, ErrorCode};

const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "metadata.google.internal", "metadata.internal"];

/// `true` iff `hostname` is one of the known blocked literal names
/// (case-insensitive). Does not perform DNS resolution.
#[must_use]
pub fn is_blocked_hostname(hostname: &str) -> bool {
    let lower = hostname.to_ascii_lowercase();
    BLOCKED_HOSTNAMES.contains(&lower.as_str())
}

/// `true` iff `ip` falls in a loopback, private, link-local, unique-local,
/// unspecified, or `0.0.0.0/8` range.
#[must_use]
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(v4: Ipv4Addr) -> bool {
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.octets()[0] == 0
}

fn is_blocked_ipv6(v6: Ipv6Addr) -> bool {
    v6.is_loopback() || v6.is_unspecified() || v6.is_unique_local() || v6.is_unicast_link_local()
}

/// Only `http`/`https` schemes may be resolved.
///
/// # Errors
///
/// Returns [`CorsairError`] with [`ErrorCode::SsrfBlockedHost`] for any
/// other scheme.
pub fn require_http_scheme(scheme: &str) -> Result<(), CorsairError> {
    if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
        Ok(())
    } else {
        Err(CorsairError::new(
            ErrorCode::SsrfBlockedHost,
            format!("scheme '{scheme}' is not http/https"),
        ))
    }
}

/// Validate `host` (a bare hostname or IP literal, no scheme or port)
/// against the literal blocklist, then against every address it resolves
/// to. Resolution uses the target's HTTPS port so name lookup exercises
/// the same path the subsequent request will take.
///
/// # Errors
///
/// Returns [`CorsairError`] with [`ErrorCode::SsrfBlockedHost`] if the
/// hostname or any resolved address is blocked, or
/// [`ErrorCode::DidDocumentUnreachable`] if DNS resolution itself fails.
pub async fn guard_host(host: &str) -> Result<(), CorsairError> {
    if is_blocked_hostname(host) {
        return Err(CorsairError::new(
            ErrorCode::SsrfBlockedHost,
            format!("blocked hostname: {host}"),
        ));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return if is_blocked_ip(ip) {
            Err(CorsairError::new(
                ErrorCode::SsrfBlockedHost,
                format!("blocked IP literal: {ip}"),
            ))
        } else {
            Ok(())
        };
    }

    let lookup_target = format!("{host}:443");
    let addrs = tokio::net::lookup_host(&lookup_target).await.map_err(|e| {
        CorsairError::new(
            ErrorCode::DidDocumentUnreachable,
            format!("failed to resolve {host}: {e}"),
        )
    })?;
    for addr in addrs {
        if is_blocked_ip(addr.ip()) {
            return Err(CorsairError::new(
                ErrorCode::SsrfBlockedHost,
                format!("{host} resolves to blocked address {}", addr.ip()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_known_metadata_hostnames() {
        assert!(is_blocked_hostname("metadata.google.internal"));
        assert!(is_blocked_hostname("METADATA.INTERNAL"));
        assert!(!is_blocked_hostname("issuer.example.com"));
    }

    #[test]
    fn blocks_private_and_loopback_ipv4() {
        assert!(is_blocked_ip("127.0.0.1".parse().unwrap()));
        assert!(is_blocked_ip("10.1.2.3".parse().unwrap()));
        assert!(is_blocked_ip("192.168.1.1".parse().unwrap()));
        assert!(is_blocked_ip("169.254.1.1".parse().unwrap()));
        assert!(is_blocked_ip("0.0.0.5".parse().unwrap()));
        assert!(!is_blocked_ip("93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn blocks_unique_local_and_link_local_ipv6() {
        assert!(is_blocked_ip("::1".parse().unwrap()));
        assert!(is_blocked_ip("fc00::1".parse().unwrap()));
        assert!(is_blocked_ip("fe80::1".parse().unwrap()));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(require_http_scheme("file").is_err());
        assert!(require_http_scheme("ftp").is_err());
        assert!(require_http_scheme("HTTPS").is_ok());
    }

    #[tokio::test]
    async fn guard_host_rejects_loopback_ip_literal() {
        let result = guard_host("127.0.0.1").await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, ErrorCode::SsrfBlockedHost);
    }

    #[tokio::test]
    async fn guard_host_rejects_blocked_hostname_without_dns_lookup() {
        let result = guard_host("metadata.google.internal").await;
        assert!(result.is_err());
    }
}
