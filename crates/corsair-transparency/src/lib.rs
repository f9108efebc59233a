// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Transparency Client: append-only registration of CPOEs (or hash
//! commitments) with an external log, plus `trust.txt` endpoint discovery.
//!
//! Outbound requests reuse [`corsair_verify::ssrf`]'s guard rather than
//! duplicating it: both crates resolve untrusted, issuer-controlled URLs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use corsair_error::{CorsairError, ErrorCode};

/// Network deadline for log registration and `trust.txt` fetches.
const TRANSPARENCY_TIMEOUT: Duration = Duration::from_secs(10);

/// How a CPOE is registered with a transparency log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// The full signed JWT is submitted as the log entry body.
    FullStatement,
    /// Only `{commitment: sha256(JWT)}` is submitted.
    ProofOnly,
}

/// The log's response to a registration request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogEntry {
    /// The stable identifier the log assigned to this entry.
    pub id: String,
}

/// A client bound to one transparency log's base URL.
pub struct TransparencyClient {
    client: reqwest::Client,
    log_url: String,
}

impl TransparencyClient {
    /// Build a client for the log at `log_url` (no trailing slash
    /// required).
    ///
    /// # Panics
    ///
    /// Panics if the underlying TLS backend fails to initialize, which
    /// does not happen with the compiled-in `rustls` backend.
    #[must_use]
    pub fn new(log_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TRANSPARENCY_TIMEOUT)
            .build()
            .expect("reqwest client with rustls-tls always builds");
        Self {
            client,
            log_url: log_url.into(),
        }
    }

    /// Register `compact_jwt` with the log in `mode`, returning the
    /// assigned entry id.
    ///
    /// # Errors
    ///
    /// Returns [`CorsairError`] if the log URL's host is SSRF-blocked, the
    /// scheme isn't `http`/`https`, the request fails, or the response
    /// isn't a well-formed [`LogEntry`].
    pub async fn register(&self, compact_jwt: &str, mode: RegistrationMode) -> Result<LogEntry, CorsairError> {
        let url = format!("{}/entries", self.log_url.trim_end_matches('/'));
        guard_url(&url).await?;

        let body = match mode {
            RegistrationMode::FullStatement => serde_json::json!({ "statement": compact_jwt }),
            RegistrationMode::ProofOnly => {
                serde_json::json!({ "commitment": corsair_core::sha256_hex(compact_jwt.as_bytes()) })
            }
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CorsairError::new(ErrorCode::NetworkUnreachable, e.to_string()))?;

        if !response.status().is_success() {
            return Err(CorsairError::new(
                ErrorCode::NetworkUnreachable,
                format!("log returned status {}", response.status()),
            ));
        }

        response
            .json::<LogEntry>()
            .await
            .map_err(|e| CorsairError::new(ErrorCode::NetworkUnreachable, format!("malformed log response: {e}")))
    }
}

/// Endpoints named by a domain's `/.well-known/trust.txt` discovery file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustTxt {
    /// `=cpoe=URL` — where this issuer's CPOEs can be fetched.
    pub cpoe: Option<String>,
    /// `=scitt=URL` — the transparency log this issuer registers with.
    pub scitt: Option<String>,
    /// `=policy=URL` — this issuer's published verification policy.
    pub policy: Option<String>,
    /// `=frameworks=CSV` — frameworks this issuer reports coverage against.
    pub frameworks: Vec<String>,
}

/// Parse a `trust.txt` document's contents: one `=key=value` per line,
/// blank lines and unrecognised keys ignored.
#[must_use]
pub fn parse_trust_txt(content: &str) -> TrustTxt {
    let mut trust = TrustTxt::default();
    for line in content.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('=') else { continue };
        let Some((key, value)) = rest.split_once('=') else { continue };
        let value = value.trim();
        match key.trim() {
            "cpoe" => trust.cpoe = Some(value.to_string()),
            "scitt" => trust.scitt = Some(value.to_string()),
            "policy" => trust.policy = Some(value.to_string()),
            "frameworks" => {
                trust.frameworks = value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
            }
            _ => {}
        }
    }
    trust
}

/// Render a [`TrustTxt`] back into the `=key=value` file format.
#[must_use]
pub fn render_trust_txt(trust: &TrustTxt) -> String {
    let mut lines = Vec::new();
    if let Some(ref v) = trust.cpoe {
        lines.push(format!("=cpoe={v}"));
    }
    if let Some(ref v) = trust.scitt {
        lines.push(format!("=scitt={v}"));
    }
    if let Some(ref v) = trust.policy {
        lines.push(format!("=policy={v}"));
    }
    if !trust.frameworks.is_empty() {
        lines.push(format!("=frameworks={}", trust.frameworks.join(",")));
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Fetch and parse `<domain>/.well-known/trust.txt`.
///
/// # Errors
///
/// Returns [`CorsairError`] if `domain`'s host is SSRF-blocked or the
/// request fails. A non-200 response is not an error: it is treated as
/// "no discovery file published" and returns an empty [`TrustTxt`].
pub async fn discover_trust_txt(client: &reqwest::Client, domain: &str) -> Result<TrustTxt, CorsairError> {
    let url = format!("https://{domain}/.well-known/trust.txt");
    guard_url(&url).await?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| CorsairError::new(ErrorCode::NetworkUnreachable, e.to_string()))?;

    if !response.status().is_success() {
        return Ok(TrustTxt::default());
    }

    let body = response
        .text()
        .await
        .map_err(|e| CorsairError::new(ErrorCode::NetworkUnreachable, e.to_string()))?;
    Ok(parse_trust_txt(&body))
}

async fn guard_url(url: &str) -> Result<(), CorsairError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| CorsairError::new(ErrorCode::SsrfBlockedHost, e.to_string()))?;
    corsair_verify::ssrf::require_http_scheme(parsed.scheme())?;
    let host = parsed
        .host_str()
        .ok_or_else(|| CorsairError::new(ErrorCode::SsrfBlockedHost, format!("no host in URL: {url}")))?;
    corsair_verify::ssrf::guard_host(host).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys_and_ignores_unknown() {
        let content = "=cpoe=https://issuer.example/cpoes\n=scitt=https://log.example\n=unknown=ignored\n=frameworks=SOC2, PCI-DSS\n";
        let trust = parse_trust_txt(content);
        assert_eq!(trust.cpoe.as_deref(), Some("https://issuer.example/cpoes"));
        assert_eq!(trust.scitt.as_deref(), Some("https://log.example"));
        assert_eq!(trust.policy, None);
        assert_eq!(trust.frameworks, vec!["SOC2".to_string(), "PCI-DSS".to_string()]);
    }

    #[test]
    fn render_round_trips_through_parse() {
        let trust = TrustTxt {
            cpoe: Some("https://issuer.example/cpoes".to_string()),
            scitt: Some("https://log.example".to_string()),
            policy: None,
            frameworks: vec!["SOC2".to_string()],
        };
        let rendered = render_trust_txt(&trust);
        assert_eq!(parse_trust_txt(&rendered), trust);
    }

    #[test]
    fn blank_and_malformed_lines_are_ignored() {
        let trust = parse_trust_txt("\n\nnot-a-kv-line\n=cpoe=https://a.example\n");
        assert_eq!(trust.cpoe.as_deref(), Some("https://a.example"));
    }

    #[tokio::test]
    async fn register_rejects_ssrf_blocked_log_url() {
        let client = TransparencyClient::new("http://169.254.169.254");
        let result = client.register("header.payload.sig", RegistrationMode::ProofOnly).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, ErrorCode::SsrfBlockedHost);
    }

    #[tokio::test]
    async fn discover_rejects_ssrf_blocked_domain() {
        let client = reqwest::Client::new();
        let result = discover_trust_txt(&client, "localhost").await;
        assert!(result.is_err());
    }
}
