// SPDX-License-Identifier: MIT OR Apache-2.0
//! DID:web resolution: `did:web:<host>[:path]` to its published DID
//! document, guarded against SSRF.

use ed25519_dalek::VerifyingKey;

use corsair_error::{CorsairError, ErrorCode};
use corsair_keys::DidDocument;

use crate::ssrf;

fn percent_decode_colon(segment: &str) -> String {
    segment.replace("%3A", ":").replace("%3a", ":")
}

/// Split a `did:web:...` identifier into its host and optional path
/// segments, decoding the `%3A`-encoded port colon if present.
///
/// # Errors
///
/// Returns [`CorsairError`] with [`ErrorCode::UnsupportedDidMethod`] if
/// `did` is not a `did:web:` identifier.
pub fn parse_did_web(did: &str) -> Result<(String, Vec<String>), CorsairError> {
    let rest = did.strip_prefix("did:web:").ok_or_else(|| {
        CorsairError::new(
            ErrorCode::UnsupportedDidMethod,
            format!("not a did:web identifier: {did}"),
        )
    })?;
    let mut parts = rest.split(':');
    let host = percent_decode_colon(parts.next().filter(|s| !s.is_empty()).ok_or_else(|| {
        CorsairError::new(ErrorCode::UnsupportedDidMethod, format!("empty host in {did}"))
    })?);
    let path_segments: Vec<String> = parts.map(percent_decode_colon).collect();
    Ok((host, path_segments))
}

/// Build the `https://` URL a `did:web` identifier resolves to: the
/// well-known discovery path when there's no path component, otherwise a
/// `did.json` document alongside the path.
#[must_use]
pub fn build_resolution_url(host: &str, path_segments: &[String]) -> String {
    if path_segments.is_empty() {
        format!("https://{host}/.well-known/did.json")
    } else {
        format!("https://{host}/{}/did.json", path_segments.join("/"))
    }
}

/// Fetch and parse the DID document for `did`, enforcing the SSRF guard
/// against its host before making any request.
///
/// # Errors
///
/// Returns [`CorsairError`] if `did` is not `did:web:`, its host is
/// blocked by the SSRF guard, the request fails, or the response body
/// isn't a valid DID document.
pub async fn resolve_did_web(client: &reqwest::Client, did: &str) -> Result<DidDocument, CorsairError> {
    let (host, path_segments) = parse_did_web(did)?;
    let host_only = host.split(':').next().unwrap_or(&host);
    ssrf::guard_host(host_only).await?;

    let url = build_resolution_url(&host, &path_segments);
    tracing::debug!(%did, %url, "resolving did:web document");

    let response = client.get(&url).send().await.map_err(|e| {
        CorsairError::new(ErrorCode::DidDocumentUnreachable, format!("{url}: {e}"))
    })?;
    if !response.status().is_success() {
        return Err(CorsairError::new(
            ErrorCode::DidDocumentUnreachable,
            format!("{url} returned status {}", response.status()),
        ));
    }
    response
        .json::<DidDocument>()
        .await
        .map_err(|e| CorsairError::new(ErrorCode::DidDocumentUnreachable, format!("{url}: {e}")))
}

/// Decode a DID document's `publicKeyMultibase` (base58btc, `z`-prefixed)
/// into a raw Ed25519 [`VerifyingKey`].
///
/// # Errors
///
/// Returns [`CorsairError`] if the multibase prefix is missing, the
/// base58 is malformed, or the decoded bytes aren't a valid Ed25519 key.
pub fn decode_multibase_key(multibase: &str) -> Result<VerifyingKey, CorsairError> {
    let encoded = multibase.strip_prefix('z').ok_or_else(|| {
        CorsairError::new(
            ErrorCode::DidDocumentUnreachable,
            "publicKeyMultibase is missing its 'z' multibase prefix",
        )
    })?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CorsairError::new(ErrorCode::DidDocumentUnreachable, e.to_string()))?;
    let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        CorsairError::new(
            ErrorCode::DidDocumentUnreachable,
            "expected a 32-byte Ed25519 public key",
        )
    })?;
    VerifyingKey::from_bytes(&arr)
        .map_err(|e| CorsairError::new(ErrorCode::DidDocumentUnreachable, e.to_string()))
}
