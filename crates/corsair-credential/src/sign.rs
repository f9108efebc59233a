// SPDX-License-Identifier: MIT OR Apache-2.0
//! JWT-VC composition, signing, and parse-only decoding.

use base64::Engine as _;
use ed25519_dalek::Signature;

use corsair_core::{CredentialSubject, Receipt};
use corsair_error::{CorsairError, ErrorCode};
use corsair_keys::KeyManager;

use crate::payload::{Header, Payload};

fn b64url(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn b64url_decode(s: &str) -> Result<Vec<u8>, CorsairError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| CorsairError::new(ErrorCode::InputMalformedJwt, e.to_string()))
}

/// A composed, signed CPOE: the JWT-VC compact serialization plus its
/// decoded parts, kept around so callers don't have to re-decode what
/// they just signed.
#[derive(Debug, Clone)]
pub struct SignedCpoe {
    /// `base64url(header).base64url(payload).base64url(signature)`.
    pub compact: String,
    /// The header that was signed.
    pub header: Header,
    /// The payload that was signed.
    pub payload: Payload,
}

/// Compose and sign a CPOE for `subject`, issued at `iat` (seconds since
/// epoch) with the given `expiry_days`.
///
/// `marque_id` is the UUID used to build the `marque-<UUID>` `jti`; callers
/// generate it so it can also be threaded into the receipt chain's final
/// `Marque` step.
///
/// # Errors
///
/// Returns [`CorsairError`] if the header or payload cannot be serialized.
#[allow(clippy::too_many_arguments)]
pub fn sign_cpoe(
    key_manager: &KeyManager,
    issuer_domain: &str,
    issuer_name: &str,
    subject: &CredentialSubject,
    iat: i64,
    expiry_days: u32,
    marque_id: uuid::Uuid,
    receipts: Vec<Receipt>,
) -> Result<SignedCpoe, CorsairError> {
    let issuer_did = format!("did:web:{issuer_domain}");
    let kid = format!("{issuer_did}#key-1");
    let header = Header::new(kid);
    let payload = Payload::new(
        &issuer_did,
        issuer_name,
        subject,
        iat,
        expiry_days,
        marque_id,
        receipts,
    );

    let header_b64 = b64url(serde_json::to_string(&header)?.as_bytes());
    let payload_b64 = b64url(serde_json::to_string(&payload)?.as_bytes());
    let signing_input = format!("{header_b64}.{payload_b64}");

    let signature = key_manager.sign(signing_input.as_bytes());
    let sig_b64 = b64url(&signature.to_bytes());

    Ok(SignedCpoe {
        compact: format!("{signing_input}.{sig_b64}"),
        header,
        payload,
    })
}

/// A JWT-VC split into its three base64url segments, prior to any
/// validation.
struct Segments<'a> {
    header_b64: &'a str,
    payload_b64: &'a str,
    signature_b64: &'a str,
}

fn split_segments(compact: &str) -> Result<Segments<'_>, CorsairError> {
    let mut parts = compact.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CorsairError::new(
            ErrorCode::InputMalformedJwt,
            "expected exactly three dot-separated segments",
        ));
    };
    Ok(Segments {
        header_b64,
        payload_b64,
        signature_b64,
    })
}

/// Decode the header of `compact` without verifying its signature.
///
/// # Errors
///
/// Returns [`CorsairError`] if the JWT is malformed or the header segment
/// is not valid JSON.
pub fn decode_jwt_header(compact: &str) -> Result<Header, CorsairError> {
    let segments = split_segments(compact)?;
    let bytes = b64url_decode(segments.header_b64)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CorsairError::new(ErrorCode::InputMalformedJwt, e.to_string()))
}

/// Decode the payload of `compact` without verifying its signature. This
/// is the parse-only inspection operation; callers that need trust
/// guarantees must go through the Verifier instead.
///
/// # Errors
///
/// Returns [`CorsairError`] if the JWT is malformed or the payload segment
/// is not valid JSON matching the CPOE payload shape.
pub fn decode_jwt_payload(compact: &str) -> Result<Payload, CorsairError> {
    let segments = split_segments(compact)?;
    let bytes = b64url_decode(segments.payload_b64)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CorsairError::new(ErrorCode::InputMalformedJwt, e.to_string()))
}

/// Decode the raw signature bytes of `compact`, without verifying them.
///
/// # Errors
///
/// Returns [`CorsairError`] if the JWT is malformed or the signature
/// segment is not a 64-byte Ed25519 signature.
pub fn decode_jwt_signature(compact: &str) -> Result<Signature, CorsairError> {
    let segments = split_segments(compact)?;
    let bytes = b64url_decode(segments.signature_b64)?;
    let arr: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CorsairError::new(ErrorCode::InputMalformedJwt, "signature must be 64 bytes"))?;
    Ok(Signature::from_bytes(&arr))
}

/// The exact bytes that were signed (header + `.` + payload), for
/// signature verification against a resolved key.
///
/// # Errors
///
/// Returns [`CorsairError`] if the JWT is malformed.
pub fn signing_input(compact: &str) -> Result<String, CorsairError> {
    let segments = split_segments(compact)?;
    Ok(format!("{}.{}", segments.header_b64, segments.payload_b64))
}
