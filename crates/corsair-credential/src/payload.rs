// SPDX-License-Identifier: MIT OR Apache-2.0
//! The JWT-VC header and payload shapes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use corsair_core::{CredentialSubject, Receipt};

/// The JWT header. `alg` is always `EdDSA`; other values are rejected by
/// the verifier at decode time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Header {
    /// Signature algorithm; always `"EdDSA"`.
    pub alg: String,
    /// Media type; always `"vc+jwt"`.
    pub typ: String,
    /// Key id: `<issuer DID>#key-1`.
    pub kid: String,
}

impl Header {
    /// Build the standard CORSAIR header for `kid`.
    #[must_use]
    pub fn new(kid: impl Into<String>) -> Self {
        Self {
            alg: "EdDSA".to_string(),
            typ: "vc+jwt".to_string(),
            kid: kid.into(),
        }
    }
}

/// The W3C Verifiable Credential issuer block.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Issuer {
    /// Issuer DID.
    pub id: String,
    /// Human-readable issuer name.
    pub name: String,
}

/// The `vc` object nested in the JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VcObject {
    /// JSON-LD context entries.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// VC type array; always `["VerifiableCredential", "CorsairCPOE"]`.
    #[serde(rename = "type")]
    pub vc_type: Vec<String>,
    /// The issuer.
    pub issuer: Issuer,
    /// RFC 3339 start of validity.
    #[serde(rename = "validFrom")]
    pub valid_from: String,
    /// RFC 3339 end of validity.
    #[serde(rename = "validUntil")]
    pub valid_until: String,
    /// The credential subject payload.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: serde_json::Value,
    /// The sealed process-receipt chain this credential was generated
    /// from, final entry last. Not a reserved VC claim; carried so a
    /// verifier enforcing `require-evidence-chain` can re-hash it against
    /// the marque receipt's embedded chain digest without a side channel.
    pub receipts: Vec<Receipt>,
}

/// The full JWT-VC payload, exact reserved claim names from the wire
/// format.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Payload {
    /// Issuer DID.
    pub iss: String,
    /// Subject identifier; equal to `jti`.
    pub sub: String,
    /// `marque-<UUID>`.
    pub jti: String,
    /// Seconds since epoch, issued at.
    pub iat: i64,
    /// Seconds since epoch, expiry.
    pub exp: i64,
    /// Protocol version (e.g. `"2.1"`).
    pub parley: String,
    /// The verifiable credential body.
    pub vc: VcObject,
}

impl Payload {
    /// Build a payload for `subject`, pinning `iat`, deriving `exp` from
    /// `expiry_days`, and generating a fresh `marque-<UUID>` identifier.
    #[must_use]
    pub fn new(
        issuer_did: &str,
        issuer_name: &str,
        subject: &CredentialSubject,
        iat: i64,
        expiry_days: u32,
        marque_id: uuid::Uuid,
        receipts: Vec<Receipt>,
    ) -> Self {
        let jti = format!("marque-{marque_id}");
        let exp = iat + i64::from(expiry_days) * 86_400;
        let valid_from = chrono::DateTime::from_timestamp(iat, 0)
            .unwrap_or_default()
            .to_rfc3339();
        let valid_until = chrono::DateTime::from_timestamp(exp, 0)
            .unwrap_or_default()
            .to_rfc3339();
        Self {
            iss: issuer_did.to_string(),
            sub: jti.clone(),
            jti,
            iat,
            exp,
            parley: corsair_core::PARLEY_VERSION.to_string(),
            vc: VcObject {
                context: vec![
                    "https://www.w3.org/2018/credentials/v1".to_string(),
                    "https://corsair.example/contexts/cpoe/v1".to_string(),
                ],
                vc_type: vec!["VerifiableCredential".to_string(), "CorsairCPOE".to_string()],
                issuer: Issuer {
                    id: issuer_did.to_string(),
                    name: issuer_name.to_string(),
                },
                valid_from,
                valid_until,
                credential_subject: serde_json::to_value(subject).unwrap_or(serde_json::Value::Null),
                receipts,
            },
        }
    }

    /// Whether `exp` has passed relative to `now` (seconds since epoch).
    /// Half-open interval: `exp == now` counts as expired.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp <= now
    }
}
