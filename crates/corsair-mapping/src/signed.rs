// SPDX-License-Identifier: MIT OR Apache-2.0
//! Signed mapping pack parsing and Ed25519 verification.

use base64::Engine as _;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rule::{MappingError, MappingRule};

/// Pack-level metadata for a signed mapping pack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PackMetadata {
    /// Pack identifier.
    pub id: String,
    /// Pack version string.
    pub version: String,
    /// RFC 3339 issuance timestamp.
    #[serde(rename = "issuedAt")]
    pub issued_at: String,
}

/// A signed collection of [`MappingRule`]s distributed as a single file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SignedPack {
    /// Pack metadata.
    pub pack: PackMetadata,
    /// The mappings carried by this pack.
    pub mappings: Vec<MappingRule>,
    /// Base64-encoded Ed25519 signature over the canonicalized pack with
    /// this field forced to `null`.
    pub signature: String,
}

impl SignedPack {
    /// Canonical JSON of this pack with `signature` forced to `null`,
    /// which is exactly what the signature commits to.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidInput`] if the pack cannot be
    /// serialized.
    pub fn signing_payload(&self) -> Result<String, MappingError> {
        let mut v = serde_json::to_value(self).map_err(|e| MappingError::InvalidInput {
            reason: e.to_string(),
        })?;
        if let serde_json::Value::Object(map) = &mut v {
            map.insert("signature".to_string(), serde_json::Value::Null);
        }
        serde_json::to_string(&v).map_err(|e| MappingError::InvalidInput {
            reason: e.to_string(),
        })
    }

    /// Verify this pack's signature against `verifying_key`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::SignatureInvalid`] if the signature does
    /// not verify, or [`MappingError::InvalidInput`] if the signature or
    /// payload is malformed.
    pub fn verify(&self, verifying_key: &VerifyingKey) -> Result<(), MappingError> {
        let payload = self.signing_payload()?;
        let sig_bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.signature)
            .or_else(|_| {
                base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(&self.signature)
            })
            .map_err(|_| MappingError::SignatureInvalid {
                id: self.pack.id.clone(),
            })?;
        let sig_array: [u8; 64] = sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| MappingError::SignatureInvalid {
                id: self.pack.id.clone(),
            })?;
        let signature = Signature::from_bytes(&sig_array);
        verifying_key
            .verify(payload.as_bytes(), &signature)
            .map_err(|_| MappingError::SignatureInvalid {
                id: self.pack.id.clone(),
            })
    }

    /// Parse a signed pack from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ParseError`] if `content` is not valid
    /// JSON or does not match the signed-pack schema.
    pub fn parse(content: &str) -> Result<Self, MappingError> {
        serde_json::from_str(content).map_err(|e| MappingError::ParseError {
            path: "<signed pack>".into(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchPredicate;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn sample_pack() -> SignedPack {
        SignedPack {
            pack: PackMetadata {
                id: "demo-pack".into(),
                version: "1.0.0".into(),
                issued_at: "2026-01-01T00:00:00Z".into(),
            },
            mappings: vec![MappingRule {
                id: "m1".into(),
                name: None,
                source: None,
                priority: 0,
                match_predicate: MatchPredicate {
                    all_of: vec!["findings".into()],
                    any_of: vec![],
                },
                metadata: Default::default(),
                controls: None,
                passthrough: Some(crate::rule::PassthroughSpec {
                    paths: std::collections::BTreeMap::from([(
                        "note".into(),
                        "note".into(),
                    )]),
                }),
            }],
            signature: String::new(),
        }
    }

    #[test]
    fn signed_pack_roundtrips_through_valid_signature() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let mut pack = sample_pack();
        let payload = pack.signing_payload().unwrap();
        let sig = signing_key.sign(payload.as_bytes());
        pack.signature =
            base64::engine::general_purpose::STANDARD.encode(sig.to_bytes());

        assert!(pack.verify(&signing_key.verifying_key()).is_ok());
    }

    #[test]
    fn tampered_pack_fails_verification() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let mut pack = sample_pack();
        let payload = pack.signing_payload().unwrap();
        let sig = signing_key.sign(payload.as_bytes());
        pack.signature =
            base64::engine::general_purpose::STANDARD.encode(sig.to_bytes());

        pack.pack.version = "2.0.0".into();
        assert!(pack.verify(&signing_key.verifying_key()).is_err());
    }
}
