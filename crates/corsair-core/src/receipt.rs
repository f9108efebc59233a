// SPDX-License-Identifier: MIT OR Apache-2.0
//! Receipt data shapes shared across the Receipt Chain and CPOE Generator.
//!
//! Chain construction, hashing, and verification live in `corsair-receipt`;
//! this module only defines the wire shape so every crate that needs to
//! read or embed a receipt can do so without depending on the chain logic.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One pipeline step tracked by the Receipt Chain.
///
/// Declaration order is significant: derived [`Ord`] matches the pipeline's
/// required sequence (`Ingest -> Classify -> Chart -> Marque`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Evidence ingestion (Mapping Registry + Ingestion Mapper).
    Ingest,
    /// Assurance classification (Assurance Calculator + Framework Resolver).
    Classify,
    /// Receipt/diagram assembly ahead of signing.
    Chart,
    /// Final CPOE ("marque") signing.
    Marque,
}

/// Attestation carried by a non-deterministic step (e.g. LLM extraction).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LlmAttestation {
    /// Model identifier used to produce the step's output.
    pub model: String,
    /// SHA-256 digest of the exact prompt used.
    pub prompt_digest: String,
    /// Sampling temperature used, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// One entry in the Receipt Chain.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Receipt {
    /// Which pipeline step produced this receipt.
    pub step: Step,
    /// SHA-256 hex digest of the canonical input.
    pub input_digest: String,
    /// SHA-256 hex digest of the canonical output.
    pub output_digest: String,
    /// Whether the step is byte-for-byte reproducible from its input.
    pub reproducible: bool,
    /// Present (and required) iff `reproducible == true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_version: Option<String>,
    /// Present (and required) iff `reproducible == false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_attestation: Option<LlmAttestation>,
    /// Digest of the chain's previous receipt; `None` for the first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_digest: Option<String>,
    /// SHA-256 hex digest over this receipt's own canonical form (with this
    /// field itself forced to `null` before hashing). Filled in by
    /// [`corsair_receipt`]'s builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_digest: Option<String>,
    /// Stable identifier for a transparency-log entry backing this receipt,
    /// if one has been registered (required for the `require-scitt`
    /// verifier policy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency_entry_id: Option<String>,
}

/// A receipt claims `reproducible` but is missing `code_version`, or claims
/// non-reproducible but is missing `llm_attestation`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("receipt attestation is inconsistent with reproducible={reproducible}")]
pub struct AttestationMismatch {
    /// The receipt's `reproducible` flag.
    pub reproducible: bool,
}

impl Receipt {
    /// Enforce the attestation invariant: `reproducible` steps must carry
    /// `code_version`; non-reproducible steps must carry `llm_attestation`.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationMismatch`] if the invariant is violated.
    pub fn validate_attestation(&self) -> Result<(), AttestationMismatch> {
        let ok = if self.reproducible {
            self.code_version.is_some() && self.llm_attestation.is_none()
        } else {
            self.llm_attestation.is_some() && self.code_version.is_none()
        };
        if ok {
            Ok(())
        } else {
            Err(AttestationMismatch {
                reproducible: self.reproducible,
            })
        }
    }
}
