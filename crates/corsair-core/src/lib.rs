// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable contract for Corsair.
//!
//! If you only take one dependency, take this one.

/// Assurance claim, provenance, dimensions, observation period, DORA
/// metrics, and risk quantification — everything the Assurance Calculator
/// derives.
pub mod assurance;
/// The signed credential subject and its framework coverage table.
pub mod credential;
/// The canonical ingested-document shape produced by the Mapping Registry.
pub mod ingestion;
/// Receipt data shapes shared across the Receipt Chain and CPOE Generator.
pub mod receipt;

pub use assurance::{
    AssuranceClaim, AssuranceLevel, CosoClassification, DoraBand, DoraMetrics, FairMapping,
    Method, ObservationPeriod, PertEstimate, Provenance, ProvenanceSource, RiskQuantification,
};
pub use credential::{ControlClassification, CredentialSubject, Dimensions, FrameworkCoverage, Summary};
pub use ingestion::{
    AssessmentContext, DocumentMetadata, FrameworkRef, IngestedControl, IngestedDocument,
    IngestionError, Severity, Status,
};
pub use receipt::{LlmAttestation, Receipt, Step};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Current protocol version string ("parley") embedded in every CPOE
/// payload.
///
/// # Examples
///
/// ```
/// assert_eq!(corsair_core::PARLEY_VERSION, "2.1");
/// ```
pub const PARLEY_VERSION: &str = "2.1";

/// The calculator rule-set version embedded in [`AssuranceClaim::calculation_version`].
pub const CALCULATION_VERSION: &str = "l0-l4@2026-02-09";

/// Produce a deterministic JSON string for hashing or chain linking.
///
/// Keys are sorted (`serde_json::Map` is a `BTreeMap` under the
/// `preserve_order`-disabled default used here) and arrays retain their
/// original order, matching the canonicalisation rule in the receipt
/// chain design: objects key-sorted at every level, arrays unchanged.
///
/// # Errors
///
/// Returns [`corsair_error::CorsairError`] if `value` cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, corsair_error::CorsairError> {
    let v = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&v)?)
}

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Canonicalize `value` and return its hex-encoded SHA-256 digest in one
/// step.
///
/// # Errors
///
/// Returns [`corsair_error::CorsairError`] if `value` cannot be serialized.
pub fn digest_of<T: Serialize>(value: &T) -> Result<String, corsair_error::CorsairError> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}
