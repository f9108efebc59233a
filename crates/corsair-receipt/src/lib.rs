// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Receipt canonicalization, hashing, chain verification, and diffing.
//!
//! Canonical JSON serialization, SHA-256 hashing, a hash-linked chain, a
//! fluent receipt builder, and field-level diffing for Corsair's process
//! receipts — the per-step audit trail that makes the pipeline reproducible
//! or attested.

mod builder;
mod chain;
mod diff;

pub use builder::ReceiptBuilder;
pub use chain::{ChainError, ReceiptChain};
pub use diff::{FieldDiff, ReceiptDiff, diff_receipts};

pub use corsair_core::{LlmAttestation, Receipt, Step};

use corsair_error::CorsairError;

/// Produce the canonical JSON representation of a receipt.
///
/// `receipt_digest` is forced to `null` before serialization so the digest
/// is never self-referential.
///
/// # Errors
///
/// Returns [`CorsairError`] if the receipt cannot be serialized.
///
/// # Examples
///
/// ```
/// use corsair_receipt::{canonicalize, ReceiptBuilder};
/// use corsair_core::Step;
///
/// let r = ReceiptBuilder::new(Step::Ingest).reproducible("pipeline@1").build();
/// let json1 = canonicalize(&r).unwrap();
/// let json2 = canonicalize(&r).unwrap();
/// assert_eq!(json1, json2);
/// ```
pub fn canonicalize(receipt: &Receipt) -> Result<String, CorsairError> {
    let mut v = serde_json::to_value(receipt)?;
    if let serde_json::Value::Object(map) = &mut v {
        map.insert("receipt_digest".to_string(), serde_json::Value::Null);
    }
    Ok(serde_json::to_string(&v)?)
}

/// Compute the hex-encoded SHA-256 hash of the canonical receipt form.
///
/// # Errors
///
/// Returns [`CorsairError`] if the receipt cannot be serialized.
///
/// # Examples
///
/// ```
/// use corsair_receipt::{compute_hash, ReceiptBuilder};
/// use corsair_core::Step;
///
/// let r = ReceiptBuilder::new(Step::Ingest).reproducible("pipeline@1").build();
/// let h = compute_hash(&r).unwrap();
/// assert_eq!(h.len(), 64); // SHA-256 hex
/// ```
pub fn compute_hash(receipt: &Receipt) -> Result<String, CorsairError> {
    let json = canonicalize(receipt)?;
    Ok(corsair_core::sha256_hex(json.as_bytes()))
}

/// Verify that a receipt's stored `receipt_digest` matches the recomputed
/// hash.
///
/// Returns `true` if the stored digest matches the recomputed one, or if
/// there is no stored digest. Returns `false` on mismatch or serialization
/// failure.
///
/// # Examples
///
/// ```
/// use corsair_receipt::{verify_hash, compute_hash, ReceiptBuilder};
/// use corsair_core::Step;
///
/// let mut r = ReceiptBuilder::new(Step::Ingest).reproducible("pipeline@1").build();
/// r.receipt_digest = Some(compute_hash(&r).unwrap());
/// assert!(verify_hash(&r));
///
/// r.receipt_digest = Some("tampered".into());
/// assert!(!verify_hash(&r));
/// ```
#[must_use]
pub fn verify_hash(receipt: &Receipt) -> bool {
    match &receipt.receipt_digest {
        None => true,
        Some(stored) => match compute_hash(receipt) {
            Ok(recomputed) => *stored == recomputed,
            Err(_) => false,
        },
    }
}

/// SHA-256 hex digest over the canonical array of all receipts in `chain`,
/// in order. This is the "chain digest" embedded in the final marque
/// receipt and, from there, into the signed CPOE payload.
///
/// # Errors
///
/// Returns [`CorsairError`] if any receipt cannot be serialized.
pub fn chain_digest(receipts: &[Receipt]) -> Result<String, CorsairError> {
    let v = serde_json::to_value(receipts)?;
    let json = serde_json::to_string(&v)?;
    Ok(corsair_core::sha256_hex(json.as_bytes()))
}
