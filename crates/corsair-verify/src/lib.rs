// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Verifier: format detection, key resolution (explicit key, `kid`,
//! or issuer DID via SSRF-guarded `did:web` resolution), Ed25519 signature
//! verification, the temporal check, and policy acceptance.

/// DID:web resolution.
pub mod resolve;
/// The SSRF guard shared by every outbound resolution in this crate.
pub mod ssrf;
mod verify;

pub use verify::{IssuerTier, Verdict, VerificationOutcome, VerifyOptions, derive_issuer_tier, verify_cpoe};
