//! Unified error taxonomy with stable error codes for Corsair.
//!
//! Every Corsair error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, and optional structured `detail`.
//! This is the taxonomy from the top-level error handling design: kinds are
//! categories, not Rust type names, so new codes can be added within a
//! category without breaking the category match.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
///
/// These are the taxonomy kinds from the error handling design: not Rust
/// type names, but categories a verifier or caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed JWT/JSON/PEM/base64url, or a missing required field.
    InputInvalid,
    /// Ed25519 verification failed, or `alg` did not match the expected value.
    SignatureInvalid,
    /// Parsed successfully but past `exp`.
    Expired,
    /// One or more policy predicates failed.
    PolicyViolation,
    /// DID resolution failed (SSRF-blocked host, non-200, malformed document).
    Unresolvable,
    /// Transient network error to a log or webhook target.
    Unreachable,
    /// Appending to a sealed receipt chain, or a non-idempotent re-registration.
    Conflict,
    /// A per-organisation delivery or registration quota was exceeded.
    CapacityExceeded,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InputInvalid => "input_invalid",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::PolicyViolation => "policy_violation",
            Self::Unresolvable => "unresolvable",
            Self::Unreachable => "unreachable",
            Self::Conflict => "conflict",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that should
/// not change across patch releases — callers match on this, not on the
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- InputInvalid --
    /// The JWT does not have three dot-separated base64url segments.
    InputMalformedJwt,
    /// A required field was missing from the decoded payload.
    InputMissingField,
    /// The mapping pack or policy artefact failed schema validation.
    InputInvalidMapping,
    /// The supplied PEM could not be parsed as an Ed25519 key.
    InputInvalidPem,

    // -- SignatureInvalid --
    /// The header's `alg` is not `EdDSA`.
    UnsupportedAlgorithm,
    /// Ed25519 signature verification returned false.
    BadSignature,

    // -- Expired --
    /// The credential's `exp` is not after `now`.
    CredentialExpired,

    // -- PolicyViolation --
    /// One or more named policy predicates were not satisfied.
    PolicyPredicateFailed,

    // -- Unresolvable --
    /// The DID method is not `did:web`.
    UnsupportedDidMethod,
    /// The resolved hostname is blocked by the SSRF guard.
    SsrfBlockedHost,
    /// The DID document could not be fetched or parsed.
    DidDocumentUnreachable,

    // -- Unreachable --
    /// A transport-level error occurred talking to a log or webhook endpoint.
    NetworkUnreachable,

    // -- Conflict --
    /// An append was attempted against a chain that is already sealed.
    ChainSealed,
    /// A duplicate registration was observed outside proof-only idempotence.
    DuplicateRegistration,

    // -- CapacityExceeded --
    /// The organisation's webhook or log-registration quota was exceeded.
    QuotaExceeded,

    // -- Internal --
    /// JSON (de)serialization failed unexpectedly.
    SerializationFailed,
    /// Filesystem I/O failed unexpectedly.
    IoFailed,
}

impl ErrorCode {
    /// The [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::InputMalformedJwt
            | Self::InputMissingField
            | Self::InputInvalidMapping
            | Self::InputInvalidPem => ErrorCategory::InputInvalid,
            Self::UnsupportedAlgorithm | Self::BadSignature => ErrorCategory::SignatureInvalid,
            Self::CredentialExpired => ErrorCategory::Expired,
            Self::PolicyPredicateFailed => ErrorCategory::PolicyViolation,
            Self::UnsupportedDidMethod | Self::SsrfBlockedHost | Self::DidDocumentUnreachable => {
                ErrorCategory::Unresolvable
            }
            Self::NetworkUnreachable => ErrorCategory::Unreachable,
            Self::ChainSealed | Self::DuplicateRegistration => ErrorCategory::Conflict,
            Self::QuotaExceeded => ErrorCategory::CapacityExceeded,
            Self::SerializationFailed | Self::IoFailed => ErrorCategory::Internal,
        }
    }
}

// ---------------------------------------------------------------------------
// CorsairError
// ---------------------------------------------------------------------------

/// The top-level error type surfaced at crate boundaries and by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct CorsairError {
    /// Stable, machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Arbitrary structured context (expected/observed values, paths, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl CorsairError {
    /// Construct an error with no additional detail.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured detail to this error.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// The category this error's code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Render as the `--json` wire shape: `{"ok": false, "error": {...}}`.
    #[must_use]
    pub fn to_json_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "ok": false,
            "error": {
                "kind": self.category().to_string(),
                "code": self.code,
                "message": self.message,
                "detail": self.detail,
            }
        })
    }
}

impl From<serde_json::Error> for CorsairError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationFailed, e.to_string())
    }
}

impl From<std::io::Error> for CorsairError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::IoFailed, e.to_string())
    }
}
