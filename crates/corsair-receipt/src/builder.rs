// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fluent construction of [`Receipt`]s.

use corsair_core::{LlmAttestation, Receipt, Step};
use corsair_error::CorsairError;

/// Builder for constructing [`Receipt`]s ergonomically.
///
/// # Examples
///
/// ```
/// use corsair_receipt::ReceiptBuilder;
/// use corsair_core::Step;
///
/// let r = ReceiptBuilder::new(Step::Ingest)
///     .input_digest("abc")
///     .output_digest("def")
///     .reproducible("mapper@2026-01")
///     .build();
///
/// assert_eq!(r.step, Step::Ingest);
/// assert!(r.reproducible);
/// assert_eq!(r.code_version.as_deref(), Some("mapper@2026-01"));
/// ```
#[derive(Debug)]
pub struct ReceiptBuilder {
    step: Step,
    input_digest: String,
    output_digest: String,
    reproducible: bool,
    code_version: Option<String>,
    llm_attestation: Option<LlmAttestation>,
    previous_digest: Option<String>,
    transparency_entry_id: Option<String>,
}

impl ReceiptBuilder {
    /// Create a new builder for the given pipeline step.
    #[must_use]
    pub fn new(step: Step) -> Self {
        Self {
            step,
            input_digest: String::new(),
            output_digest: String::new(),
            reproducible: false,
            code_version: None,
            llm_attestation: None,
            previous_digest: None,
            transparency_entry_id: None,
        }
    }

    /// Set the input digest.
    #[must_use]
    pub fn input_digest(mut self, digest: impl Into<String>) -> Self {
        self.input_digest = digest.into();
        self
    }

    /// Set the output digest.
    #[must_use]
    pub fn output_digest(mut self, digest: impl Into<String>) -> Self {
        self.output_digest = digest.into();
        self
    }

    /// Mark this step as reproducible and attach the code version that
    /// produced it.
    #[must_use]
    pub fn reproducible(mut self, code_version: impl Into<String>) -> Self {
        self.reproducible = true;
        self.code_version = Some(code_version.into());
        self.llm_attestation = None;
        self
    }

    /// Mark this step as non-reproducible and attach its LLM attestation.
    #[must_use]
    pub fn non_reproducible(mut self, attestation: LlmAttestation) -> Self {
        self.reproducible = false;
        self.llm_attestation = Some(attestation);
        self.code_version = None;
        self
    }

    /// Link this receipt to the digest of the previous receipt in the chain.
    #[must_use]
    pub fn previous_digest(mut self, digest: impl Into<String>) -> Self {
        self.previous_digest = Some(digest.into());
        self
    }

    /// Link this receipt to a previously-built receipt, using its
    /// `receipt_digest` if present.
    #[must_use]
    pub fn previous(mut self, receipt: &Receipt) -> Self {
        self.previous_digest = receipt.receipt_digest.clone();
        self
    }

    /// Attach a transparency-log entry id to this receipt.
    #[must_use]
    pub fn transparency_entry_id(mut self, id: impl Into<String>) -> Self {
        self.transparency_entry_id = Some(id.into());
        self
    }

    /// Consume the builder and produce a [`Receipt`] with no digest set.
    #[must_use]
    pub fn build(self) -> Receipt {
        Receipt {
            step: self.step,
            input_digest: self.input_digest,
            output_digest: self.output_digest,
            reproducible: self.reproducible,
            code_version: self.code_version,
            llm_attestation: self.llm_attestation,
            previous_digest: self.previous_digest,
            receipt_digest: None,
            transparency_entry_id: self.transparency_entry_id,
        }
    }

    /// Build the receipt and compute its digest in one step.
    ///
    /// # Errors
    ///
    /// Returns [`CorsairError`] if the receipt cannot be serialized.
    pub fn with_digest(self) -> Result<Receipt, CorsairError> {
        let mut r = self.build();
        r.receipt_digest = Some(crate::compute_hash(&r)?);
        Ok(r)
    }
}
