// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hash-linked, strictly-ordered receipt chain with integrity verification.

use std::fmt;

use corsair_core::Receipt;

/// Errors from receipt chain operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A receipt's stored digest does not match the recomputed digest.
    DigestMismatch {
        /// Index of the receipt with the mismatched digest.
        index: usize,
    },
    /// A receipt's `previous_digest` does not match the preceding receipt's
    /// `receipt_digest`.
    BrokenLink {
        /// Index of the receipt with the broken link.
        index: usize,
    },
    /// A receipt's step is not strictly after the previous receipt's step.
    OutOfOrder {
        /// Index of the out-of-order receipt.
        index: usize,
    },
    /// A receipt's `reproducible`/attestation fields are inconsistent.
    InconsistentAttestation {
        /// Index of the offending receipt.
        index: usize,
    },
    /// The chain is empty when a non-empty chain was expected.
    EmptyChain,
    /// An attempt was made to push onto a chain that has already been sealed.
    ChainSealed,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DigestMismatch { index } => write!(f, "digest mismatch at chain index {index}"),
            Self::BrokenLink { index } => write!(f, "broken link at chain index {index}"),
            Self::OutOfOrder { index } => write!(f, "out-of-order step at chain index {index}"),
            Self::InconsistentAttestation { index } => {
                write!(f, "inconsistent attestation at chain index {index}")
            }
            Self::EmptyChain => write!(f, "chain is empty"),
            Self::ChainSealed => write!(f, "chain is sealed; no further receipts may be appended"),
        }
    }
}

impl std::error::Error for ChainError {}

/// An ordered, hash-linked chain of [`Receipt`]s.
///
/// Each receipt pushed into the chain is validated for digest integrity,
/// link continuity, step ordering (`Ingest -> Classify -> Chart ->
/// Marque`), and attestation consistency. The chain is sealed — made
/// immutable — only on successful completion of the generating pipeline
/// run; a cancelled run never seals a partial chain.
///
/// # Examples
///
/// ```
/// use corsair_receipt::{ReceiptChain, ReceiptBuilder};
/// use corsair_core::Step;
///
/// let mut chain = ReceiptChain::new();
/// let r = ReceiptBuilder::new(Step::Ingest)
///     .reproducible("mapper@1")
///     .with_digest()
///     .unwrap();
/// chain.push(r).unwrap();
/// assert_eq!(chain.len(), 1);
/// assert!(chain.verify().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReceiptChain {
    receipts: Vec<Receipt>,
    sealed: bool,
}

impl ReceiptChain {
    /// Create an empty, unsealed receipt chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a receipt to the chain.
    ///
    /// # Errors
    ///
    /// - [`ChainError::ChainSealed`] if the chain was already sealed.
    /// - [`ChainError::DigestMismatch`] if the stored digest doesn't match.
    /// - [`ChainError::OutOfOrder`] if the step does not strictly follow
    ///   the previous receipt's step.
    /// - [`ChainError::BrokenLink`] if `previous_digest` doesn't match.
    /// - [`ChainError::InconsistentAttestation`] if the reproducibility
    ///   fields are inconsistent.
    pub fn push(&mut self, receipt: Receipt) -> Result<(), ChainError> {
        if self.sealed {
            return Err(ChainError::ChainSealed);
        }
        let index = self.receipts.len();

        verify_receipt_digest(&receipt, index)?;
        if receipt.validate_attestation().is_err() {
            return Err(ChainError::InconsistentAttestation { index });
        }

        if let Some(last) = self.receipts.last() {
            if receipt.step <= last.step {
                return Err(ChainError::OutOfOrder { index });
            }
            if receipt.previous_digest.as_deref() != last.receipt_digest.as_deref() {
                return Err(ChainError::BrokenLink { index });
            }
        } else if receipt.previous_digest.is_some() {
            return Err(ChainError::BrokenLink { index });
        }

        self.receipts.push(receipt);
        Ok(())
    }

    /// Seal the chain, preventing any further appends.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the chain has been sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Verify every digest, link, ordering, and attestation constraint in
    /// the chain from scratch.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, in chain order.
    pub fn verify(&self) -> Result<(), ChainError> {
        if self.receipts.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        for (i, receipt) in self.receipts.iter().enumerate() {
            verify_receipt_digest(receipt, i)?;
            if receipt.validate_attestation().is_err() {
                return Err(ChainError::InconsistentAttestation { index: i });
            }
            if i > 0 {
                let prev = &self.receipts[i - 1];
                if receipt.step <= prev.step {
                    return Err(ChainError::OutOfOrder { index: i });
                }
                if receipt.previous_digest.as_deref() != prev.receipt_digest.as_deref() {
                    return Err(ChainError::BrokenLink { index: i });
                }
            } else if receipt.previous_digest.is_some() {
                return Err(ChainError::BrokenLink { index: i });
            }
        }
        Ok(())
    }

    /// Number of receipts in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    /// Whether the chain contains no receipts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    /// The most recently pushed receipt, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&Receipt> {
        self.receipts.last()
    }

    /// Compute the chain digest over every receipt currently in the chain.
    ///
    /// # Errors
    ///
    /// Returns a [`corsair_error::CorsairError`] if a receipt cannot be
    /// serialized.
    pub fn digest(&self) -> Result<String, corsair_error::CorsairError> {
        crate::chain_digest(&self.receipts)
    }

    /// Iterate over the receipts in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Receipt> {
        self.receipts.iter()
    }

    /// Borrow the receipts as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Receipt] {
        &self.receipts
    }
}

impl<'a> IntoIterator for &'a ReceiptChain {
    type Item = &'a Receipt;
    type IntoIter = std::slice::Iter<'a, Receipt>;

    fn into_iter(self) -> Self::IntoIter {
        self.receipts.iter()
    }
}

fn verify_receipt_digest(receipt: &Receipt, index: usize) -> Result<(), ChainError> {
    if let Some(stored) = &receipt.receipt_digest {
        let recomputed =
            crate::compute_hash(receipt).map_err(|_| ChainError::DigestMismatch { index })?;
        if *stored != recomputed {
            return Err(ChainError::DigestMismatch { index });
        }
    }
    Ok(())
}
