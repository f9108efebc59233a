// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sealing a process-receipt chain into its final "marque" entry.

use corsair_core::{Receipt, Step};
use corsair_error::{CorsairError, ErrorCode};
use corsair_receipt::{ReceiptBuilder, ReceiptChain};

/// Compute the chain digest over `chain`'s receipts so far, append a
/// `Marque`-step receipt whose `input_digest` is that chain digest, and
/// seal the chain. The returned receipt list (including the new marque
/// entry) is what the CPOE Generator embeds in the signed payload.
///
/// `code_version` is the marque step's own reproducibility attestation —
/// signing is deterministic for a pinned `iat`, so the step is always
/// reproducible.
///
/// # Errors
///
/// Returns [`CorsairError`] if the prior receipts cannot be canonicalized
/// or the chain rejects the final append (e.g. it was already sealed, or
/// step ordering/link continuity was violated).
pub fn seal_with_marque(chain: &mut ReceiptChain, code_version: &str) -> Result<Vec<Receipt>, CorsairError> {
    let prior_digest = corsair_receipt::chain_digest(chain.as_slice())?;
    let output_digest = corsair_core::sha256_hex(prior_digest.as_bytes());

    let mut builder = ReceiptBuilder::new(Step::Marque)
        .input_digest(prior_digest)
        .output_digest(output_digest)
        .reproducible(code_version);
    if let Some(prev) = chain.latest() {
        builder = builder.previous(prev);
    }
    let marque_receipt = builder.with_digest()?;

    chain
        .push(marque_receipt)
        .map_err(|e| CorsairError::new(ErrorCode::ChainSealed, e.to_string()))?;
    chain.seal();

    Ok(chain.as_slice().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corsair_receipt::ReceiptBuilder;

    #[test]
    fn seal_with_marque_embeds_chain_digest_and_seals() {
        let mut chain = ReceiptChain::new();
        let ingest = ReceiptBuilder::new(Step::Ingest)
            .reproducible("ingest@1")
            .with_digest()
            .unwrap();
        chain.push(ingest.clone()).unwrap();
        let classify = ReceiptBuilder::new(Step::Classify)
            .reproducible("classify@1")
            .previous(&ingest)
            .with_digest()
            .unwrap();
        chain.push(classify).unwrap();

        let sealed = seal_with_marque(&mut chain, "cpoe-generator@1").unwrap();
        assert_eq!(sealed.len(), 3);
        assert_eq!(sealed.last().unwrap().step, Step::Marque);
        assert!(chain.is_sealed());

        let extra = ReceiptBuilder::new(Step::Ingest)
            .reproducible("x")
            .with_digest()
            .unwrap();
        assert!(chain.push(extra).is_err());
    }

    #[test]
    fn seal_with_marque_works_on_a_chain_of_one() {
        let mut chain = ReceiptChain::new();
        chain
            .push(
                ReceiptBuilder::new(Step::Ingest)
                    .reproducible("ingest@1")
                    .with_digest()
                    .unwrap(),
            )
            .unwrap();

        let sealed = seal_with_marque(&mut chain, "cpoe-generator@1").unwrap();
        assert_eq!(sealed.len(), 2);
        assert!(chain.verify().is_ok());
    }
}
