// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The CPOE Generator: JWT-VC composition, Ed25519 signing, receipt-chain
//! sealing, and optional SD-JWT selective disclosure.

mod envelope;
mod generator;
mod marque;
mod payload;
mod sdjwt;
mod sign;

pub use envelope::{JsonEnvelope, compact_to_envelope, envelope_to_compact};
pub use generator::{GeneratorInput, generate_subject};
pub use marque::seal_with_marque;
pub use payload::{Header, Issuer, Payload, VcObject};
pub use sdjwt::{Disclosure, redact, verify_disclosures};
pub use sign::{
    SignedCpoe, decode_jwt_header, decode_jwt_payload, decode_jwt_signature, sign_cpoe, signing_input,
};
