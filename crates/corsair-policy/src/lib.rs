// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The policy-predicate acceptance engine evaluated as the final step of
//! CPOE verification.

mod engine;
mod predicate;

pub use engine::{Decision, PolicyEngine, PolicyInput};
pub use predicate::{PolicyPredicate, PredicateParseError};
