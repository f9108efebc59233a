// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Declarative, data-driven evidence mapping for Corsair.
//!
//! Adding support for a new evidence source is a data change — dropping a
//! JSON mapping file into a directory — not a code change. This crate
//! implements the mapping schema, the presence-predicate match algorithm,
//! signed mapping packs, and the extraction that turns a matched mapping
//! plus an arbitrary-shaped input document into an
//! [`corsair_core::IngestedDocument`].

/// Field extraction: turns a matched mapping plus an input document into
/// an [`corsair_core::IngestedDocument`].
pub mod extract;
/// The mapping match algorithm.
pub mod matcher;
/// Minimal JSONPath-like dotted path resolution.
pub mod path;
/// The load-once, read-many mapping registry.
pub mod registry;
/// Declarative mapping rule shapes.
pub mod rule;
/// Signed mapping pack parsing and verification.
pub mod signed;

pub use extract::ExtractOutcome;
pub use matcher::{matches, select_best};
pub use registry::MappingRegistry;
pub use rule::{
    ControlsSpec, FrameworkRefsSpec, MappingError, MappingRule, MatchPredicate, MetadataField,
    PassthroughSpec, SeverityMap, StatusMap,
};
pub use signed::{PackMetadata, SignedPack};
