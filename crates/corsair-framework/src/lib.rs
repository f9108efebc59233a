// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Framework Resolver: translates per-control framework references
//! and MITRE ATT&CK techniques into a cross-framework control table.
//!
//! Three tiers, tried in order, first entry wins within a tier and the
//! earlier tier always wins over a later one:
//!
//! 1. **Plugin manifest** mappings declared by the evidence provider.
//! 2. **Data-driven** mappings via two JSON tables — `technique -> NIST
//!    800-53 controls` and `NIST 800-53 -> each framework` — with
//!    NIST-800-53 as the hub, so `technique -> framework x controls` is
//!    pre-computed once per resolver instance.
//! 3. **Legacy hardcoded** fallback, narrow, for the earliest shipped
//!    families only.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use corsair_core::FrameworkCoverage;

/// Which tier produced a given resolution, for tracing/debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionTier {
    /// Resolved from a provider-declared plugin manifest.
    PluginManifest,
    /// Resolved via the NIST-800-53 hub tables.
    DataDriven,
    /// Resolved via the legacy hardcoded fallback map.
    LegacyHardcoded,
}

/// A single resolved `(framework, control_id)` pair plus its tier.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    /// Target framework name.
    pub framework: String,
    /// The framework's own control identifier.
    pub control_id: String,
    /// Which tier produced this resolution.
    pub tier: ResolutionTier,
}

/// Errors raised while building or querying a [`FrameworkResolver`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// A data table could not be parsed.
    #[error("failed to parse framework table: {reason}")]
    TableInvalid {
        /// Parse failure detail.
        reason: String,
    },
}

/// A provider-declared plugin manifest: direct `technique -> [(framework,
/// control_id)]` mappings that take priority over the data-driven tables.
pub type PluginManifest = BTreeMap<String, Vec<(String, String)>>;

/// `technique -> NIST-800-53 control ids`.
pub type TechniqueToNist = BTreeMap<String, Vec<String>>;

/// `NIST-800-53 control id -> {framework -> control id}`.
pub type NistToFrameworks = BTreeMap<String, BTreeMap<String, String>>;

/// A narrow, hardcoded `technique -> [(framework, control_id)]` map for
/// the earliest shipped evidence families, consulted only when the first
/// two tiers have nothing.
pub type LegacyMap = BTreeMap<String, Vec<(String, String)>>;

/// Resolves MITRE ATT&CK techniques (and, via the plugin tier, arbitrary
/// provider-declared identifiers) into a cross-framework control table.
///
/// The data-driven tier's `technique -> framework x controls` join is
/// pre-computed once at construction time so repeated resolutions are a
/// single `BTreeMap` lookup.
#[derive(Debug, Clone, Default)]
pub struct FrameworkResolver {
    plugin_manifest: PluginManifest,
    precomputed: BTreeMap<String, Vec<(String, String)>>,
    legacy: LegacyMap,
}

impl FrameworkResolver {
    /// Build a resolver from its three tiers of source data. The
    /// `technique -> framework x controls` join for the data-driven tier
    /// is computed here, once.
    #[must_use]
    pub fn new(
        plugin_manifest: PluginManifest,
        technique_to_nist: &TechniqueToNist,
        nist_to_frameworks: &NistToFrameworks,
        legacy: LegacyMap,
    ) -> Self {
        let mut precomputed: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for (technique, nist_controls) in technique_to_nist {
            let mut resolved = Vec::new();
            for nist_control in nist_controls {
                if let Some(frameworks) = nist_to_frameworks.get(nist_control) {
                    for (framework, control_id) in frameworks {
                        resolved.push((framework.clone(), control_id.clone()));
                    }
                }
            }
            precomputed.insert(technique.clone(), resolved);
        }
        Self {
            plugin_manifest,
            precomputed,
            legacy,
        }
    }

    /// Resolve a single technique/identifier into every `(framework,
    /// control_id)` pair the first tier that has an entry yields. Tiers
    /// are tried in order; a later tier is never consulted once an
    /// earlier tier has any entries.
    #[must_use]
    pub fn resolve(&self, technique: &str) -> Vec<Resolution> {
        if let Some(pairs) = self.plugin_manifest.get(technique) {
            return to_resolutions(pairs, ResolutionTier::PluginManifest);
        }
        if let Some(pairs) = self.precomputed.get(technique) {
            if !pairs.is_empty() {
                return to_resolutions(pairs, ResolutionTier::DataDriven);
            }
        }
        if let Some(pairs) = self.legacy.get(technique) {
            return to_resolutions(pairs, ResolutionTier::LegacyHardcoded);
        }
        Vec::new()
    }

    /// Resolve every technique in `techniques`, folding the result into a
    /// per-framework coverage table. `passed`/`failed` on the returned
    /// entries are left at zero — pass/fail tallying belongs to whichever
    /// caller has the associated control's status; this method only
    /// establishes which controls map into which frameworks.
    #[must_use]
    pub fn resolve_all(&self, techniques: &[String]) -> BTreeMap<String, FrameworkCoverage> {
        let mut table: BTreeMap<String, FrameworkCoverage> = BTreeMap::new();
        for technique in techniques {
            for r in self.resolve(technique) {
                let entry = table.entry(r.framework).or_default();
                entry.controls_mapped += 1;
                entry.controls.push(r.control_id);
            }
        }
        table
    }
}

fn to_resolutions(pairs: &[(String, String)], tier: ResolutionTier) -> Vec<Resolution> {
    pairs
        .iter()
        .map(|(framework, control_id)| Resolution {
            framework: framework.clone(),
            control_id: control_id.clone(),
            tier,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with_all_tiers() -> FrameworkResolver {
        let plugin_manifest = PluginManifest::from([(
            "T1078".to_string(),
            vec![("PLUGIN-FW".to_string(), "P-1".to_string())],
        )]);
        let technique_to_nist = TechniqueToNist::from([
            ("T1078".to_string(), vec!["AC-2".to_string()]),
            ("T1110".to_string(), vec!["IA-5".to_string()]),
        ]);
        let nist_to_frameworks = NistToFrameworks::from([
            (
                "AC-2".to_string(),
                BTreeMap::from([("SOC2".to_string(), "CC6.1".to_string())]),
            ),
            (
                "IA-5".to_string(),
                BTreeMap::from([("ISO27001".to_string(), "A.9.4.3".to_string())]),
            ),
        ]);
        let legacy = LegacyMap::from([(
            "T9999".to_string(),
            vec![("LEGACY-FW".to_string(), "L-1".to_string())],
        )]);
        FrameworkResolver::new(plugin_manifest, &technique_to_nist, &nist_to_frameworks, legacy)
    }

    #[test]
    fn plugin_tier_wins_over_data_driven() {
        let resolver = resolver_with_all_tiers();
        let resolved = resolver.resolve("T1078");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].framework, "PLUGIN-FW");
        assert_eq!(resolved[0].tier, ResolutionTier::PluginManifest);
    }

    #[test]
    fn data_driven_tier_used_when_no_plugin_entry() {
        let resolver = resolver_with_all_tiers();
        let resolved = resolver.resolve("T1110");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].framework, "ISO27001");
        assert_eq!(resolved[0].tier, ResolutionTier::DataDriven);
    }

    #[test]
    fn legacy_tier_used_only_as_last_resort() {
        let resolver = resolver_with_all_tiers();
        let resolved = resolver.resolve("T9999");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].tier, ResolutionTier::LegacyHardcoded);
    }

    #[test]
    fn unknown_technique_resolves_to_nothing() {
        let resolver = resolver_with_all_tiers();
        assert!(resolver.resolve("T0000").is_empty());
    }
}
