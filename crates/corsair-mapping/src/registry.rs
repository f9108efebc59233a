// SPDX-License-Identifier: MIT OR Apache-2.0
//! The load-once, read-many mapping registry.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::extract::{self, ExtractOutcome};
use crate::matcher;
use crate::rule::{MappingError, MappingRule};
use crate::signed::SignedPack;

/// The built-in fallback mapping, applied when no loaded mapping matches.
fn generic_rule() -> MappingRule {
    MappingRule {
        id: "generic".into(),
        name: Some("Generic fallback".into()),
        source: Some("generic".into()),
        priority: i64::MIN,
        match_predicate: crate::rule::MatchPredicate {
            all_of: vec![],
            any_of: vec![],
        },
        metadata: Default::default(),
        controls: Some(crate::rule::ControlsSpec {
            path: "controls".into(),
            id_path: Some("id".into()),
            description_path: Some("description".into()),
            status_path: Some("status".into()),
            status_map: None,
            severity_path: Some("severity".into()),
            severity_map: None,
            evidence_path: Some("evidence".into()),
            framework_refs: None,
        }),
        passthrough: None,
    }
}

/// A load-once, explicitly-reloadable collection of mapping rules.
///
/// Mappings are kept sorted by descending priority, then by the
/// deterministic order in which they were loaded (mirroring file-name
/// order when loaded from disk), per the match algorithm's tie-break
/// rule. The generic fallback is always present and always sorts last.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    rules: Vec<MappingRule>,
}

impl MappingRegistry {
    /// An empty registry carrying only the generic fallback.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a single mapping, validating it first.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::SchemaInvalid`] if the mapping fails
    /// validation. The registry is left unchanged on error.
    pub fn add(&mut self, rule: MappingRule) -> Result<(), MappingError> {
        rule.validate()?;
        self.rules.push(rule);
        self.resort();
        Ok(())
    }

    /// Load every `*.json` file in `dir` as a plain (unsigned) mapping. A
    /// parse error on one file does not block the others; failures are
    /// returned alongside the count of mappings successfully loaded.
    ///
    /// # Errors
    ///
    /// Never returns `Err` itself; per-file errors are collected into the
    /// returned vector.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<MappingError>, MappingError> {
        let mut errors = Vec::new();
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| MappingError::InvalidInput {
                reason: format!("cannot read directory {}: {e}", dir.display()),
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        for path in entries {
            match self.load_file(&path) {
                Ok(()) => {}
                Err(e) => errors.push(e),
            }
        }
        Ok(errors)
    }

    /// Load a single mapping file. Detects a signed pack by the presence
    /// of a top-level `pack` key; a signed pack's signature is **not**
    /// verified here — call [`MappingRegistry::load_signed_file`] when a
    /// verifying key is available.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::ParseError`] if the file cannot be read or
    /// parsed, or [`MappingError::SchemaInvalid`] if the mapping fails
    /// validation.
    pub fn load_file(&mut self, path: &Path) -> Result<(), MappingError> {
        let content = std::fs::read_to_string(path).map_err(|e| MappingError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| MappingError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if value.get("pack").is_some() {
            let pack = SignedPack::parse(&content)?;
            for rule in pack.mappings {
                self.add(rule)?;
            }
            return Ok(());
        }
        let rule: MappingRule =
            serde_json::from_value(value).map_err(|e| MappingError::ParseError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.add(rule)
    }

    /// Load a signed pack file, verifying its signature before admitting
    /// any of its mappings.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::SignatureInvalid`] if verification fails,
    /// or the same parse/schema errors as [`MappingRegistry::load_file`].
    pub fn load_signed_file(
        &mut self,
        path: &Path,
        verifying_key: &ed25519_dalek::VerifyingKey,
    ) -> Result<(), MappingError> {
        let content = std::fs::read_to_string(path).map_err(|e| MappingError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let pack = SignedPack::parse(&content)?;
        pack.verify(verifying_key)?;
        for rule in pack.mappings {
            self.add(rule)?;
        }
        Ok(())
    }

    /// Load every path named in a comma-separated directory list
    /// (`CORSAIR_MAPPING_DIR`-style) and a comma-separated file list
    /// (`CORSAIR_MAPPING_FILE`-style), in that order, after any mappings
    /// already present. Mirrors the loading order from the design: built-in
    /// defaults, then directory list, then file list, then explicit
    /// `--mapping` arguments (the caller applies those last via
    /// [`MappingRegistry::add`]/[`MappingRegistry::load_file`]).
    ///
    /// # Errors
    ///
    /// Never returns `Err` itself; per-file and per-directory errors are
    /// collected into the returned vector.
    pub fn load_from_env_lists(
        &mut self,
        dirs: &[String],
        files: &[String],
    ) -> Result<Vec<MappingError>, MappingError> {
        let mut errors = Vec::new();
        for dir in dirs {
            match self.load_dir(Path::new(dir)) {
                Ok(mut e) => errors.append(&mut e),
                Err(e) => errors.push(e),
            }
        }
        for file in files {
            if let Err(e) = self.load_file(Path::new(file)) {
                errors.push(e);
            }
        }
        Ok(errors)
    }

    /// Number of explicitly-loaded mappings (excludes the generic
    /// fallback, which is not stored in the registry but applied at
    /// extraction time).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no mappings have been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Select the best-matching rule for `input`, falling back to the
    /// generic mapping if nothing matches.
    #[must_use]
    pub fn select(&self, input: &Value) -> MappingRule {
        matcher::select_best(&self.rules, input)
            .cloned()
            .unwrap_or_else(generic_rule)
    }

    /// Select a rule for `input` and apply it, producing an
    /// [`ExtractOutcome`].
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidInput`] if the matched mapping's
    /// metadata extraction fails (e.g. an unparseable date).
    pub fn ingest(&self, input: &Value) -> Result<(MappingRule, ExtractOutcome), MappingError> {
        let rule = self.select(input);
        let outcome = extract::apply(&rule, input)?;
        Ok((rule, outcome))
    }

    fn resort(&mut self) {
        // Stable sort: descending priority; ties keep insertion (i.e.
        // deterministic load) order.
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchPredicate;
    use serde_json::json;

    fn mapping(id: &str, priority: i64) -> MappingRule {
        MappingRule {
            id: id.into(),
            name: None,
            source: Some("tool".into()),
            priority,
            match_predicate: MatchPredicate {
                all_of: vec!["findings".into()],
                any_of: vec![],
            },
            metadata: Default::default(),
            controls: Some(crate::rule::ControlsSpec {
                path: "findings".into(),
                id_path: Some("id".into()),
                description_path: None,
                status_path: None,
                status_map: None,
                severity_path: None,
                severity_map: None,
                evidence_path: None,
                framework_refs: None,
            }),
            passthrough: None,
        }
    }

    #[test]
    fn higher_priority_mapping_wins() {
        let mut reg = MappingRegistry::new();
        reg.add(mapping("low", 10)).unwrap();
        reg.add(mapping("high", 20)).unwrap();
        let selected = reg.select(&json!({"findings": []}));
        assert_eq!(selected.id, "high");
    }

    #[test]
    fn falls_back_to_generic_when_nothing_matches() {
        let reg = MappingRegistry::new();
        let selected = reg.select(&json!({"unrelated": true}));
        assert_eq!(selected.id, "generic");
    }

    #[test]
    fn invalid_mapping_is_rejected_and_not_stored() {
        let mut reg = MappingRegistry::new();
        let mut bad = mapping("bad", 0);
        bad.match_predicate = MatchPredicate::default();
        assert!(reg.add(bad).is_err());
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn load_dir_skips_unparseable_files_but_loads_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a-good.json"), serde_json::to_string(&mapping("a", 5)).unwrap()).unwrap();
        std::fs::write(dir.path().join("b-bad.json"), "{ not json").unwrap();
        let mut reg = MappingRegistry::new();
        let errors = reg.load_dir(dir.path()).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(reg.len(), 1);
    }
}
