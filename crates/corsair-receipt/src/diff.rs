// SPDX-License-Identifier: MIT OR Apache-2.0
//! Field-level diffing of two [`Receipt`]s.

use corsair_core::Receipt;

/// A single field difference between two receipts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    /// Dot-separated field path (e.g. `"step"`, `"code_version"`).
    pub field: String,
    /// Serialized old value.
    pub old: String,
    /// Serialized new value.
    pub new: String,
}

/// The result of comparing two receipts field by field.
#[derive(Debug, Clone)]
pub struct ReceiptDiff {
    /// Individual field differences. Empty if the receipts are equivalent.
    pub changes: Vec<FieldDiff>,
}

impl ReceiptDiff {
    /// Returns `true` if there are no differences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of differing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Compare two receipts field by field and return all differences.
///
/// `receipt_digest` is intentionally excluded from the diff since it is a
/// derived value over every other field.
///
/// # Examples
///
/// ```
/// use corsair_receipt::{diff_receipts, ReceiptBuilder};
/// use corsair_core::Step;
///
/// let a = ReceiptBuilder::new(Step::Ingest).reproducible("mapper@1").build();
/// let mut b = a.clone();
/// b.output_digest = "changed".into();
///
/// let diff = diff_receipts(&a, &b);
/// assert!(!diff.is_empty());
/// assert!(diff.changes.iter().any(|d| d.field == "output_digest"));
/// ```
pub fn diff_receipts(a: &Receipt, b: &Receipt) -> ReceiptDiff {
    let mut changes = Vec::new();

    if a.step != b.step {
        changes.push(FieldDiff {
            field: "step".into(),
            old: format!("{:?}", a.step),
            new: format!("{:?}", b.step),
        });
    }

    if a.input_digest != b.input_digest {
        changes.push(FieldDiff {
            field: "input_digest".into(),
            old: a.input_digest.clone(),
            new: b.input_digest.clone(),
        });
    }

    if a.output_digest != b.output_digest {
        changes.push(FieldDiff {
            field: "output_digest".into(),
            old: a.output_digest.clone(),
            new: b.output_digest.clone(),
        });
    }

    if a.reproducible != b.reproducible {
        changes.push(FieldDiff {
            field: "reproducible".into(),
            old: a.reproducible.to_string(),
            new: b.reproducible.to_string(),
        });
    }

    if a.code_version != b.code_version {
        changes.push(FieldDiff {
            field: "code_version".into(),
            old: format!("{:?}", a.code_version),
            new: format!("{:?}", b.code_version),
        });
    }

    diff_json_field(&mut changes, "llm_attestation", &a.llm_attestation, &b.llm_attestation);

    if a.previous_digest != b.previous_digest {
        changes.push(FieldDiff {
            field: "previous_digest".into(),
            old: format!("{:?}", a.previous_digest),
            new: format!("{:?}", b.previous_digest),
        });
    }

    if a.transparency_entry_id != b.transparency_entry_id {
        changes.push(FieldDiff {
            field: "transparency_entry_id".into(),
            old: format!("{:?}", a.transparency_entry_id),
            new: format!("{:?}", b.transparency_entry_id),
        });
    }

    ReceiptDiff { changes }
}

fn diff_json_field<T: serde::Serialize>(changes: &mut Vec<FieldDiff>, name: &str, a: &T, b: &T) {
    let ja = serde_json::to_string(a).unwrap_or_default();
    let jb = serde_json::to_string(b).unwrap_or_default();
    if ja != jb {
        changes.push(FieldDiff {
            field: name.into(),
            old: ja,
            new: jb,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReceiptBuilder;
    use corsair_core::Step;

    #[test]
    fn identical_receipts_diff_empty() {
        let a = ReceiptBuilder::new(Step::Ingest)
            .reproducible("mapper@1")
            .build();
        let b = a.clone();
        assert!(diff_receipts(&a, &b).is_empty());
    }

    #[test]
    fn step_change_is_reported() {
        let a = ReceiptBuilder::new(Step::Ingest)
            .reproducible("mapper@1")
            .build();
        let mut b = a.clone();
        b.step = Step::Classify;
        let diff = diff_receipts(&a, &b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.changes[0].field, "step");
    }

    #[test]
    fn attestation_swap_is_reported() {
        use corsair_core::LlmAttestation;
        let a = ReceiptBuilder::new(Step::Ingest)
            .reproducible("mapper@1")
            .build();
        let b = ReceiptBuilder::new(Step::Ingest)
            .non_reproducible(LlmAttestation {
                model: "gpt".into(),
                prompt_digest: "abc".into(),
                temperature: None,
            })
            .build();
        let diff = diff_receipts(&a, &b);
        let fields: Vec<&str> = diff.changes.iter().map(|c| c.field.as_str()).collect();
        assert!(fields.contains(&"reproducible"));
        assert!(fields.contains(&"code_version"));
        assert!(fields.contains(&"llm_attestation"));
    }
}
