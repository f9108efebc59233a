// SPDX-License-Identifier: MIT OR Apache-2.0
//! Minimal JSONPath-like dotted path resolution used by mapping rules.
//!
//! Paths are dot-separated segments; a purely numeric segment indexes into
//! an array. `"provenance.source"` and `"controls.0.id"` are both valid.

use serde_json::Value;

/// Resolve a dotted path against `root`, returning `None` if any segment
/// is absent or of the wrong shape.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use corsair_mapping::path::resolve;
///
/// let v = json!({"a": {"b": [1, 2, 3]}});
/// assert_eq!(resolve(&v, "a.b.1"), Some(json!(2)));
/// assert_eq!(resolve(&v, "a.missing"), None);
/// ```
#[must_use]
pub fn resolve(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        if let Ok(index) = segment.parse::<usize>() {
            current = current.as_array()?.get(index)?;
        } else {
            current = current.as_object()?.get(segment)?;
        }
    }
    Some(current.clone())
}

/// Whether `path` resolves to a present (non-null) value in `root`.
#[must_use]
pub fn is_present(root: &Value, path: &str) -> bool {
    !matches!(resolve(root, path), None | Some(Value::Null))
}

/// Resolve `path` as a string, if it resolves to a JSON string.
#[must_use]
pub fn resolve_str(root: &Value, path: &str) -> Option<String> {
    resolve(root, path)?.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_object() {
        let v = json!({"provenance": {"source": "auditor"}});
        assert_eq!(resolve(&v, "provenance.source"), Some(json!("auditor")));
    }

    #[test]
    fn resolves_array_index() {
        let v = json!({"controls": [{"id": "AC-1"}, {"id": "AC-2"}]});
        assert_eq!(resolve(&v, "controls.1.id"), Some(json!("AC-2")));
    }

    #[test]
    fn missing_path_is_none() {
        let v = json!({"a": 1});
        assert_eq!(resolve(&v, "a.b.c"), None);
    }

    #[test]
    fn null_is_not_present() {
        let v = json!({"a": null});
        assert!(!is_present(&v, "a"));
        assert!(is_present(&v, "does.not.matter") == false);
    }
}
