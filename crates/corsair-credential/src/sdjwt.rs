// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selective disclosure (SD-JWT-flavoured) for designated
//! `credentialSubject` paths.

use base64::Engine as _;
use serde_json::Value;

use corsair_core::sha256_hex;

/// One disclosure: the salt and plaintext value removed from the payload
/// and replaced with a commitment hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    /// Dotted path within `credentialSubject` this disclosure covers.
    pub path: String,
    /// Random salt mixed into the commitment.
    pub salt: String,
    /// The original value, serialized as JSON.
    pub value: String,
}

impl Disclosure {
    /// The disclosure's wire form: `base64url(salt.path.value)`.
    #[must_use]
    pub fn encode(&self) -> String {
        let raw = format!("{}.{}.{}", self.salt, self.path, self.value);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw)
    }

    /// Recompute the commitment hash this disclosure resolves to.
    #[must_use]
    pub fn commitment(&self) -> String {
        sha256_hex(self.encode().as_bytes())
    }
}

/// Replace each path in `paths` under `subject` with a salted hash
/// commitment, returning the redacted subject and the disclosures removed
/// from it. `salts` supplies one salt per path, in order — callers
/// generate these randomly; tests pin fixed salts for determinism.
#[must_use]
pub fn redact(mut subject: Value, paths: &[String], salts: &[String]) -> (Value, Vec<Disclosure>) {
    let mut disclosures = Vec::new();
    for (path, salt) in paths.iter().zip(salts.iter()) {
        let Some(value) = take_path(&mut subject, path) else {
            continue;
        };
        let disclosure = Disclosure {
            path: path.clone(),
            salt: salt.clone(),
            value: serde_json::to_string(&value).unwrap_or_default(),
        };
        set_path(&mut subject, path, Value::String(format!("~sd:{}", disclosure.commitment())));
        disclosures.push(disclosure);
    }
    (subject, disclosures)
}

/// Verify that every disclosure's commitment matches the `~sd:<hash>`
/// placeholder left in `subject` at its path.
#[must_use]
pub fn verify_disclosures(subject: &Value, disclosures: &[Disclosure]) -> bool {
    disclosures.iter().all(|d| {
        let Some(Value::String(s)) = get_path(subject, &d.path) else {
            return false;
        };
        s == format!("~sd:{}", d.commitment())
    })
}

fn take_path(root: &mut Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments.split_last()?;
    let mut current = root;
    for seg in parents {
        current = current.as_object_mut()?.get_mut(*seg)?;
    }
    current.as_object_mut()?.remove(*last)
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for seg in parents {
        current = current
            .as_object_mut()
            .and_then(|m| m.get_mut(*seg))
            .unwrap_or(current);
    }
    if let Some(map) = current.as_object_mut() {
        map.insert((*last).to_string(), value);
    }
}

fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for seg in path.split('.') {
        current = current.as_object()?.get(seg)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redact_then_verify_round_trips() {
        let subject = json!({"scope": "prod account", "provenance": {"sourceIdentity": "Acme Audit"}});
        let (redacted, disclosures) = redact(
            subject,
            &["provenance.sourceIdentity".to_string()],
            &["saltvalue".to_string()],
        );
        assert_eq!(disclosures.len(), 1);
        assert!(verify_disclosures(&redacted, &disclosures));
        let committed = redacted["provenance"]["sourceIdentity"].as_str().unwrap();
        assert!(committed.starts_with("~sd:"));
    }

    #[test]
    fn tampered_disclosure_fails_verification() {
        let subject = json!({"scope": "prod account"});
        let (redacted, mut disclosures) =
            redact(subject, &["scope".to_string()], &["s1".to_string()]);
        disclosures[0].value = "\"tampered\"".to_string();
        assert!(!verify_disclosures(&redacted, &disclosures));
    }
}
