// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Key Manager: file-backed Ed25519 keypair storage and DID:web
//! document generation.
//!
//! Key material is never written to logs. Every signing operation takes
//! a scoped lock on the keypair for the duration of signing, matching the
//! single-writer resource model.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const PRIVATE_KEY_FILE: &str = "ed25519.pem";
const PUBLIC_KEY_FILE: &str = "ed25519.pub";
const PEM_HEADER: &str = "-----BEGIN CORSAIR ED25519 PRIVATE KEY-----";
const PEM_FOOTER: &str = "-----END CORSAIR ED25519 PRIVATE KEY-----";

/// Errors raised by key loading, generation, or signing.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The key directory could not be created.
    #[error("failed to create key directory {path}: {source}")]
    DirCreate {
        /// Directory that failed to create.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The key file could not be read or written.
    #[error("key I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The stored key material was malformed.
    #[error("malformed key material at {path}: {reason}")]
    Malformed {
        /// Path of the malformed file.
        path: String,
        /// Why parsing failed.
        reason: String,
    },
}

/// The W3C-style DID document published at `/.well-known/did.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DidDocument {
    /// JSON-LD context entries.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// The DID itself (`did:web:<domain>`).
    pub id: String,
    /// Verification methods (exactly one: the issuer's signing key).
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,
    /// Key ids usable for credential assertions.
    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,
    /// Key ids usable for authentication.
    pub authentication: Vec<String>,
}

/// A single verification method entry within a [`DidDocument`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VerificationMethod {
    /// The method's own id (`<did>#key-1`).
    pub id: String,
    /// Key type, always `Ed25519VerificationKey2020` here.
    #[serde(rename = "type")]
    pub key_type: String,
    /// The controlling DID.
    pub controller: String,
    /// Base58btc-encoded (`z`-prefixed) raw public key.
    #[serde(rename = "publicKeyMultibase")]
    pub public_key_multibase: String,
}

/// Encode a raw Ed25519 public key as a base58btc multibase string with
/// the `z` prefix, per the DID document shape.
#[must_use]
pub fn encode_multibase(public_key: &VerifyingKey) -> String {
    format!("z{}", bs58::encode(public_key.as_bytes()).into_string())
}

/// Build the DID document for `domain` from `public_key`.
#[must_use]
pub fn did_document(domain: &str, public_key: &VerifyingKey) -> DidDocument {
    let did = format!("did:web:{domain}");
    let key_id = format!("{did}#key-1");
    DidDocument {
        context: vec![
            "https://www.w3.org/ns/did/v1".to_string(),
            "https://w3id.org/security/suites/ed25519-2020/v1".to_string(),
        ],
        id: did.clone(),
        verification_method: vec![VerificationMethod {
            id: key_id.clone(),
            key_type: "Ed25519VerificationKey2020".to_string(),
            controller: did,
            public_key_multibase: encode_multibase(public_key),
        }],
        assertion_method: vec![key_id.clone()],
        authentication: vec![key_id],
    }
}

/// Owns the issuer's Ed25519 keypair, loading it from disk on first use
/// and generating + persisting a new one if absent.
pub struct KeyManager {
    key_dir: PathBuf,
    signing_key: Mutex<SigningKey>,
}

impl KeyManager {
    /// Load the keypair from `key_dir`, generating and persisting a new
    /// one if the directory has none yet.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the directory cannot be created, the key
    /// file cannot be read/written, or the stored key material is
    /// malformed.
    pub fn load_or_generate(key_dir: &Path) -> Result<Self, KeyError> {
        std::fs::create_dir_all(key_dir).map_err(|source| KeyError::DirCreate {
            path: key_dir.display().to_string(),
            source,
        })?;

        let private_path = key_dir.join(PRIVATE_KEY_FILE);
        if private_path.exists() {
            let signing_key = load_private_key(&private_path)?;
            tracing::info!(path = %private_path.display(), "loaded existing issuer key");
            return Ok(Self {
                key_dir: key_dir.to_path_buf(),
                signing_key: Mutex::new(signing_key),
            });
        }

        let mut csprng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        persist_keypair(key_dir, &signing_key)?;
        tracing::info!(path = %key_dir.display(), "generated new issuer key");
        Ok(Self {
            key_dir: key_dir.to_path_buf(),
            signing_key: Mutex::new(signing_key),
        })
    }

    /// The directory this manager was loaded from.
    #[must_use]
    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// The issuer's public key.
    ///
    /// # Panics
    ///
    /// Panics only if the internal lock is poisoned by a prior panic
    /// while signing, which never happens in normal operation.
    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.lock().expect("key lock poisoned").verifying_key()
    }

    /// Sign `message`, taking the scoped lock for the duration of
    /// signing. Key material never leaves this function.
    ///
    /// # Panics
    ///
    /// Panics only if the internal lock is poisoned by a prior panic
    /// while signing, which never happens in normal operation.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        let key = self.signing_key.lock().expect("key lock poisoned");
        key.sign(message)
    }

    /// Verify a signature against this manager's own public key. Exposed
    /// for convenience; the Verifier reads signatures against an
    /// arbitrary resolved key, not necessarily this manager's.
    #[must_use]
    pub fn verify_self(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(message, signature).is_ok()
    }
}

fn load_private_key(path: &Path) -> Result<SigningKey, KeyError> {
    let content = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let b64 = content
        .lines()
        .filter(|l| !l.starts_with("-----"))
        .collect::<String>();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| KeyError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::Malformed {
            path: path.display().to_string(),
            reason: "expected a 32-byte Ed25519 seed".to_string(),
        })?;
    Ok(SigningKey::from_bytes(&seed))
}

fn persist_keypair(key_dir: &Path, signing_key: &SigningKey) -> Result<(), KeyError> {
    let private_path = key_dir.join(PRIVATE_KEY_FILE);
    let public_path = key_dir.join(PUBLIC_KEY_FILE);

    let b64_private = base64::engine::general_purpose::STANDARD.encode(signing_key.to_bytes());
    let pem = format!("{PEM_HEADER}\n{b64_private}\n{PEM_FOOTER}\n");
    std::fs::write(&private_path, pem).map_err(|source| KeyError::Io {
        path: private_path.display().to_string(),
        source,
    })?;
    set_owner_only_permissions(&private_path)?;

    let b64_public = base64::engine::general_purpose::STANDARD
        .encode(signing_key.verifying_key().to_bytes());
    std::fs::write(&public_path, format!("{b64_public}\n")).map_err(|source| KeyError::Io {
        path: public_path.display().to_string(),
        source,
    })?;

    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), KeyError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_reloads_the_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let mgr1 = KeyManager::load_or_generate(dir.path()).unwrap();
        let pub1 = mgr1.public_key();
        drop(mgr1);

        let mgr2 = KeyManager::load_or_generate(dir.path()).unwrap();
        assert_eq!(mgr2.public_key(), pub1);
    }

    #[test]
    fn private_key_file_is_owner_only_on_unix() {
        let dir = tempfile::tempdir().unwrap();
        let _mgr = KeyManager::load_or_generate(dir.path()).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let meta = std::fs::metadata(dir.path().join(PRIVATE_KEY_FILE)).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        }
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyManager::load_or_generate(dir.path()).unwrap();
        let sig = mgr.sign(b"hello corsair");
        assert!(mgr.verify_self(b"hello corsair", &sig));
        assert!(!mgr.verify_self(b"tampered", &sig));
    }

    #[test]
    fn did_document_has_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyManager::load_or_generate(dir.path()).unwrap();
        let doc = did_document("issuer.example.com", &mgr.public_key());
        assert_eq!(doc.id, "did:web:issuer.example.com");
        assert_eq!(doc.verification_method.len(), 1);
        assert!(doc.verification_method[0].public_key_multibase.starts_with('z'));
        assert_eq!(
            doc.assertion_method[0],
            "did:web:issuer.example.com#key-1"
        );
    }
}
