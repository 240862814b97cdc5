//! Encrypted Credential Store
//!
//! Persists a small map of service-name to secret, encrypted under a key
//! derived from a user password. On-disk layout:
//!
//! ```text
//! [16-byte salt][12-byte nonce][ChaCha20-Poly1305 ciphertext of JSON map]
//! ```
//!
//! The salt is written once per file and reused on every update, so the same
//! password keeps decrypting after more secrets are added. `save` fails
//! cleanly when the existing file cannot be decrypted - it never replaces
//! stored secrets with an empty map. `load` folds every failure, wrong
//! password included, into plain absence so callers cannot distinguish a
//! missing entry from a bad password.
//!
//! Not safe for concurrent writers; there is no file locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::keystore::{KDF_ITERATIONS, KEY_LEN, NONCE_LEN, SALT_LEN};
use crate::types::{DossierError, Result};

type SecretMap = BTreeMap<String, String>;

/// Derive a 32-byte key from a password and salt.
///
/// Iterated salted SHA-256: each round hashes the previous digest together
/// with the salt. Deterministic for identical inputs.
pub fn derive_key(password: &SecretString, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut digest = {
        let mut hasher = Sha256::new();
        hasher.update(password.expose_secret().as_bytes());
        hasher.update(salt);
        hasher.finalize()
    };

    for _ in 1..KDF_ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt);
        digest = hasher.finalize();
    }

    digest.into()
}

#[derive(Debug, Clone)]
pub struct EncryptedKeyStore {
    path: PathBuf,
}

impl EncryptedKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store one secret, merging with whatever the file already holds.
    ///
    /// Fails with `Credential` when the existing file does not decrypt under
    /// this password; the file is left untouched in that case.
    pub fn save(&self, service: &str, secret: &str, password: &SecretString) -> Result<()> {
        let (salt, mut map) = match self.read_file()? {
            Some((salt, nonce, ciphertext)) => {
                let key = derive_key(password, &salt);
                let map = decrypt_map(&key, &nonce, &ciphertext).ok_or_else(|| {
                    DossierError::Credential(
                        "existing credential store did not decrypt; wrong password or \
                         corrupted file, refusing to overwrite"
                            .to_string(),
                    )
                })?;
                (salt, map)
            }
            None => {
                let mut salt = vec![0u8; SALT_LEN];
                rand::rng().fill_bytes(&mut salt);
                (salt, SecretMap::new())
            }
        };

        map.insert(service.to_string(), secret.to_string());
        self.write_file(&salt, &map, password)?;
        debug!("Stored credential for {}", service);
        Ok(())
    }

    /// Fetch one secret. Any failure, wrong password included, reads as
    /// `None`.
    pub fn load(&self, service: &str, password: &SecretString) -> Option<String> {
        let (salt, nonce, ciphertext) = self.read_file().ok().flatten()?;
        let key = derive_key(password, &salt);
        let map = decrypt_map(&key, &nonce, &ciphertext)?;
        map.get(service).cloned()
    }

    /// Split the file into salt, nonce and ciphertext.
    ///
    /// `None` when the file does not exist; `CorruptStore` when it exists
    /// but is too short to contain the fixed-length prefixes.
    fn read_file(&self) -> Result<Option<(Vec<u8>, Vec<u8>, Vec<u8>)>> {
        let blob = match fs::read(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DossierError::Io(e)),
        };

        if blob.len() < SALT_LEN + NONCE_LEN {
            return Err(DossierError::CorruptStore(format!(
                "credential store truncated: {} bytes, need at least {}",
                blob.len(),
                SALT_LEN + NONCE_LEN
            )));
        }

        let salt = blob[..SALT_LEN].to_vec();
        let nonce = blob[SALT_LEN..SALT_LEN + NONCE_LEN].to_vec();
        let ciphertext = blob[SALT_LEN + NONCE_LEN..].to_vec();
        Ok(Some((salt, nonce, ciphertext)))
    }

    fn write_file(&self, salt: &[u8], map: &SecretMap, password: &SecretString) -> Result<()> {
        let key = derive_key(password, salt);
        let plaintext = serde_json::to_vec(map)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aead = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| DossierError::Credential(format!("cipher init failed: {}", e)))?;
        let ciphertext = aead
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| DossierError::Credential(format!("encryption failed: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        fs::write(&self.path, blob)?;
        Ok(())
    }
}

fn decrypt_map(key: &[u8; KEY_LEN], nonce: &[u8], ciphertext: &[u8]) -> Option<SecretMap> {
    let aead = ChaCha20Poly1305::new_from_slice(key).ok()?;
    let plaintext = aead.decrypt(Nonce::from_slice(nonce), ciphertext).ok()?;
    serde_json::from_slice(&plaintext).ok()
}
