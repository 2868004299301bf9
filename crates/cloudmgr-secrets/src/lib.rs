//! Cloudmgr Secrets - Encryption at rest for cloud credentials
//!
//! Secrets of owning accounts and provider registrations are stored as
//! base64 encoded `nonce || ciphertext || tag` produced with AES-256-GCM.
//! Each ciphertext is bound to a key context (the provider registration
//! id): the cipher key is `SHA-256(master_key || key_context)`, so a secret
//! copied onto another registration fails to decrypt.
//!
//! The 32-byte master key lives in a file created on first use with
//! owner-only permissions.

use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose, Engine as _};
use cloudmgr_core::ports::ISecretStore;
use sha2::{Digest, Sha256};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Errors raised by the secret store
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to access key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid master key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Ciphertext too short")]
    Truncated,

    #[error("Encryption failed")]
    Encrypt,

    #[error("Authentication failed (wrong key or key context)")]
    Authentication,

    #[error("Decrypted secret is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// AES-256-GCM implementation of [`ISecretStore`]
pub struct AesSecretStore {
    master_key: [u8; KEY_LEN],
}

impl AesSecretStore {
    /// Creates a store from raw master key bytes
    pub fn from_key(key: &[u8]) -> Result<Self, SecretError> {
        let master_key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| SecretError::InvalidKeyLength(key.len()))?;
        Ok(Self { master_key })
    }

    /// Loads the master key from `key_path`, generating it on first use
    pub fn load_or_create(key_path: &Path) -> Result<Self, SecretError> {
        let io_err = |source| SecretError::KeyFile {
            path: key_path.display().to_string(),
            source,
        };

        if key_path.exists() {
            let bytes = std::fs::read(key_path).map_err(io_err)?;
            return Self::from_key(&bytes);
        }

        if let Some(parent) = key_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let key = Aes256Gcm::generate_key(OsRng);
        std::fs::write(key_path, key.as_slice()).map_err(io_err)?;
        #[cfg(unix)]
        std::fs::set_permissions(key_path, std::fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
        tracing::info!(path = %key_path.display(), "Generated new secret master key");

        Self::from_key(key.as_slice())
    }

    fn cipher(&self, key_context: &str) -> Aes256Gcm {
        let mut hasher = Sha256::new();
        hasher.update(self.master_key);
        hasher.update(key_context.as_bytes());
        Aes256Gcm::new(&hasher.finalize())
    }

    /// Encrypts `plaintext` for `key_context`
    pub fn seal(&self, key_context: &str, plaintext: &str) -> Result<String, SecretError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher(key_context)
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| SecretError::Encrypt)?;

        let mut out = nonce.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(out))
    }

    /// Decrypts a value produced by [`seal`](Self::seal) for the same context
    pub fn open(&self, key_context: &str, encoded: &str) -> Result<String, SecretError> {
        let data = general_purpose::STANDARD.decode(encoded.trim())?;
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(SecretError::Truncated);
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher(key_context)
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::Authentication)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

impl ISecretStore for AesSecretStore {
    fn decrypt(&self, key_context: &str, ciphertext: &str) -> anyhow::Result<String> {
        Ok(self.open(key_context, ciphertext)?)
    }

    fn encrypt(&self, key_context: &str, plaintext: &str) -> anyhow::Result<String> {
        Ok(self.seal(key_context, plaintext)?)
    }
}
