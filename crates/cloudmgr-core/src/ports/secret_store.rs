//! Secret store port
//!
//! Secrets are stored encrypted; the key context binds a ciphertext to the
//! record it belongs to, so a secret copied onto another record does not
//! decrypt. Both operations are CPU-bound and therefore synchronous.

/// Port trait for secret encryption at rest
pub trait ISecretStore: Send + Sync {
    /// Decrypts `ciphertext` under `key_context`
    ///
    /// # Errors
    /// Fails if the ciphertext is malformed or was sealed under another key
    fn decrypt(&self, key_context: &str, ciphertext: &str) -> anyhow::Result<String>;

    /// Encrypts `plaintext` under `key_context`
    fn encrypt(&self, key_context: &str, plaintext: &str) -> anyhow::Result<String>;
}
