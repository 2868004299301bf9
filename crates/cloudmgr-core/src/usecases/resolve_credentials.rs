//! Credential resolution use case
//!
//! Derives the endpoint/login/secret triple a live connection needs from a
//! provider registration and its owning account.

use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{credential::compose_account, CloudProvider, Credential, ProviderError, Secret},
    ports::{IResourceRepository, ISecretStore},
};

/// Use case for resolving a registration's connection credentials
///
/// Read-only: the plaintext secret only ever lives in the returned
/// [`Credential`].
pub struct CredentialResolver {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
    secrets: Arc<dyn ISecretStore + Send + Sync>,
}

impl CredentialResolver {
    /// Creates a new CredentialResolver with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `repository` - Source of owning account records
    /// * `secrets` - Decrypts stored secrets
    pub fn new(
        repository: Arc<dyn IResourceRepository + Send + Sync>,
        secrets: Arc<dyn ISecretStore + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            secrets,
        }
    }

    /// Resolves the credential triple for `provider`
    ///
    /// This method:
    /// 1. Fetches the owning account
    /// 2. Decrypts its secret under the registration id
    /// 3. Composes the sub-account login when the registration carries its own
    ///
    /// Registrations without an owning account (migrated legacy records)
    /// resolve from their own endpoint, login and secret.
    ///
    /// # Errors
    ///
    /// - `ProviderError::NotFound` if the owning account does not exist
    /// - `ProviderError::Decryption` if the secret cannot be decrypted
    pub async fn resolve(&self, provider: &CloudProvider) -> Result<Credential, ProviderError> {
        let key_context = provider.id().to_string();

        let Some(account_id) = provider.cloud_account_id() else {
            debug!(provider_id = %provider.id(), "Resolving credentials from registration");
            let secret = self.decrypt(&key_context, provider.secret())?;
            return Ok(Credential {
                access_url: provider.access_url().map(str::to_string),
                account: provider.account().to_string(),
                secret,
            });
        };

        // Step 1: Owning account
        let account = self
            .repository
            .get_cloud_account(account_id)
            .await?
            .ok_or_else(|| ProviderError::not_found("Cloudaccount", account_id.to_string()))?;

        debug!(
            provider_id = %provider.id(),
            cloud_account_id = %account_id,
            "Resolving credentials from owning account"
        );

        // Step 2: Secret
        let secret = self.decrypt(&key_context, account.secret())?;

        // Step 3: Login
        Ok(Credential {
            access_url: account.access_url().map(str::to_string),
            account: compose_account(account.account(), provider.account()),
            secret,
        })
    }

    fn decrypt(&self, key_context: &str, ciphertext: &str) -> Result<Secret, ProviderError> {
        self.secrets
            .decrypt(key_context, ciphertext)
            .map(Secret::new)
            .map_err(|e| ProviderError::Decryption(format!("{e:#}")))
    }
}
