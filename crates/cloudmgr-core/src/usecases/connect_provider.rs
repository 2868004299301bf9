//! Live connection and balance query use case
//!
//! Opens a driver for a registration from its resolved credentials and
//! delegates provider-side queries to it.
//!
//! No [`ICloudDriverFactory`] ships with this workspace, so the CLI does not
//! construct a `ProviderConnector`; embedders supply their own drivers.

use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{CloudProvider, ProviderError, Requester},
    ports::{ICloudDriver, ICloudDriverFactory, IResourceRepository, ISecretStore},
    usecases::resolve_credentials::CredentialResolver,
};

/// Use case for talking to the external cloud behind a registration
pub struct ProviderConnector {
    credentials: CredentialResolver,
    drivers: Arc<dyn ICloudDriverFactory + Send + Sync>,
}

impl ProviderConnector {
    pub fn new(
        repository: Arc<dyn IResourceRepository + Send + Sync>,
        secrets: Arc<dyn ISecretStore + Send + Sync>,
        drivers: Arc<dyn ICloudDriverFactory + Send + Sync>,
    ) -> Self {
        Self {
            credentials: CredentialResolver::new(repository, secrets),
            drivers,
        }
    }

    /// Opens a live connection for `provider`
    ///
    /// Disabled registrations are never used as a credential source.
    ///
    /// # Errors
    ///
    /// - `ProviderError::InvalidStatus` if the registration is disabled
    /// - credential resolution errors
    /// - `ProviderError::General` if the driver cannot connect
    pub async fn connect(
        &self,
        provider: &CloudProvider,
    ) -> Result<Box<dyn ICloudDriver>, ProviderError> {
        if !provider.enabled() {
            return Err(ProviderError::InvalidStatus(format!(
                "Cloudprovider {} is not enabled",
                provider.name()
            )));
        }

        let credential = self.credentials.resolve(provider).await?;
        debug!(
            provider_id = %provider.id(),
            kind = %provider.kind(),
            account = %credential.account,
            "Connecting to provider"
        );
        self.drivers
            .connect(provider, &credential)
            .await
            .map_err(|e| ProviderError::General(format!("{e:#}")))
    }

    /// Queries the account balance at the external cloud
    ///
    /// # Errors
    ///
    /// - `ProviderError::Forbidden` unless the requester is a system admin
    /// - any [`connect`](Self::connect) error
    /// - `ProviderError::General` for upstream failures
    pub async fn get_balance(
        &self,
        provider: &CloudProvider,
        requester: &Requester,
    ) -> Result<f64, ProviderError> {
        requester.require_system_admin("balance")?;
        let driver = self.connect(provider).await?;
        driver
            .get_balance()
            .await
            .map_err(|e| ProviderError::General(format!("{e:#}")))
    }
}
