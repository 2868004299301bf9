//! Deletion guard
//!
//! A registration may only be deleted once it is disabled and nothing
//! depends on it any more.

use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{CloudProvider, ProviderError},
    ports::IResourceRepository,
    usecases::aggregate_usage::UsageAggregator,
};

/// Use case for validating a registration's delete condition
pub struct DeleteGuard {
    usage: UsageAggregator,
}

impl DeleteGuard {
    pub fn new(repository: Arc<dyn IResourceRepository + Send + Sync>) -> Self {
        Self {
            usage: UsageAggregator::new(repository),
        }
    }

    /// Checks that `provider` may be deleted
    ///
    /// # Errors
    ///
    /// - `ProviderError::InvalidStatus` if the registration is enabled,
    ///   whatever its usage
    /// - `ProviderError::NotEmpty` if any dependent resource remains
    pub async fn validate_delete(&self, provider: &CloudProvider) -> Result<(), ProviderError> {
        if provider.enabled() {
            return Err(ProviderError::InvalidStatus(format!(
                "Cloudprovider {} is enabled",
                provider.name()
            )));
        }

        let usage = self.usage.snapshot(provider.id()).await?;
        if !usage.is_empty() {
            let blocking: Vec<&str> = usage
                .blocking_kinds()
                .into_iter()
                .map(|kind| kind.as_str())
                .collect();
            return Err(ProviderError::NotEmpty(format!(
                "Cloudprovider {} still has {}",
                provider.name(),
                blocking.join(", ")
            )));
        }

        debug!(provider_id = %provider.id(), "Provider may be deleted");
        Ok(())
    }
}
