//! Provider lookup, detail and system-info use case

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    domain::{CloudProvider, ProviderError, ProviderId, UsageSnapshot},
    ports::IResourceRepository,
    usecases::aggregate_usage::UsageAggregator,
};

/// A registration together with its current usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDetails {
    #[serde(flatten)]
    pub provider: CloudProvider,
    pub usage: UsageSnapshot,
}

/// Use case for reading registrations and recording their system info
pub struct ProviderQueryUseCase {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
    usage: UsageAggregator,
}

impl ProviderQueryUseCase {
    pub fn new(repository: Arc<dyn IResourceRepository + Send + Sync>) -> Self {
        Self {
            usage: UsageAggregator::new(repository.clone()),
            repository,
        }
    }

    /// Fetches a registration by id
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if no registration has this id
    pub async fn fetch_by_id(&self, id: &ProviderId) -> Result<CloudProvider, ProviderError> {
        self.repository
            .get_provider(id)
            .await?
            .ok_or_else(|| ProviderError::not_found("Cloudprovider", id.to_string()))
    }

    /// Fetches a registration by id, falling back to its name
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if neither lookup matches
    pub async fn fetch_by_id_or_name(
        &self,
        reference: &str,
    ) -> Result<CloudProvider, ProviderError> {
        if let Ok(id) = reference.parse::<ProviderId>() {
            if let Some(provider) = self.repository.get_provider(&id).await? {
                return Ok(provider);
            }
        }
        debug!(reference, "Looking up provider by name");
        self.repository
            .get_provider_by_name(reference)
            .await?
            .ok_or_else(|| ProviderError::not_found("Cloudprovider", reference))
    }

    /// Returns the registration augmented with its usage snapshot
    pub async fn details(&self, provider: &CloudProvider) -> Result<ProviderDetails, ProviderError> {
        let usage = self.usage.snapshot(provider.id()).await?;
        Ok(ProviderDetails {
            provider: provider.clone(),
            usage,
        })
    }

    /// Records the system info reported by the external cloud
    ///
    /// Goes through the atomic update so a concurrent sync stamp is never
    /// overwritten.
    pub async fn save_sysinfo(
        &self,
        id: &ProviderId,
        sysinfo: serde_json::Value,
    ) -> Result<CloudProvider, ProviderError> {
        let stored = self
            .repository
            .update_provider(id, &move |current: &mut CloudProvider| {
                current.set_sysinfo(sysinfo.clone());
                Ok(())
            })
            .await?;
        info!(provider_id = %id, "Saved provider sysinfo");
        Ok(stored)
    }
}
