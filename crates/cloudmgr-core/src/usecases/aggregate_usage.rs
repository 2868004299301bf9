//! Usage aggregation use case
//!
//! Counts the resources that still depend on a provider registration. The
//! deletion guard and the detail view both consume the snapshot.

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::{
    domain::{DependentKind, ProviderError, ProviderId, UsageSnapshot},
    ports::IResourceRepository,
};

/// Use case for computing a registration's usage snapshot
pub struct UsageAggregator {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
}

impl UsageAggregator {
    pub fn new(repository: Arc<dyn IResourceRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Computes the usage snapshot of a registration
    ///
    /// The six counts are independent and issued concurrently. Nothing is
    /// written, so concurrent callers never interfere.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Repository` if any count query fails
    pub async fn snapshot(&self, provider_id: &ProviderId) -> Result<UsageSnapshot, ProviderError> {
        let (
            instance_count,
            host_count,
            network_count,
            storage_count,
            storage_cache_count,
            external_ip_count,
        ) = tokio::try_join!(
            self.count(DependentKind::Instance, provider_id),
            self.count(DependentKind::Host, provider_id),
            self.count(DependentKind::Network, provider_id),
            self.count(DependentKind::Storage, provider_id),
            self.count(DependentKind::StorageCache, provider_id),
            self.count(DependentKind::ExternalIp, provider_id),
        )?;

        let usage = UsageSnapshot {
            instance_count,
            host_count,
            network_count,
            storage_count,
            storage_cache_count,
            external_ip_count,
        };
        debug!(provider_id = %provider_id, ?usage, "Computed usage snapshot");
        Ok(usage)
    }

    async fn count(&self, kind: DependentKind, provider_id: &ProviderId) -> anyhow::Result<u64> {
        self.repository
            .count_dependents(kind, provider_id)
            .await
            .with_context(|| format!("Failed to count {kind} of provider {provider_id}"))
    }
}
