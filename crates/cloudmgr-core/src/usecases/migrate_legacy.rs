//! Legacy vCenter migration use case
//!
//! Folds the old single-purpose vCenter records into VMware provider
//! registrations. The registration keeps the vCenter's id, so the stored
//! password still decrypts under the same key context and re-running the
//! migration is a no-op for records already moved.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::{domain::ProviderError, ports::IResourceRepository};

/// Use case for migrating legacy vCenter records
pub struct LegacyMigrationUseCase {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
}

impl LegacyMigrationUseCase {
    pub fn new(repository: Arc<dyn IResourceRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Migrates every pending legacy record
    ///
    /// For each record without a registration of the same id this method:
    /// 1. Derives a registration name unique among registrations
    /// 2. Inserts the VMware registration
    /// 3. Soft-deletes the legacy record
    ///
    /// # Returns
    ///
    /// The number of records migrated
    ///
    /// # Errors
    ///
    /// The first failure aborts the migration; records migrated before it
    /// stay migrated.
    pub async fn execute(&self) -> Result<usize, ProviderError> {
        let vcenters = self
            .repository
            .list_legacy_vcenters()
            .await
            .context("Failed to list legacy vCenter records")?;

        let mut migrated = 0;
        for vcenter in vcenters {
            if self.repository.get_provider(&vcenter.id).await?.is_some() {
                debug!(vcenter_id = %vcenter.id, "vCenter already migrated");
                continue;
            }

            // Step 1: Name
            let name = self.unique_name(&vcenter.name).await?;

            // Step 2: Registration
            let provider = vcenter.to_provider(name);
            self.repository
                .insert_provider(&provider)
                .await
                .with_context(|| format!("Failed to insert provider for vCenter {}", vcenter.id))?;

            // Step 3: Retire
            self.repository
                .mark_legacy_vcenter_deleted(&vcenter.id)
                .await
                .with_context(|| format!("Failed to delete vCenter {}", vcenter.id))?;

            info!(
                vcenter_id = %vcenter.id,
                provider_name = %provider.name(),
                "Migrated vCenter to cloud provider"
            );
            migrated += 1;
        }

        Ok(migrated)
    }

    async fn unique_name(&self, base: &str) -> Result<String, ProviderError> {
        if self.repository.get_provider_by_name(base).await?.is_none() {
            return Ok(base.to_string());
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{base}-{suffix}");
            if self
                .repository
                .get_provider_by_name(&candidate)
                .await?
                .is_none()
            {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}
