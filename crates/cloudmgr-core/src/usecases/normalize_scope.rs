//! Sync scope normalization use case
//!
//! Rewrites every region, zone and host reference of a [`SyncRange`] to its
//! canonical id. References may be ids or names; an unknown reference
//! invalidates the whole request.

use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{CatalogKind, ProviderError, SyncRange},
    ports::IResourceRepository,
};

/// Use case for resolving sync scope references
pub struct ScopeNormalizer {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
}

impl ScopeNormalizer {
    pub fn new(repository: Arc<dyn IResourceRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Normalizes `range` in place
    ///
    /// Categories are processed region, zone, host; entries keep their
    /// order. The first unknown reference aborts; references resolved
    /// before it are simply dropped with the request.
    ///
    /// # Errors
    ///
    /// - `ProviderError::NotFound` naming the category and the reference
    /// - `ProviderError::Repository` if a lookup fails
    pub async fn normalize(&self, range: &mut SyncRange) -> Result<(), ProviderError> {
        self.resolve_all(CatalogKind::Region, &mut range.region)
            .await?;
        self.resolve_all(CatalogKind::Zone, &mut range.zone).await?;
        self.resolve_all(CatalogKind::Host, &mut range.host).await?;
        Ok(())
    }

    async fn resolve_all(
        &self,
        kind: CatalogKind,
        references: &mut [String],
    ) -> Result<(), ProviderError> {
        for reference in references.iter_mut() {
            let id = self.resolve(kind, reference).await?;
            if id != *reference {
                debug!(%kind, reference = %reference, id = %id, "Resolved scope reference");
            }
            *reference = id;
        }
        Ok(())
    }

    /// Id lookup first, then name lookup
    async fn resolve(&self, kind: CatalogKind, reference: &str) -> Result<String, ProviderError> {
        if let Some(entry) = self.repository.get_catalog_entry(kind, reference).await? {
            return Ok(entry.id);
        }
        match self
            .repository
            .find_catalog_entry_by_name(kind, reference)
            .await?
        {
            Some(entry) => Ok(entry.id),
            None => Err(ProviderError::not_found(kind.label(), reference)),
        }
    }
}
