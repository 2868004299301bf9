//! Resource repository port (driven/secondary port)
//!
//! This module defines the interface for reading and updating provider
//! registrations, their owning accounts, the region/zone/host catalog and
//! the dependent-resource collections counted by the usage aggregator.
//!
//! ## Design Notes
//!
//! - Lookups return `anyhow::Result<Option<T>>`: absence is a normal
//!   outcome that the use cases turn into `ProviderError::NotFound`, while
//!   storage failures stay adapter-specific.
//! - [`IResourceRepository::update_provider`] is the only writer of
//!   status, last-sync, project and sysinfo fields. It is an atomic
//!   read-modify-write: the mutator may run more than once when a
//!   concurrent writer wins, so it must be a pure function of the row it is
//!   handed.

use crate::domain::{
    CatalogEntry, CatalogKind, CloudAccount, CloudAccountId, CloudProvider, DependentKind,
    LegacyVCenter, ProviderError, ProviderId,
};

/// In-place mutation applied inside [`IResourceRepository::update_provider`]
///
/// Returning an error aborts the update without writing anything.
pub type ProviderMutator<'a> =
    dyn Fn(&mut CloudProvider) -> Result<(), ProviderError> + Send + Sync + 'a;

/// Port trait for resource persistence
///
/// ## Implementation Notes
///
/// - `count_dependents` must be a count-only query scoped by the owning
///   provider; instances are owned through their host.
/// - `update_provider` must retry (re-reading the row and re-running the
///   mutator) when it loses an optimistic-concurrency race, and fail with
///   `ProviderError::Conflict` once its retry budget is spent.
#[async_trait::async_trait]
pub trait IResourceRepository: Send + Sync {
    // --- Provider registrations ---

    /// Retrieves a registration by its id
    async fn get_provider(&self, id: &ProviderId) -> anyhow::Result<Option<CloudProvider>>;

    /// Retrieves a registration by its unique name
    async fn get_provider_by_name(&self, name: &str) -> anyhow::Result<Option<CloudProvider>>;

    /// Inserts a new registration
    async fn insert_provider(&self, provider: &CloudProvider) -> anyhow::Result<()>;

    /// Atomically applies `mutator` to the stored registration
    ///
    /// Returns the registration as written.
    ///
    /// # Errors
    /// - `ProviderError::NotFound` if no registration has this id
    /// - whatever error the mutator returns, unchanged
    /// - `ProviderError::Conflict` if concurrent writers kept winning
    /// - `ProviderError::Repository` for storage failures
    async fn update_provider(
        &self,
        id: &ProviderId,
        mutator: &ProviderMutator<'_>,
    ) -> Result<CloudProvider, ProviderError>;

    // --- Owning accounts ---

    /// Retrieves an owning cloud account by its id
    async fn get_cloud_account(&self, id: &CloudAccountId)
        -> anyhow::Result<Option<CloudAccount>>;

    // --- Catalog ---

    /// Looks up a region/zone/host by canonical id
    async fn get_catalog_entry(
        &self,
        kind: CatalogKind,
        id: &str,
    ) -> anyhow::Result<Option<CatalogEntry>>;

    /// Looks up a region/zone/host by name
    async fn find_catalog_entry_by_name(
        &self,
        kind: CatalogKind,
        name: &str,
    ) -> anyhow::Result<Option<CatalogEntry>>;

    // --- Usage ---

    /// Counts rows of `kind` owned by the provider
    async fn count_dependents(
        &self,
        kind: DependentKind,
        provider_id: &ProviderId,
    ) -> anyhow::Result<u64>;

    // --- Legacy records ---

    /// Lists legacy vCenter records that have not been deleted
    async fn list_legacy_vcenters(&self) -> anyhow::Result<Vec<LegacyVCenter>>;

    /// Soft-deletes a legacy vCenter record
    async fn mark_legacy_vcenter_deleted(&self, id: &ProviderId) -> anyhow::Result<()>;
}
