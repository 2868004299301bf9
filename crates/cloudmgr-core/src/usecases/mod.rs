//! Use cases (interactors) for cloud provider management
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`CredentialResolver`] - Endpoint/login/secret resolution
//! - [`UsageAggregator`] - Dependent resource counts
//! - [`ScopeNormalizer`] - Region/zone/host reference resolution
//! - [`ProjectLinker`] - Implicit project linkage
//! - [`SyncProviderUseCase`] - Sync eligibility and task submission
//! - [`DeleteGuard`] - Delete condition validation
//! - [`ProviderQueryUseCase`] - Lookups, details and system info
//! - [`ProviderConnector`] - Live connections and balance queries
//! - [`LegacyMigrationUseCase`] - vCenter record migration

pub mod aggregate_usage;
pub mod connect_provider;
pub mod link_project;
pub mod migrate_legacy;
pub mod normalize_scope;
pub mod query_provider;
pub mod resolve_credentials;
pub mod sync_provider;
pub mod validate_delete;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate_usage::UsageAggregator;
pub use connect_provider::ProviderConnector;
pub use link_project::ProjectLinker;
pub use migrate_legacy::LegacyMigrationUseCase;
pub use normalize_scope::ScopeNormalizer;
pub use query_provider::{ProviderDetails, ProviderQueryUseCase};
pub use resolve_credentials::CredentialResolver;
pub use sync_provider::{SyncOutcome, SyncProviderUseCase};
pub use validate_delete::DeleteGuard;
