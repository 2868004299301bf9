//! Domain entities and business logic
//!
//! This module contains the core domain types for cloud provider management:
//! - Newtypes for type-safe identifiers
//! - Provider registrations, their sync state machine and owning accounts
//! - Sync scope requests and catalog references
//! - Usage snapshots for the deletion guard
//! - Resolved credentials and the requesting identity
//! - Legacy vCenter records awaiting migration
//! - Domain-specific error types

pub mod catalog;
pub mod cloud_account;
pub mod credential;
pub mod errors;
pub mod legacy;
pub mod newtypes;
pub mod policy;
pub mod provider;
pub mod requester;
pub mod sync_range;
pub mod usage;

// Re-export commonly used types
pub use catalog::{CatalogEntry, CatalogKind};
pub use cloud_account::CloudAccount;
pub use credential::{Credential, Secret};
pub use errors::ProviderError;
pub use legacy::LegacyVCenter;
pub use newtypes::*;
pub use policy::ProjectLinkagePolicy;
pub use provider::{CloudProvider, ProviderKind, ProviderStatus, DEFAULT_STALENESS_WINDOW_SECS};
pub use requester::Requester;
pub use sync_range::SyncRange;
pub use usage::{DependentKind, UsageSnapshot};
