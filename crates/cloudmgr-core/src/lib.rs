//! Cloudmgr Core - Domain logic for managed cloud provider registrations
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `CloudProvider`, `CloudAccount`, `SyncRange`, `UsageSnapshot`
//! - **Use cases** - `CredentialResolver`, `UsageAggregator`, `ScopeNormalizer`,
//!   `ProjectLinker`, `SyncProviderUseCase`, `DeleteGuard`, `ProviderQueryUseCase`,
//!   `LegacyMigrationUseCase`
//! - **Port definitions** - Traits for adapters: `IResourceRepository`, `ISecretStore`,
//!   `IIdentityService`, `ITaskRunner`, `ICloudDriverFactory`
//! - **State machine** - Provider sync lifecycle and the staleness guard
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces; every
//! collaborator is injected at construction time.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
