//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IResourceRepository`] - Provider, account, catalog and usage persistence
//! - [`ISecretStore`] - Secret encryption at rest
//! - [`IIdentityService`] - Project lookup and creation
//! - [`ITaskRunner`] - Asynchronous task submission
//! - [`ICloudDriverFactory`] - Live connections to external clouds

pub mod cloud_driver;
pub mod identity_service;
pub mod resource_repository;
pub mod secret_store;
pub mod task_runner;

pub use cloud_driver::{ICloudDriver, ICloudDriverFactory};
pub use identity_service::{IIdentityService, Project};
pub use resource_repository::{IResourceRepository, ProviderMutator};
pub use secret_store::ISecretStore;
pub use task_runner::{ITaskRunner, TaskHandle, TaskRequest, PROVIDER_TARGET_TYPE, SYNC_INFO_TASK};
