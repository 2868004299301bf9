//! Cloudmgr Cache - Local persistence for provider registrations
//!
//! SQLite-based storage for:
//! - Provider registrations and their owning accounts
//! - The region/zone/host catalog and dependent resources
//! - Legacy vCenter records awaiting migration
//! - Submitted sync tasks
//!
//! ## Architecture
//!
//! This crate implements the `IResourceRepository` and `ITaskRunner` ports
//! from `cloudmgr-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteResourceRepository`] - Full `IResourceRepository` implementation
//! - [`SqliteTaskRunner`] - Records and schedules task submissions
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use cloudmgr_cache::{DatabasePool, SqliteResourceRepository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/cloudmgr/cloudmgr.db")).await?;
//! let repo = SqliteResourceRepository::new(pool.pool().clone());
//! // Use repo as IResourceRepository...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;
pub mod task_runner;

pub use pool::DatabasePool;
pub use repository::SqliteResourceRepository;
pub use task_runner::{SqliteTaskRunner, TaskRecord, TaskStage};

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
