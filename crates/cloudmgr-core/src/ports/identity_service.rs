//! Identity service port
//!
//! Project lookup and creation in the external identity service. Used by
//! implicit project linkage only.

use serde::{Deserialize, Serialize};

use crate::domain::ProjectId;

/// A project as known to the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

/// Port trait for the external identity service
#[async_trait::async_trait]
pub trait IIdentityService: Send + Sync {
    /// Finds a project by exact name; `Ok(None)` when it does not exist
    async fn find_project_by_name(&self, name: &str) -> anyhow::Result<Option<Project>>;

    /// Creates a project with the given name
    async fn create_project(&self, name: &str) -> anyhow::Result<Project>;
}
