//! Implicit project linkage use case
//!
//! Registrations of some provider kinds are expected to own a project of
//! the same name in the identity service. The linker finds or creates that
//! project and records its id on the registration.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    domain::{CloudProvider, ProjectId, ProjectLinkagePolicy, ProviderError},
    ports::{IIdentityService, IResourceRepository},
};

/// Use case for ensuring a registration's implicit project
pub struct ProjectLinker {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
    identity: Arc<dyn IIdentityService + Send + Sync>,
    policy: ProjectLinkagePolicy,
}

impl ProjectLinker {
    /// Creates a new ProjectLinker
    ///
    /// # Arguments
    ///
    /// * `repository` - Persists the project reference
    /// * `identity` - Project lookup and creation
    /// * `policy` - Provider kinds that get an implicit project
    pub fn new(
        repository: Arc<dyn IResourceRepository + Send + Sync>,
        identity: Arc<dyn IIdentityService + Send + Sync>,
        policy: ProjectLinkagePolicy,
    ) -> Self {
        Self {
            repository,
            identity,
            policy,
        }
    }

    /// Returns true if `provider` still needs an implicit project
    pub fn needs_linkage(&self, provider: &CloudProvider) -> bool {
        provider.project_id().is_none()
            && !provider.name().is_empty()
            && self.policy.requires_linkage(provider.kind())
    }

    /// Ensures the registration references its implicit project
    ///
    /// This method:
    /// 1. Returns `None` when the registration needs no linkage
    /// 2. Finds the project named after the registration
    /// 3. Creates it when the lookup finds nothing
    /// 4. Stores the project id on the registration
    ///
    /// A registration that gained a project concurrently keeps it.
    ///
    /// # Errors
    ///
    /// - `ProviderError::General` if the identity service fails
    /// - repository errors from storing the reference
    pub async fn ensure_linked(
        &self,
        provider: &CloudProvider,
    ) -> Result<Option<ProjectId>, ProviderError> {
        // Step 1: Policy
        if !self.needs_linkage(provider) {
            return Ok(None);
        }

        // Step 2: Lookup
        let project = match self
            .identity
            .find_project_by_name(provider.name())
            .await
            .map_err(|e| identity_error("find", provider.name(), e))?
        {
            Some(project) => {
                debug!(provider_id = %provider.id(), project_id = %project.id, "Found project");
                project
            }
            // Step 3: Create
            None => {
                let project = self
                    .identity
                    .create_project(provider.name())
                    .await
                    .map_err(|e| identity_error("create", provider.name(), e))?;
                info!(provider_id = %provider.id(), project_id = %project.id, "Created project");
                project
            }
        };

        // Step 4: Persist
        let project_id = project.id;
        let link = project_id.clone();
        let stored = self
            .repository
            .update_provider(provider.id(), &move |current: &mut CloudProvider| {
                if current.project_id().is_none() {
                    current.set_project_id(link.clone());
                }
                Ok(())
            })
            .await?;

        info!(
            provider_id = %provider.id(),
            project_id = %project_id,
            "Linked provider to project"
        );
        Ok(stored.project_id().cloned())
    }
}

fn identity_error(action: &str, name: &str, err: anyhow::Error) -> ProviderError {
    ProviderError::General(format!("failed to {action} project '{name}': {err:#}"))
}
