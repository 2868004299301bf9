//! Adapter wiring shared by the provider commands
//!
//! Opens the database, loads the secret master key and builds the identity
//! client from the loaded configuration, then hands out use cases with
//! those adapters injected.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use cloudmgr_cache::{DatabasePool, SqliteResourceRepository, SqliteTaskRunner};
use cloudmgr_core::config::Config;
use cloudmgr_core::domain::{ProjectLinkagePolicy, Requester};
use cloudmgr_core::ports::{IIdentityService, Project};
use cloudmgr_core::usecases::{
    CredentialResolver, DeleteGuard, LegacyMigrationUseCase, ProviderQueryUseCase,
    SyncProviderUseCase,
};
use cloudmgr_identity::IdentityClient;
use cloudmgr_secrets::AesSecretStore;

/// Identity service stand-in when no endpoint is configured
///
/// Only reachable if a linkage policy is forced on without an endpoint,
/// which [`AppContext::open`] prevents.
struct UnconfiguredIdentity;

#[async_trait::async_trait]
impl IIdentityService for UnconfiguredIdentity {
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        anyhow::bail!("identity.endpoint is not configured; cannot look up project '{name}'")
    }

    async fn create_project(&self, name: &str) -> Result<Project> {
        anyhow::bail!("identity.endpoint is not configured; cannot create project '{name}'")
    }
}

/// Adapters built from one configuration
pub struct AppContext {
    pub pool: DatabasePool,
    pub repository: Arc<SqliteResourceRepository>,
    pub tasks: Arc<SqliteTaskRunner>,
    pub secrets: Arc<AesSecretStore>,
    identity: Arc<dyn IIdentityService + Send + Sync>,
    policy: ProjectLinkagePolicy,
    config: Config,
}

impl AppContext {
    /// Opens every adapter named by `config`
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = DatabasePool::open(&config.database)
            .await
            .context("Failed to open database")?;
        let repository = Arc::new(
            SqliteResourceRepository::new(pool.pool().clone())
                .with_max_update_retries(config.sync.max_update_retries),
        );
        let tasks = Arc::new(SqliteTaskRunner::new(pool.pool().clone()));

        let secrets = Arc::new(
            AesSecretStore::load_or_create(&config.secrets.key_file)
                .context("Failed to load secret master key")?,
        );

        let mut policy = config.project_linkage_policy()?;
        let identity: Arc<dyn IIdentityService + Send + Sync> =
            match IdentityClient::from_config(&config.identity)
                .context("Invalid identity configuration")?
            {
                Some(client) => Arc::new(client),
                None => {
                    if !config.project_linkage.provider_kinds.is_empty() {
                        warn!("identity.endpoint not set; implicit project linkage disabled");
                    }
                    policy = ProjectLinkagePolicy::none();
                    Arc::new(UnconfiguredIdentity)
                }
            };

        debug!(database = %config.database.path.display(), "Adapters ready");
        Ok(Self {
            pool,
            repository,
            tasks,
            secrets,
            identity,
            policy,
            config: config.clone(),
        })
    }

    /// The requester on whose behalf CLI operations run
    ///
    /// The CLI operates the local database directly and therefore acts
    /// with the system-admin privilege.
    pub fn requester() -> Requester {
        let user = std::env::var("USER").unwrap_or_else(|_| "cloudmgr".to_string());
        Requester::system_admin(user.clone(), user)
    }

    pub fn queries(&self) -> ProviderQueryUseCase {
        ProviderQueryUseCase::new(self.repository.clone())
    }

    pub fn credentials(&self) -> CredentialResolver {
        CredentialResolver::new(self.repository.clone(), self.secrets.clone())
    }

    pub fn delete_guard(&self) -> DeleteGuard {
        DeleteGuard::new(self.repository.clone())
    }

    pub fn migration(&self) -> LegacyMigrationUseCase {
        LegacyMigrationUseCase::new(self.repository.clone())
    }

    pub fn sync(&self) -> SyncProviderUseCase {
        SyncProviderUseCase::new(
            self.repository.clone(),
            self.identity.clone(),
            self.tasks.clone(),
            self.policy.clone(),
        )
        .with_staleness_window(self.config.staleness_window())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
