//! In-memory port implementations shared by the use case tests

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use anyhow::anyhow;

use crate::{
    domain::{
        CatalogEntry, CatalogKind, CloudAccount, CloudAccountId, CloudProvider, Credential,
        DependentKind, LegacyVCenter, ProjectId, ProviderError, ProviderId,
    },
    ports::{
        ICloudDriver, ICloudDriverFactory, IIdentityService, IResourceRepository, ISecretStore,
        ITaskRunner, Project, ProviderMutator, TaskHandle, TaskRequest,
    },
};

// ============================================================================
// Resource repository
// ============================================================================

#[derive(Default)]
pub struct MockRepository {
    pub providers: Mutex<HashMap<ProviderId, CloudProvider>>,
    pub accounts: Mutex<HashMap<CloudAccountId, CloudAccount>>,
    pub catalog: Mutex<Vec<(CatalogKind, CatalogEntry)>>,
    pub counts: Mutex<HashMap<DependentKind, u64>>,
    /// Legacy records with their soft-delete flag
    pub legacy: Mutex<Vec<(LegacyVCenter, bool)>>,
    pub catalog_lookups: AtomicUsize,
    pub fail_counts: bool,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(self, provider: CloudProvider) -> Self {
        self.providers
            .lock()
            .unwrap()
            .insert(*provider.id(), provider);
        self
    }

    pub fn with_account(self, account: CloudAccount) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(*account.id(), account);
        self
    }

    pub fn with_catalog(self, kind: CatalogKind, id: &str, name: &str) -> Self {
        self.catalog
            .lock()
            .unwrap()
            .push((kind, CatalogEntry::new(id, name)));
        self
    }

    pub fn with_count(self, kind: DependentKind, count: u64) -> Self {
        self.counts.lock().unwrap().insert(kind, count);
        self
    }

    pub fn with_legacy(self, vcenter: LegacyVCenter) -> Self {
        self.legacy.lock().unwrap().push((vcenter, false));
        self
    }

    pub fn stored(&self, id: &ProviderId) -> CloudProvider {
        self.providers.lock().unwrap()[id].clone()
    }
}

#[async_trait::async_trait]
impl IResourceRepository for MockRepository {
    async fn get_provider(&self, id: &ProviderId) -> anyhow::Result<Option<CloudProvider>> {
        Ok(self.providers.lock().unwrap().get(id).cloned())
    }

    async fn get_provider_by_name(&self, name: &str) -> anyhow::Result<Option<CloudProvider>> {
        Ok(self
            .providers
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name() == name)
            .cloned())
    }

    async fn insert_provider(&self, provider: &CloudProvider) -> anyhow::Result<()> {
        let mut providers = self.providers.lock().unwrap();
        if providers.contains_key(provider.id()) {
            return Err(anyhow!("duplicate provider id {}", provider.id()));
        }
        providers.insert(*provider.id(), provider.clone());
        Ok(())
    }

    async fn update_provider(
        &self,
        id: &ProviderId,
        mutator: &ProviderMutator<'_>,
    ) -> Result<CloudProvider, ProviderError> {
        // The lock is held across the mutator, which makes the update atomic
        let mut providers = self.providers.lock().unwrap();
        let current = providers
            .get(id)
            .ok_or_else(|| ProviderError::not_found("Cloudprovider", id.to_string()))?;
        let mut updated = current.clone();
        mutator(&mut updated)?;
        updated.set_revision(current.revision() + 1);
        providers.insert(*id, updated.clone());
        Ok(updated)
    }

    async fn get_cloud_account(
        &self,
        id: &CloudAccountId,
    ) -> anyhow::Result<Option<CloudAccount>> {
        Ok(self.accounts.lock().unwrap().get(id).cloned())
    }

    async fn get_catalog_entry(
        &self,
        kind: CatalogKind,
        id: &str,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        self.catalog_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .find(|(k, e)| *k == kind && e.id == id)
            .map(|(_, e)| e.clone()))
    }

    async fn find_catalog_entry_by_name(
        &self,
        kind: CatalogKind,
        name: &str,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        self.catalog_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .find(|(k, e)| *k == kind && e.name == name)
            .map(|(_, e)| e.clone()))
    }

    async fn count_dependents(
        &self,
        kind: DependentKind,
        _provider_id: &ProviderId,
    ) -> anyhow::Result<u64> {
        if self.fail_counts {
            return Err(anyhow!("database is locked"));
        }
        Ok(self.counts.lock().unwrap().get(&kind).copied().unwrap_or(0))
    }

    async fn list_legacy_vcenters(&self) -> anyhow::Result<Vec<LegacyVCenter>> {
        Ok(self
            .legacy
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, deleted)| !deleted)
            .map(|(vc, _)| vc.clone())
            .collect())
    }

    async fn mark_legacy_vcenter_deleted(&self, id: &ProviderId) -> anyhow::Result<()> {
        for (vc, deleted) in self.legacy.lock().unwrap().iter_mut() {
            if &vc.id == id {
                *deleted = true;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Secret store
// ============================================================================

/// "Encrypts" as `enc(<context>):<plaintext>`
pub struct MockSecretStore;

impl ISecretStore for MockSecretStore {
    fn decrypt(&self, key_context: &str, ciphertext: &str) -> anyhow::Result<String> {
        let prefix = format!("enc({key_context}):");
        ciphertext
            .strip_prefix(&prefix)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("authentication tag mismatch"))
    }

    fn encrypt(&self, key_context: &str, plaintext: &str) -> anyhow::Result<String> {
        Ok(format!("enc({key_context}):{plaintext}"))
    }
}

// ============================================================================
// Identity service
// ============================================================================

#[derive(Default)]
pub struct MockIdentityService {
    pub projects: Mutex<Vec<Project>>,
    pub created: Mutex<Vec<String>>,
    pub fail: bool,
}

impl MockIdentityService {
    pub fn with_project(self, id: &str, name: &str) -> Self {
        self.projects.lock().unwrap().push(Project {
            id: ProjectId::new(id).unwrap(),
            name: name.to_string(),
        });
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl IIdentityService for MockIdentityService {
    async fn find_project_by_name(&self, name: &str) -> anyhow::Result<Option<Project>> {
        if self.fail {
            return Err(anyhow!("identity service unavailable"));
        }
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn create_project(&self, name: &str) -> anyhow::Result<Project> {
        let project = Project {
            id: ProjectId::new(format!("proj-{name}"))?,
            name: name.to_string(),
        };
        self.created.lock().unwrap().push(name.to_string());
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }
}

// ============================================================================
// Task runner
// ============================================================================

#[derive(Default)]
pub struct MockTaskRunner {
    pub submitted: Mutex<Vec<TaskRequest>>,
    pub scheduled: Mutex<Vec<TaskHandle>>,
    pub fail_submit: bool,
}

impl MockTaskRunner {
    pub fn failing() -> Self {
        Self {
            fail_submit: true,
            ..Self::default()
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ITaskRunner for MockTaskRunner {
    async fn submit(&self, request: &TaskRequest) -> anyhow::Result<TaskHandle> {
        if self.fail_submit {
            return Err(anyhow!("task queue full"));
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok(TaskHandle {
            id: crate::domain::TaskId::new(),
            task_name: request.task_name.clone(),
            target_id: request.target_id,
        })
    }

    async fn schedule_run(&self, handle: &TaskHandle) -> anyhow::Result<()> {
        self.scheduled.lock().unwrap().push(handle.clone());
        Ok(())
    }
}

// ============================================================================
// Cloud driver
// ============================================================================

pub struct MockDriverFactory {
    pub balance: Option<f64>,
    pub connections: Mutex<Vec<Credential>>,
}

impl MockDriverFactory {
    pub fn with_balance(balance: f64) -> Self {
        Self {
            balance: Some(balance),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            balance: None,
            connections: Mutex::new(Vec::new()),
        }
    }
}

struct MockDriver {
    balance: Option<f64>,
}

#[async_trait::async_trait]
impl ICloudDriver for MockDriver {
    async fn get_balance(&self) -> anyhow::Result<f64> {
        self.balance
            .ok_or_else(|| anyhow!("connection refused"))
    }
}

#[async_trait::async_trait]
impl ICloudDriverFactory for MockDriverFactory {
    async fn connect(
        &self,
        _provider: &CloudProvider,
        credential: &Credential,
    ) -> anyhow::Result<Box<dyn ICloudDriver>> {
        self.connections.lock().unwrap().push(credential.clone());
        Ok(Box::new(MockDriver {
            balance: self.balance,
        }))
    }
}
