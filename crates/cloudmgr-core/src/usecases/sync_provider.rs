//! Provider sync orchestration use case
//!
//! Decides whether a reconciliation pass may start for a registration and,
//! if so, stamps the registration and submits the asynchronous sync task.
//!
//! ## Concurrency
//!
//! The eligibility check is repeated inside the repository's atomic update,
//! together with a comparison of the last-sync stamp the caller saw. Of two
//! concurrent starts on the same registration only the first stamp lands;
//! the second fails with `ProviderError::Conflict` and submits nothing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{
        CloudProvider, ProjectLinkagePolicy, ProviderError, Requester, SyncRange,
        DEFAULT_STALENESS_WINDOW_SECS,
    },
    ports::{
        IIdentityService, IResourceRepository, ITaskRunner, TaskHandle, TaskRequest,
        PROVIDER_TARGET_TYPE, SYNC_INFO_TASK,
    },
    usecases::{link_project::ProjectLinker, normalize_scope::ScopeNormalizer},
};

/// Result of a successful sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The sync task was submitted and scheduled
    Submitted(TaskHandle),
    /// The registration was not eligible; nothing happened
    Skipped,
}

impl SyncOutcome {
    pub fn task(&self) -> Option<&TaskHandle> {
        match self {
            Self::Submitted(handle) => Some(handle),
            Self::Skipped => None,
        }
    }
}

/// Use case for starting provider syncs
pub struct SyncProviderUseCase {
    repository: Arc<dyn IResourceRepository + Send + Sync>,
    tasks: Arc<dyn ITaskRunner + Send + Sync>,
    normalizer: ScopeNormalizer,
    linker: ProjectLinker,
    staleness_window: Duration,
}

impl SyncProviderUseCase {
    /// Creates a new SyncProviderUseCase with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `repository` - Registrations and the region/zone/host catalog
    /// * `identity` - Project lookup and creation for implicit linkage
    /// * `tasks` - Receives the sync task
    /// * `policy` - Provider kinds that get an implicit project
    pub fn new(
        repository: Arc<dyn IResourceRepository + Send + Sync>,
        identity: Arc<dyn IIdentityService + Send + Sync>,
        tasks: Arc<dyn ITaskRunner + Send + Sync>,
        policy: ProjectLinkagePolicy,
    ) -> Self {
        Self {
            normalizer: ScopeNormalizer::new(repository.clone()),
            linker: ProjectLinker::new(repository.clone(), identity, policy),
            repository,
            tasks,
            staleness_window: Duration::seconds(DEFAULT_STALENESS_WINDOW_SECS),
        }
    }

    /// Overrides the window after which an in-flight sync is reclaimable
    pub fn with_staleness_window(mut self, window: Duration) -> Self {
        self.staleness_window = window;
        self
    }

    pub fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    /// Handles an administrative sync request with a JSON payload
    ///
    /// # Errors
    ///
    /// - `ProviderError::Forbidden` unless the requester is a system admin
    /// - `ProviderError::InvalidStatus` if the registration is disabled
    /// - `ProviderError::InputParameter` for a malformed payload
    /// - anything [`start_sync`](Self::start_sync) returns
    pub async fn perform_sync(
        &self,
        provider: &CloudProvider,
        requester: &Requester,
        payload: &serde_json::Value,
    ) -> Result<SyncOutcome, ProviderError> {
        requester.require_system_admin("sync")?;
        ensure_enabled(provider)?;
        let range = SyncRange::from_json(payload)?;
        self.start_sync(provider, range, requester).await
    }

    /// Starts a sync of `provider` now
    pub async fn start_sync(
        &self,
        provider: &CloudProvider,
        range: SyncRange,
        requester: &Requester,
    ) -> Result<SyncOutcome, ProviderError> {
        self.start_sync_at(provider, range, requester, Utc::now())
            .await
    }

    /// Starts a sync of `provider` as of `now`
    ///
    /// This method:
    /// 1. Refuses disabled registrations
    /// 2. Normalizes the scope request
    /// 3. Returns `Skipped` when ineligible and not forced
    /// 4. Links the implicit project (best effort)
    /// 5. Atomically stamps `start_sync` and the last-sync time
    /// 6. Submits and schedules the sync task
    ///
    /// The stamp is not rolled back if submission fails; the staleness
    /// window eventually makes the registration eligible again.
    ///
    /// # Errors
    ///
    /// - `ProviderError::InvalidStatus` if the registration is disabled
    /// - `ProviderError::NotFound` for an unknown region/zone/host reference
    /// - `ProviderError::Conflict` if a concurrent start won the stamp
    /// - `ProviderError::General` if the task runner rejects the task
    pub async fn start_sync_at(
        &self,
        provider: &CloudProvider,
        mut range: SyncRange,
        requester: &Requester,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, ProviderError> {
        // Step 1: Enabled
        ensure_enabled(provider)?;

        // Step 2: Scope
        self.normalizer.normalize(&mut range).await?;

        // Step 3: Eligibility
        let window = self.staleness_window;
        if !range.force && !provider.can_sync(now, window) {
            debug!(
                provider_id = %provider.id(),
                status = %provider.status(),
                "Sync already in flight, skipping"
            );
            return Ok(SyncOutcome::Skipped);
        }

        // Step 4: Project linkage
        if let Err(e) = self.linker.ensure_linked(provider).await {
            warn!(provider_id = %provider.id(), error = %e, "Project linkage failed");
        }

        // Step 5: Stamp
        let force = range.force;
        let seen_last_sync = provider.last_sync();
        let stamped = self
            .repository
            .update_provider(provider.id(), &move |current: &mut CloudProvider| {
                ensure_enabled(current)?;
                let raced =
                    current.last_sync() != seen_last_sync || !current.can_sync(now, window);
                if !force && raced {
                    return Err(ProviderError::Conflict(format!(
                        "sync already in progress for provider {}",
                        current.id()
                    )));
                }
                current.mark_start_sync(now);
                Ok(())
            })
            .await?;

        info!(
            provider_id = %stamped.id(),
            force = range.force,
            full_sync = range.full_sync,
            "Provider marked start_sync"
        );

        // Step 6: Submit
        let request = TaskRequest {
            task_name: SYNC_INFO_TASK.to_string(),
            target_type: PROVIDER_TARGET_TYPE.to_string(),
            target_id: *stamped.id(),
            target_name: stamped.name().to_string(),
            params: json!({ "sync_range": range }),
            requester: requester.clone(),
            parent_task_id: None,
        };

        let handle = match self.tasks.submit(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(provider_id = %stamped.id(), error = %e, "Failed to submit sync task");
                return Err(ProviderError::General(format!(
                    "failed to submit {SYNC_INFO_TASK}: {e:#}"
                )));
            }
        };

        if let Err(e) = self.tasks.schedule_run(&handle).await {
            error!(task_id = %handle.id, error = %e, "Failed to schedule sync task");
            return Err(ProviderError::General(format!(
                "failed to schedule task {}: {e:#}",
                handle.id
            )));
        }

        info!(
            provider_id = %stamped.id(),
            task_id = %handle.id,
            "Submitted sync task"
        );
        Ok(SyncOutcome::Submitted(handle))
    }
}

fn ensure_enabled(provider: &CloudProvider) -> Result<(), ProviderError> {
    if provider.enabled() {
        Ok(())
    } else {
        Err(ProviderError::InvalidStatus(format!(
            "Cloudprovider {} disabled",
            provider.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogKind, CloudAccountId, ProviderKind, ProviderStatus};
    use crate::usecases::testing::{MockIdentityService, MockRepository, MockTaskRunner};

    struct Harness {
        usecase: SyncProviderUseCase,
        repository: Arc<MockRepository>,
        tasks: Arc<MockTaskRunner>,
    }

    fn harness(
        provider: &CloudProvider,
        identity: MockIdentityService,
        tasks: MockTaskRunner,
    ) -> Harness {
        let repository = Arc::new(
            MockRepository::new()
                .with_provider(provider.clone())
                .with_catalog(CatalogKind::Region, "r-1", "cn-beijing")
                .with_catalog(CatalogKind::Zone, "z-1", "cn-beijing-a"),
        );
        let tasks = Arc::new(tasks);
        let usecase = SyncProviderUseCase::new(
            repository.clone(),
            Arc::new(identity),
            tasks.clone(),
            ProjectLinkagePolicy::default(),
        );
        Harness {
            usecase,
            repository,
            tasks,
        }
    }

    fn default_harness(provider: &CloudProvider) -> Harness {
        harness(provider, MockIdentityService::default(), MockTaskRunner::default())
    }

    fn aliyun() -> CloudProvider {
        CloudProvider::new("aliyun-cn", ProviderKind::Aliyun, CloudAccountId::new())
    }

    fn syncing_since(mut provider: CloudProvider, since: DateTime<Utc>) -> CloudProvider {
        provider.mark_start_sync(since);
        provider.transition_to(ProviderStatus::Syncing).unwrap();
        provider
    }

    fn admin() -> Requester {
        Requester::system_admin("u-1", "admin")
    }

    #[tokio::test]
    async fn test_eligible_provider_is_stamped_and_submitted() {
        let provider = aliyun();
        let h = default_harness(&provider);
        let now = Utc::now();
        let range = SyncRange::new().with_regions(["cn-beijing"]).with_zones(["z-1"]);

        let outcome = h
            .usecase
            .start_sync_at(&provider, range, &admin(), now)
            .await
            .unwrap();

        let handle = outcome.task().unwrap();
        assert_eq!(handle.task_name, SYNC_INFO_TASK);
        assert_eq!(handle.target_id, *provider.id());

        let stored = h.repository.stored(provider.id());
        assert_eq!(stored.status(), ProviderStatus::StartSync);
        assert_eq!(stored.last_sync(), Some(now));

        let submitted = h.tasks.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].params["sync_range"]["region"], json!(["r-1"]));
        assert_eq!(submitted[0].params["sync_range"]["zone"], json!(["z-1"]));
        assert_eq!(submitted[0].requester, admin());
        assert_eq!(h.tasks.scheduled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_sync_in_flight_is_skipped() {
        let now = Utc::now();
        let provider = syncing_since(aliyun(), now - Duration::seconds(60));
        let h = default_harness(&provider);

        let outcome = h
            .usecase
            .start_sync_at(&provider, SyncRange::new(), &admin(), now)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Skipped);
        assert_eq!(h.tasks.submitted_count(), 0);
        assert_eq!(h.repository.stored(provider.id()), provider);
    }

    #[tokio::test]
    async fn test_abandoned_sync_is_reclaimed() {
        let now = Utc::now();
        let provider = syncing_since(aliyun(), now - Duration::seconds(901));
        let h = default_harness(&provider);

        let outcome = h
            .usecase
            .start_sync_at(&provider, SyncRange::new(), &admin(), now)
            .await
            .unwrap();

        assert!(outcome.task().is_some());
        assert_eq!(h.repository.stored(provider.id()).last_sync(), Some(now));
    }

    #[tokio::test]
    async fn test_force_bypasses_eligibility() {
        let now = Utc::now();
        let provider = syncing_since(aliyun(), now);
        let h = default_harness(&provider);

        let outcome = h
            .usecase
            .start_sync_at(&provider, SyncRange::new().with_force(true), &admin(), now)
            .await
            .unwrap();

        assert!(outcome.task().is_some());
        assert_eq!(h.tasks.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_staleness_window() {
        let now = Utc::now();
        let provider = syncing_since(aliyun(), now - Duration::seconds(120));
        let h = default_harness(&provider);
        let usecase = h.usecase.with_staleness_window(Duration::seconds(60));

        let outcome = usecase
            .start_sync_at(&provider, SyncRange::new(), &admin(), now)
            .await
            .unwrap();
        assert!(outcome.task().is_some());
    }

    #[tokio::test]
    async fn test_disabled_provider_is_invalid_status() {
        let mut provider = aliyun();
        provider.disable();
        let h = default_harness(&provider);

        let err = h
            .usecase
            .start_sync(&provider, SyncRange::new(), &admin())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "invalid_status");
        assert_eq!(h.tasks.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_reference_aborts_before_stamp() {
        let provider = aliyun();
        let h = default_harness(&provider);
        let range = SyncRange::new()
            .with_regions(["cn-beijing"])
            .with_zones(["nowhere-1a"]);

        let err = h
            .usecase
            .start_sync(&provider, range, &admin())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound { ref resource, .. } if resource == "Zone"));
        assert_eq!(h.repository.stored(provider.id()).status(), ProviderStatus::Init);
        assert_eq!(h.tasks.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_starts_submit_once() {
        let provider = aliyun();
        let h = default_harness(&provider);
        let now = Utc::now();
        let requester = admin();

        let (a, b) = tokio::join!(
            h.usecase
                .start_sync_at(&provider, SyncRange::new(), &requester, now),
            h.usecase
                .start_sync_at(&provider, SyncRange::new(), &requester, now),
        );

        let results = [a, b];
        let submitted = results
            .iter()
            .filter(|r| matches!(r, Ok(SyncOutcome::Submitted(_))))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ProviderError::Conflict(_))))
            .count();
        assert_eq!(submitted, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(h.tasks.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_submission_failure_keeps_stamp() {
        let provider = aliyun();
        let h = harness(&provider, MockIdentityService::default(), MockTaskRunner::failing());
        let now = Utc::now();

        let err = h
            .usecase
            .start_sync_at(&provider, SyncRange::new(), &admin(), now)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "general");
        let stored = h.repository.stored(provider.id());
        assert_eq!(stored.status(), ProviderStatus::StartSync);
        assert_eq!(stored.last_sync(), Some(now));
    }

    #[tokio::test]
    async fn test_azure_provider_is_linked_before_submission() {
        let provider = CloudProvider::new("azure-prod", ProviderKind::Azure, CloudAccountId::new());
        let h = harness(
            &provider,
            MockIdentityService::default().with_project("p-7", "azure-prod"),
            MockTaskRunner::default(),
        );

        h.usecase
            .start_sync(&provider, SyncRange::new(), &admin())
            .await
            .unwrap();

        let stored = h.repository.stored(provider.id());
        assert_eq!(stored.project_id().map(|p| p.as_str()), Some("p-7"));
        assert_eq!(stored.status(), ProviderStatus::StartSync);
    }

    #[tokio::test]
    async fn test_linkage_failure_is_swallowed() {
        let provider = CloudProvider::new("azure-prod", ProviderKind::Azure, CloudAccountId::new());
        let h = harness(&provider, MockIdentityService::failing(), MockTaskRunner::default());

        let outcome = h
            .usecase
            .start_sync(&provider, SyncRange::new(), &admin())
            .await
            .unwrap();

        assert!(outcome.task().is_some());
        assert!(h.repository.stored(provider.id()).project_id().is_none());
    }

    #[tokio::test]
    async fn test_perform_sync_requires_admin() {
        let provider = aliyun();
        let h = default_harness(&provider);

        let err = h
            .usecase
            .perform_sync(&provider, &Requester::new("u-2", "alice"), &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "forbidden");
        assert_eq!(h.tasks.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_perform_sync_rejects_malformed_payload() {
        let provider = aliyun();
        let h = default_harness(&provider);

        let err = h
            .usecase
            .perform_sync(&provider, &admin(), &json!({ "region": "cn-beijing" }))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "input_parameter");
    }

    #[tokio::test]
    async fn test_perform_sync_refuses_disabled() {
        let mut provider = aliyun();
        provider.disable();
        let h = default_harness(&provider);

        let err = h
            .usecase
            .perform_sync(&provider, &admin(), &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "invalid_status");
    }

    #[tokio::test]
    async fn test_perform_sync_parses_force() {
        let provider = syncing_since(aliyun(), Utc::now());
        let h = default_harness(&provider);

        let outcome = h
            .usecase
            .perform_sync(
                &provider,
                &admin(),
                &json!({ "force": true, "full_sync": true, "region": ["r-1"] }),
            )
            .await
            .unwrap();

        assert!(outcome.task().is_some());
        let submitted = h.tasks.submitted.lock().unwrap();
        assert_eq!(submitted[0].params["sync_range"]["full_sync"], json!(true));
    }
}
