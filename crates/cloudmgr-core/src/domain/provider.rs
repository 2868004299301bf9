//! Provider registration domain entity
//!
//! A [`CloudProvider`] is one managed connection to an external cloud
//! endpoint, owned by a [`CloudAccount`](super::CloudAccount). This module
//! also holds the sync lifecycle state machine and the staleness guard that
//! decides whether a new sync may start.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::ProviderError,
    newtypes::{CloudAccountId, ProjectId, ProviderId},
};

/// Seconds after which an in-flight sync is presumed abandoned
pub const DEFAULT_STALENESS_WINDOW_SECS: i64 = 900;

/// Lifecycle status of a provider registration
///
/// ```text
/// init ──► connected ◄──► disconnected
///   any ──► start_sync ──► syncing ──► connected | disconnected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Freshly created, never synced
    #[default]
    Init,
    /// Last sync reached the endpoint
    Connected,
    /// Last sync could not reach the endpoint
    Disconnected,
    /// A sync task has been submitted but not picked up yet
    StartSync,
    /// A sync task is running
    Syncing,
}

impl ProviderStatus {
    /// Returns the storage/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Init => "init",
            ProviderStatus::Connected => "connected",
            ProviderStatus::Disconnected => "disconnected",
            ProviderStatus::StartSync => "start_sync",
            ProviderStatus::Syncing => "syncing",
        }
    }

    /// Returns true if the state machine permits moving to `to`
    ///
    /// Entering `start_sync` is not covered here: it goes through
    /// [`CloudProvider::mark_start_sync`], which is allowed from any state.
    pub fn can_transition_to(&self, to: ProviderStatus) -> bool {
        use ProviderStatus::*;
        matches!(
            (self, to),
            (Init, Connected)
                | (Init, Disconnected)
                | (Connected, Disconnected)
                | (Disconnected, Connected)
                | (StartSync, Syncing)
                | (StartSync, Connected)
                | (StartSync, Disconnected)
                | (Syncing, Connected)
                | (Syncing, Disconnected)
        )
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderStatus {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(ProviderStatus::Init),
            "connected" => Ok(ProviderStatus::Connected),
            "disconnected" => Ok(ProviderStatus::Disconnected),
            "start_sync" => Ok(ProviderStatus::StartSync),
            "syncing" => Ok(ProviderStatus::Syncing),
            other => Err(ProviderError::InputParameter(format!(
                "unknown provider status: {other}"
            ))),
        }
    }
}

/// Kind of external cloud behind a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    OneCloud,
    VMware,
    Aliyun,
    Qcloud,
    Azure,
    Aws,
    Huawei,
    OpenStack,
    Ucloud,
    ZStack,
    Google,
}

impl ProviderKind {
    /// All known kinds, in declaration order
    pub const ALL: [ProviderKind; 11] = [
        ProviderKind::OneCloud,
        ProviderKind::VMware,
        ProviderKind::Aliyun,
        ProviderKind::Qcloud,
        ProviderKind::Azure,
        ProviderKind::Aws,
        ProviderKind::Huawei,
        ProviderKind::OpenStack,
        ProviderKind::Ucloud,
        ProviderKind::ZStack,
        ProviderKind::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OneCloud => "OneCloud",
            ProviderKind::VMware => "VMware",
            ProviderKind::Aliyun => "Aliyun",
            ProviderKind::Qcloud => "Qcloud",
            ProviderKind::Azure => "Azure",
            ProviderKind::Aws => "Aws",
            ProviderKind::Huawei => "Huawei",
            ProviderKind::OpenStack => "OpenStack",
            ProviderKind::Ucloud => "Ucloud",
            ProviderKind::ZStack => "ZStack",
            ProviderKind::Google => "Google",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProviderError::InputParameter(format!("unknown provider kind: {s}")))
    }
}

/// A managed connection to one external cloud endpoint
///
/// The `secret` field always holds ciphertext; plaintext only exists inside
/// the [`Credential`](super::Credential) produced by credential resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudProvider {
    id: ProviderId,
    name: String,
    enabled: bool,
    status: ProviderStatus,
    access_url: Option<String>,
    /// Sub-account login under the owning account (may be empty)
    account: String,
    /// Encrypted secret
    #[serde(skip_serializing, default)]
    secret: String,
    /// Owning account; legacy migrated records may lack one
    cloud_account_id: Option<CloudAccountId>,
    project_id: Option<ProjectId>,
    last_sync: Option<DateTime<Utc>>,
    kind: ProviderKind,
    sysinfo: Option<serde_json::Value>,
    version: Option<String>,
    /// Optimistic concurrency counter, bumped by every stored update
    revision: u64,
    created_at: DateTime<Utc>,
}

impl CloudProvider {
    /// Creates a new enabled registration in `init` state
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        cloud_account_id: CloudAccountId,
    ) -> Self {
        Self::with_id(
            ProviderId::new(),
            name,
            kind,
            Some(cloud_account_id),
            Utc::now(),
        )
    }

    /// Creates a registration with a specific ID (for reconstitution from storage)
    pub fn with_id(
        id: ProviderId,
        name: impl Into<String>,
        kind: ProviderKind,
        cloud_account_id: Option<CloudAccountId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            status: ProviderStatus::Init,
            access_url: None,
            account: String::new(),
            secret: String::new(),
            cloud_account_id,
            project_id: None,
            last_sync: None,
            kind,
            sysinfo: None,
            version: None,
            revision: 0,
            created_at,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> ProviderStatus {
        self.status
    }

    pub fn access_url(&self) -> Option<&str> {
        self.access_url.as_deref()
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns the encrypted secret
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn cloud_account_id(&self) -> Option<&CloudAccountId> {
        self.cloud_account_id.as_ref()
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        self.project_id.as_ref()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn sysinfo(&self) -> Option<&serde_json::Value> {
        self.sysinfo.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // --- Builder-style setters used by onboarding and storage ---

    pub fn with_access_url(mut self, url: impl Into<String>) -> Self {
        self.access_url = Some(url.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Sets the already-encrypted secret
    pub fn with_secret(mut self, ciphertext: impl Into<String>) -> Self {
        self.secret = ciphertext.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    // --- Sync state machine ---

    /// Decides whether a new sync may start at `now`
    ///
    /// A registration in `syncing` is eligible only when its last sync is
    /// unset or strictly older than `window`; a sync stuck for exactly
    /// `window` is still considered alive. Every other status is eligible.
    pub fn can_sync(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.status != ProviderStatus::Syncing {
            return true;
        }
        match self.last_sync {
            None => true,
            Some(last) => now - last > window,
        }
    }

    /// Stamps the registration as having a sync submitted at `now`
    pub fn mark_start_sync(&mut self, now: DateTime<Utc>) {
        self.status = ProviderStatus::StartSync;
        self.last_sync = Some(now);
    }

    /// Moves to `to` if the state machine allows it
    ///
    /// # Errors
    /// Returns `ProviderError::InvalidStatus` for a forbidden transition
    pub fn transition_to(&mut self, to: ProviderStatus) -> Result<(), ProviderError> {
        if !self.status.can_transition_to(to) {
            return Err(ProviderError::InvalidStatus(format!(
                "cannot move provider {} from {} to {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    // --- Other mutations ---

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_project_id(&mut self, project_id: ProjectId) {
        self.project_id = Some(project_id);
    }

    pub fn set_sysinfo(&mut self, sysinfo: serde_json::Value) {
        self.sysinfo = Some(sysinfo);
    }

    /// Restores fields that are not part of the constructor (storage only)
    pub fn restore(
        &mut self,
        enabled: bool,
        status: ProviderStatus,
        project_id: Option<ProjectId>,
        last_sync: Option<DateTime<Utc>>,
        sysinfo: Option<serde_json::Value>,
        revision: u64,
    ) {
        self.enabled = enabled;
        self.status = status;
        self.project_id = project_id;
        self.last_sync = last_sync;
        self.sysinfo = sysinfo;
        self.revision = revision;
    }

    /// Records the revision written by the repository
    pub fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider() -> CloudProvider {
        CloudProvider::new("aliyun-cn", ProviderKind::Aliyun, CloudAccountId::new())
    }

    fn window() -> Duration {
        Duration::seconds(DEFAULT_STALENESS_WINDOW_SECS)
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_default_is_init() {
            assert_eq!(ProviderStatus::default(), ProviderStatus::Init);
        }

        #[test]
        fn test_string_roundtrip() {
            for status in [
                ProviderStatus::Init,
                ProviderStatus::Connected,
                ProviderStatus::Disconnected,
                ProviderStatus::StartSync,
                ProviderStatus::Syncing,
            ] {
                assert_eq!(status.as_str().parse::<ProviderStatus>().unwrap(), status);
            }
            assert!("paused".parse::<ProviderStatus>().is_err());
        }

        #[test]
        fn test_serialization() {
            let json = serde_json::to_string(&ProviderStatus::StartSync).unwrap();
            assert_eq!(json, "\"start_sync\"");
        }

        #[test]
        fn test_allowed_transitions() {
            use ProviderStatus::*;
            assert!(Init.can_transition_to(Connected));
            assert!(Connected.can_transition_to(Disconnected));
            assert!(Disconnected.can_transition_to(Connected));
            assert!(StartSync.can_transition_to(Syncing));
            assert!(Syncing.can_transition_to(Connected));
            assert!(Syncing.can_transition_to(Disconnected));

            assert!(!Connected.can_transition_to(Init));
            assert!(!Syncing.can_transition_to(StartSync));
            assert!(!Connected.can_transition_to(Syncing));
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn test_kind_parse() {
            assert_eq!("VMware".parse::<ProviderKind>().unwrap(), ProviderKind::VMware);
            assert_eq!("Azure".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);
            assert!("vmware".parse::<ProviderKind>().is_err());
        }

        #[test]
        fn test_kind_serde_matches_display() {
            for kind in ProviderKind::ALL {
                let json = serde_json::to_string(&kind).unwrap();
                assert_eq!(json, format!("\"{}\"", kind));
            }
        }
    }

    mod can_sync_tests {
        use super::*;

        #[test]
        fn test_non_syncing_always_eligible() {
            let now = Utc::now();
            let mut provider = create_test_provider();
            for status in [
                ProviderStatus::Init,
                ProviderStatus::Connected,
                ProviderStatus::Disconnected,
                ProviderStatus::StartSync,
            ] {
                provider.restore(true, status, None, Some(now), None, 0);
                assert!(provider.can_sync(now, window()), "{status} should be eligible");
            }
        }

        #[test]
        fn test_syncing_without_last_sync_is_eligible() {
            let mut provider = create_test_provider();
            provider.restore(true, ProviderStatus::Syncing, None, None, None, 0);
            assert!(provider.can_sync(Utc::now(), window()));
        }

        #[test]
        fn test_syncing_just_now_is_not_eligible() {
            let now = Utc::now();
            let mut provider = create_test_provider();
            provider.restore(true, ProviderStatus::Syncing, None, Some(now), None, 0);
            assert!(!provider.can_sync(now, window()));
        }

        #[test]
        fn test_staleness_boundary() {
            let now = Utc::now();
            let mut provider = create_test_provider();

            provider.restore(
                true,
                ProviderStatus::Syncing,
                None,
                Some(now - Duration::seconds(901)),
                None,
                0,
            );
            assert!(provider.can_sync(now, window()));

            provider.restore(
                true,
                ProviderStatus::Syncing,
                None,
                Some(now - Duration::seconds(899)),
                None,
                0,
            );
            assert!(!provider.can_sync(now, window()));

            // Exactly at the window the sync is still presumed alive
            provider.restore(
                true,
                ProviderStatus::Syncing,
                None,
                Some(now - Duration::seconds(900)),
                None,
                0,
            );
            assert!(!provider.can_sync(now, window()));
        }

        #[test]
        fn test_custom_window() {
            let now = Utc::now();
            let mut provider = create_test_provider();
            provider.restore(
                true,
                ProviderStatus::Syncing,
                None,
                Some(now - Duration::seconds(61)),
                None,
                0,
            );
            assert!(provider.can_sync(now, Duration::seconds(60)));
            assert!(!provider.can_sync(now, window()));
        }
    }

    mod provider_tests {
        use super::*;

        #[test]
        fn test_new_provider() {
            let provider = create_test_provider();
            assert_eq!(provider.name(), "aliyun-cn");
            assert!(provider.enabled());
            assert_eq!(provider.status(), ProviderStatus::Init);
            assert!(provider.last_sync().is_none());
            assert!(provider.project_id().is_none());
            assert_eq!(provider.revision(), 0);
        }

        #[test]
        fn test_mark_start_sync() {
            let now = Utc::now();
            let mut provider = create_test_provider();
            provider.mark_start_sync(now);
            assert_eq!(provider.status(), ProviderStatus::StartSync);
            assert_eq!(provider.last_sync(), Some(now));
        }

        #[test]
        fn test_transition_to_rejects_invalid() {
            let mut provider = create_test_provider();
            let err = provider.transition_to(ProviderStatus::Syncing).unwrap_err();
            assert!(matches!(err, ProviderError::InvalidStatus(_)));
            assert_eq!(provider.status(), ProviderStatus::Init);

            provider.mark_start_sync(Utc::now());
            provider.transition_to(ProviderStatus::Syncing).unwrap();
            provider.transition_to(ProviderStatus::Connected).unwrap();
            assert_eq!(provider.status(), ProviderStatus::Connected);
        }

        #[test]
        fn test_secret_is_not_serialized() {
            let provider = create_test_provider().with_secret("ciphertext");
            let json = serde_json::to_value(&provider).unwrap();
            assert!(json.get("secret").is_none());
            assert_eq!(json["kind"], "Aliyun");
        }
    }
}
