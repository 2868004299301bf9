//! Legacy single-purpose vCenter records
//!
//! Before provider registrations existed, VMware endpoints were stored as
//! vCenter records. They are folded into registrations by the legacy
//! migration use case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    newtypes::ProviderId,
    provider::{CloudProvider, ProviderKind, ProviderStatus},
};

/// A legacy vCenter endpoint record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyVCenter {
    /// Carried over unchanged as the registration id
    pub id: ProviderId,
    pub name: String,
    pub status: ProviderStatus,
    pub hostname: String,
    pub port: u16,
    pub account: String,
    /// Encrypted password
    #[serde(skip_serializing, default)]
    pub password: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub sysinfo: Option<serde_json::Value>,
}

impl LegacyVCenter {
    /// Endpoint URL of the vCenter API
    pub fn access_url(&self) -> String {
        format!("https://{}:{}", self.hostname, self.port)
    }

    /// Builds the VMware registration that replaces this record
    ///
    /// `name` must already be unique among registrations.
    pub fn to_provider(&self, name: impl Into<String>) -> CloudProvider {
        let mut provider =
            CloudProvider::with_id(self.id, name, ProviderKind::VMware, None, Utc::now())
                .with_access_url(self.access_url())
                .with_account(self.account.clone())
                .with_secret(self.password.clone());
        provider.restore(
            true,
            self.status,
            None,
            self.last_sync,
            self.sysinfo.clone(),
            0,
        );
        provider
    }
}
