//! Owning cloud account entity
//!
//! A cloud account is the shared credential envelope that one or more
//! provider registrations operate under (e.g. one registration per region).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::CloudAccountId;

/// Shared credential/tenant envelope for provider registrations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAccount {
    id: CloudAccountId,
    name: String,
    access_url: Option<String>,
    /// Login identifier at the external cloud
    account: String,
    /// Encrypted secret
    #[serde(skip_serializing, default)]
    secret: String,
    created_at: DateTime<Utc>,
}

impl CloudAccount {
    /// Creates a new account with an already-encrypted secret
    pub fn new(
        name: impl Into<String>,
        account: impl Into<String>,
        secret_ciphertext: impl Into<String>,
    ) -> Self {
        Self::with_id(
            CloudAccountId::new(),
            name,
            account,
            secret_ciphertext,
            Utc::now(),
        )
    }

    /// Creates an account with a specific ID (for reconstitution from storage)
    pub fn with_id(
        id: CloudAccountId,
        name: impl Into<String>,
        account: impl Into<String>,
        secret_ciphertext: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            access_url: None,
            account: account.into(),
            secret: secret_ciphertext.into(),
            created_at,
        }
    }

    pub fn with_access_url(mut self, url: impl Into<String>) -> Self {
        self.access_url = Some(url.into());
        self
    }

    pub fn id(&self) -> &CloudAccountId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
