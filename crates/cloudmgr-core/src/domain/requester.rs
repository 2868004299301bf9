//! Authenticated caller of provider operations

use serde::{Deserialize, Serialize};

use super::errors::ProviderError;

/// The identity on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub user_name: String,
    pub is_system_admin: bool,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            is_system_admin: false,
        }
    }

    /// Creates a requester holding the system-admin privilege
    pub fn system_admin(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            is_system_admin: true,
            ..Self::new(user_id, user_name)
        }
    }

    /// # Errors
    /// Returns `ProviderError::Forbidden` unless the requester is a system admin
    pub fn require_system_admin(&self, operation: &str) -> Result<(), ProviderError> {
        if self.is_system_admin {
            Ok(())
        } else {
            Err(ProviderError::Forbidden(format!(
                "{} requires system admin privilege (user {})",
                operation, self.user_name
            )))
        }
    }
}
