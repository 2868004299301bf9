//! Cloud driver port
//!
//! A driver is a live connection handle to the external cloud endpoint,
//! built from a registration and its resolved credential. The per-cloud
//! implementations live outside this workspace.

use crate::domain::{CloudProvider, Credential};

/// A live connection to an external cloud endpoint
#[async_trait::async_trait]
pub trait ICloudDriver: Send + Sync {
    /// Queries the account balance at the external cloud
    async fn get_balance(&self) -> anyhow::Result<f64>;
}

/// Builds drivers for registrations
#[async_trait::async_trait]
pub trait ICloudDriverFactory: Send + Sync {
    /// Opens a connection for `provider` using `credential`
    async fn connect(
        &self,
        provider: &CloudProvider,
        credential: &Credential,
    ) -> anyhow::Result<Box<dyn ICloudDriver>>;
}
