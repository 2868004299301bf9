//! Asynchronous task runner port
//!
//! Only the submission contract lives here. Executing the task (moving the
//! registration to `syncing` and then `connected`/`disconnected`) is the
//! runner's business.

use serde::{Deserialize, Serialize};

use crate::domain::{ProviderId, Requester, TaskId};

/// Task name of the provider sync task
pub const SYNC_INFO_TASK: &str = "CloudProviderSyncInfoTask";

/// Object type recorded as the task target
pub const PROVIDER_TARGET_TYPE: &str = "cloudprovider";

/// A task submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_name: String,
    pub target_type: String,
    pub target_id: ProviderId,
    pub target_name: String,
    pub params: serde_json::Value,
    pub requester: Requester,
    pub parent_task_id: Option<TaskId>,
}

/// Handle to a submitted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: TaskId,
    pub task_name: String,
    pub target_id: ProviderId,
}

/// Port trait for the asynchronous task runner
#[async_trait::async_trait]
pub trait ITaskRunner: Send + Sync {
    /// Records a new task; it does not run until scheduled
    async fn submit(&self, request: &TaskRequest) -> anyhow::Result<TaskHandle>;

    /// Hands a submitted task to the runner's execution queue
    async fn schedule_run(&self, handle: &TaskHandle) -> anyhow::Result<()>;
}
