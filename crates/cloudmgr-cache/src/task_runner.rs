//! SQLite-backed task runner
//!
//! Submitting a task records it in the `tasks` table in the `queued` stage;
//! scheduling moves it to `scheduled`, where the worker process picks it up.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use cloudmgr_core::domain::{ProviderId, TaskId};
use cloudmgr_core::ports::{ITaskRunner, TaskHandle, TaskRequest};

use crate::CacheError;

/// Lifecycle stage of a recorded task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    /// Submitted, not yet handed to a worker
    Queued,
    /// Waiting in the execution queue
    Scheduled,
}

impl TaskStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStage::Queued => "queued",
            TaskStage::Scheduled => "scheduled",
        }
    }
}

impl FromStr for TaskStage {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStage::Queued),
            "scheduled" => Ok(TaskStage::Scheduled),
            other => Err(CacheError::SerializationError(format!(
                "Unknown task stage '{}'",
                other
            ))),
        }
    }
}

/// A stored task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub task_name: String,
    pub target_type: String,
    pub target_id: ProviderId,
    pub target_name: String,
    pub params: serde_json::Value,
    pub user_name: String,
    pub parent_task_id: Option<TaskId>,
    pub stage: TaskStage,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Task runner that persists submissions to SQLite
pub struct SqliteTaskRunner {
    pool: SqlitePool,
}

impl SqliteTaskRunner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Looks up a task by id
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<TaskRecord>, CacheError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    /// Lists the tasks submitted for a provider, newest first
    pub async fn list_tasks_for_target(
        &self,
        target_id: &ProviderId,
    ) -> Result<Vec<TaskRecord>, CacheError> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE target_id = ? ORDER BY created_at DESC")
            .bind(target_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(task_from_row).collect()
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_task_id(s: &str) -> Result<TaskId, CacheError> {
    TaskId::from_str(s)
        .map_err(|e| CacheError::SerializationError(format!("Invalid TaskId '{}': {}", s, e)))
}

fn task_from_row(row: &SqliteRow) -> Result<TaskRecord, CacheError> {
    let id_str: String = row.get("id");
    let target_id_str: String = row.get("target_id");
    let params_str: String = row.get("params");
    let parent_str: Option<String> = row.get("parent_task_id");
    let stage_str: String = row.get("stage");
    let created_at_str: String = row.get("created_at");
    let scheduled_at_str: Option<String> = row.get("scheduled_at");

    Ok(TaskRecord {
        id: parse_task_id(&id_str)?,
        task_name: row.get("task_name"),
        target_type: row.get("target_type"),
        target_id: ProviderId::from_str(&target_id_str).map_err(|e| {
            CacheError::SerializationError(format!(
                "Invalid ProviderId '{}': {}",
                target_id_str, e
            ))
        })?,
        target_name: row.get("target_name"),
        params: serde_json::from_str(&params_str).map_err(|e| {
            CacheError::SerializationError(format!("Invalid task params: {}", e))
        })?,
        user_name: row.get("user_name"),
        parent_task_id: parent_str.as_deref().map(parse_task_id).transpose()?,
        stage: TaskStage::from_str(&stage_str)?,
        created_at: parse_datetime(&created_at_str)?,
        scheduled_at: scheduled_at_str.as_deref().map(parse_datetime).transpose()?,
    })
}

#[async_trait::async_trait]
impl ITaskRunner for SqliteTaskRunner {
    async fn submit(&self, request: &TaskRequest) -> anyhow::Result<TaskHandle> {
        let id = TaskId::new();
        let params = serde_json::to_string(&request.params)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO tasks \
             (id, task_name, target_type, target_id, target_name, params, user_id, user_name, \
              parent_task_id, stage, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&request.task_name)
        .bind(&request.target_type)
        .bind(request.target_id.to_string())
        .bind(&request.target_name)
        .bind(params)
        .bind(&request.requester.user_id)
        .bind(&request.requester.user_name)
        .bind(request.parent_task_id.map(|p| p.to_string()))
        .bind(TaskStage::Queued.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        tracing::debug!(
            task_id = %id,
            task = %request.task_name,
            target = %request.target_id,
            "Task submitted"
        );

        Ok(TaskHandle {
            id,
            task_name: request.task_name.clone(),
            target_id: request.target_id,
        })
    }

    async fn schedule_run(&self, handle: &TaskHandle) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE tasks SET stage = ?, scheduled_at = ? WHERE id = ? AND stage = ?",
        )
        .bind(TaskStage::Scheduled.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(handle.id.to_string())
        .bind(TaskStage::Queued.as_str())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        if result.rows_affected() == 0 {
            anyhow::bail!("task {} is not queued", handle.id);
        }

        tracing::debug!(task_id = %handle.id, "Task scheduled");
        Ok(())
    }
}
