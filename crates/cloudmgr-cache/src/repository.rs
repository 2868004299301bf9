//! SQLite implementation of IResourceRepository
//!
//! ## Type Mapping
//!
//! | Domain Type                 | SQL Type | Strategy                                  |
//! |-----------------------------|----------|-------------------------------------------|
//! | ProviderId, CloudAccountId  | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | ProjectId                   | TEXT     | String via `.as_str()` / `ProjectId::new()` |
//! | ProviderStatus, ProviderKind| TEXT     | `.as_str()` / `FromStr`                    |
//! | DateTime<Utc>               | TEXT     | RFC 3339                                  |
//! | sysinfo                     | TEXT     | serde_json serialization                  |
//! | revision                    | INTEGER  | optimistic concurrency counter            |
//!
//! ## Optimistic updates
//!
//! [`IResourceRepository::update_provider`] reads the row, applies the
//! mutator and writes back with `WHERE id = ? AND revision = ?`. When the
//! write matches no row another writer got in first: the row is re-read
//! and the mutator re-run, up to `max_update_retries` times.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use cloudmgr_core::domain::{
    CatalogEntry, CatalogKind, CloudAccount, CloudAccountId, CloudProvider, DependentKind,
    LegacyVCenter, ProjectId, ProviderError, ProviderId, ProviderKind, ProviderStatus,
};
use cloudmgr_core::ports::{IResourceRepository, ProviderMutator};

use crate::CacheError;

/// Default number of optimistic update attempts
pub const DEFAULT_MAX_UPDATE_RETRIES: u32 = 3;

/// SQLite-based implementation of the resource repository port
pub struct SqliteResourceRepository {
    pool: SqlitePool,
    max_update_retries: u32,
}

impl SqliteResourceRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_update_retries: DEFAULT_MAX_UPDATE_RETRIES,
        }
    }

    /// Sets how many times a lost optimistic update is retried
    pub fn with_max_update_retries(mut self, retries: u32) -> Self {
        self.max_update_retries = retries.max(1);
        self
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a DateTime<Utc> from an RFC 3339 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn parse_optional_json(s: Option<String>) -> Result<Option<serde_json::Value>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => serde_json::from_str(val).map(Some).map_err(|e| {
            CacheError::SerializationError(format!("Invalid sysinfo JSON: {}", e))
        }),
        _ => Ok(None),
    }
}

fn json_to_string(value: Option<&serde_json::Value>) -> Option<String> {
    value.map(serde_json::Value::to_string)
}

fn parse_provider_id(s: &str) -> Result<ProviderId, CacheError> {
    ProviderId::from_str(s)
        .map_err(|e| CacheError::SerializationError(format!("Invalid ProviderId '{}': {}", s, e)))
}

fn parse_status(s: &str) -> Result<ProviderStatus, CacheError> {
    ProviderStatus::from_str(s)
        .map_err(|e| CacheError::SerializationError(format!("Unknown status '{}': {}", s, e)))
}

/// Maps a storage failure into the domain error
fn storage_error(e: impl Into<CacheError>) -> ProviderError {
    ProviderError::Repository(anyhow::Error::new(e.into()))
}

/// Table holding catalog entries of `kind`
fn catalog_table(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Region => "regions",
        CatalogKind::Zone => "zones",
        CatalogKind::Host => "hosts",
    }
}

/// Count query for dependents of `kind`; binds the provider id once
fn count_query(kind: DependentKind) -> &'static str {
    match kind {
        DependentKind::Instance => {
            "SELECT COUNT(*) FROM guests g JOIN hosts h ON g.host_id = h.id \
             WHERE h.manager_id = ?"
        }
        DependentKind::Host => "SELECT COUNT(*) FROM hosts WHERE manager_id = ?",
        DependentKind::Network => "SELECT COUNT(*) FROM networks WHERE manager_id = ?",
        DependentKind::Storage => "SELECT COUNT(*) FROM storages WHERE manager_id = ?",
        DependentKind::StorageCache => "SELECT COUNT(*) FROM storagecaches WHERE manager_id = ?",
        DependentKind::ExternalIp => "SELECT COUNT(*) FROM elasticips WHERE manager_id = ?",
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a CloudProvider from a database row
fn provider_from_row(row: &SqliteRow) -> Result<CloudProvider, CacheError> {
    let id_str: String = row.get("id");
    let name: String = row.get("name");
    let enabled: bool = row.get("enabled");
    let status_str: String = row.get("status");
    let access_url: Option<String> = row.get("access_url");
    let account: String = row.get("account");
    let secret: String = row.get("secret");
    let cloud_account_id_str: Option<String> = row.get("cloud_account_id");
    let project_id_str: Option<String> = row.get("project_id");
    let last_sync_str: Option<String> = row.get("last_sync");
    let kind_str: String = row.get("provider");
    let sysinfo_str: Option<String> = row.get("sysinfo");
    let version: Option<String> = row.get("version");
    let revision: i64 = row.get("revision");
    let created_at_str: String = row.get("created_at");

    let id = parse_provider_id(&id_str)?;
    let kind = ProviderKind::from_str(&kind_str).map_err(|e| {
        CacheError::SerializationError(format!("Unknown provider kind '{}': {}", kind_str, e))
    })?;
    let cloud_account_id = cloud_account_id_str
        .map(|s| {
            CloudAccountId::from_str(&s).map_err(|e| {
                CacheError::SerializationError(format!("Invalid CloudAccountId '{}': {}", s, e))
            })
        })
        .transpose()?;
    let project_id = project_id_str
        .filter(|s| !s.is_empty())
        .map(|s| {
            ProjectId::new(s.clone()).map_err(|e| {
                CacheError::SerializationError(format!("Invalid ProjectId '{}': {}", s, e))
            })
        })
        .transpose()?;

    let mut provider = CloudProvider::with_id(
        id,
        name,
        kind,
        cloud_account_id,
        parse_datetime(&created_at_str)?,
    )
    .with_account(account)
    .with_secret(secret);
    if let Some(url) = access_url {
        provider = provider.with_access_url(url);
    }
    if let Some(version) = version {
        provider = provider.with_version(version);
    }
    provider.restore(
        enabled,
        parse_status(&status_str)?,
        project_id,
        parse_optional_datetime(last_sync_str)?,
        parse_optional_json(sysinfo_str)?,
        revision as u64,
    );
    Ok(provider)
}

/// Reconstruct a CloudAccount from a database row
fn cloud_account_from_row(row: &SqliteRow) -> Result<CloudAccount, CacheError> {
    let id_str: String = row.get("id");
    let name: String = row.get("name");
    let access_url: Option<String> = row.get("access_url");
    let account: String = row.get("account");
    let secret: String = row.get("secret");
    let created_at_str: String = row.get("created_at");

    let id = CloudAccountId::from_str(&id_str).map_err(|e| {
        CacheError::SerializationError(format!("Invalid CloudAccountId '{}': {}", id_str, e))
    })?;

    let mut cloud_account =
        CloudAccount::with_id(id, name, account, secret, parse_datetime(&created_at_str)?);
    if let Some(url) = access_url {
        cloud_account = cloud_account.with_access_url(url);
    }
    Ok(cloud_account)
}

/// Reconstruct a LegacyVCenter from a database row
fn vcenter_from_row(row: &SqliteRow) -> Result<LegacyVCenter, CacheError> {
    let id_str: String = row.get("id");
    let status_str: String = row.get("status");
    let port: i64 = row.get("port");

    Ok(LegacyVCenter {
        id: parse_provider_id(&id_str)?,
        name: row.get("name"),
        status: parse_status(&status_str)?,
        hostname: row.get("hostname"),
        port: u16::try_from(port).map_err(|_| {
            CacheError::SerializationError(format!("Invalid port {} for vCenter {}", port, id_str))
        })?,
        account: row.get("account"),
        password: row.get("password"),
        last_sync: parse_optional_datetime(row.get("last_sync"))?,
        sysinfo: parse_optional_json(row.get("sysinfo"))?,
    })
}

// ============================================================================
// Seeding (onboarding, migration tooling and tests)
// ============================================================================

impl SqliteResourceRepository {
    /// Inserts or replaces an owning account
    pub async fn save_cloud_account(&self, cloud_account: &CloudAccount) -> anyhow::Result<()> {
        let id = cloud_account.id().to_string();
        sqlx::query(
            "INSERT OR REPLACE INTO cloud_accounts \
             (id, name, access_url, account, secret, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(cloud_account.name())
        .bind(cloud_account.access_url())
        .bind(cloud_account.account())
        .bind(cloud_account.secret())
        .bind(cloud_account.created_at().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(cloud_account_id = %id, "Saved cloud account");
        Ok(())
    }

    /// Inserts or replaces a region/zone/host catalog entry
    ///
    /// `manager` records the owning provider; only hosts keep it.
    pub async fn save_catalog_entry(
        &self,
        kind: CatalogKind,
        entry: &CatalogEntry,
        manager: Option<&ProviderId>,
    ) -> anyhow::Result<()> {
        let sql = match kind {
            CatalogKind::Host => {
                "INSERT OR REPLACE INTO hosts (id, name, manager_id) VALUES (?, ?, ?)"
            }
            CatalogKind::Region => "INSERT OR REPLACE INTO regions (id, name) VALUES (?, ?)",
            CatalogKind::Zone => "INSERT OR REPLACE INTO zones (id, name) VALUES (?, ?)",
        };
        let mut query = sqlx::query(sql).bind(&entry.id).bind(&entry.name);
        if kind == CatalogKind::Host {
            query = query.bind(manager.map(|id| id.to_string()));
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a legacy vCenter record
    pub async fn save_legacy_vcenter(&self, vcenter: &LegacyVCenter) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO vcenters \
             (id, name, status, hostname, port, account, password, last_sync, sysinfo, \
              deleted, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(vcenter.id.to_string())
        .bind(&vcenter.name)
        .bind(vcenter.status.as_str())
        .bind(&vcenter.hostname)
        .bind(i64::from(vcenter.port))
        .bind(&vcenter.account)
        .bind(&vcenter.password)
        .bind(vcenter.last_sync.map(|dt| dt.to_rfc3339()))
        .bind(json_to_string(vcenter.sysinfo.as_ref()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_provider(&self, id: &ProviderId) -> Result<Option<CloudProvider>, CacheError> {
        let row = sqlx::query("SELECT * FROM cloud_providers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(provider_from_row(r)?)),
            None => Ok(None),
        }
    }

    /// Writes `provider` if the stored revision is still `expected`
    ///
    /// Returns false when another writer bumped the revision first.
    async fn compare_and_write(
        &self,
        provider: &CloudProvider,
        expected: u64,
    ) -> Result<bool, CacheError> {
        let result = sqlx::query(
            "UPDATE cloud_providers SET \
             name = ?, enabled = ?, status = ?, access_url = ?, account = ?, secret = ?, \
             cloud_account_id = ?, project_id = ?, last_sync = ?, sysinfo = ?, version = ?, \
             revision = ? \
             WHERE id = ? AND revision = ?",
        )
        .bind(provider.name())
        .bind(provider.enabled())
        .bind(provider.status().as_str())
        .bind(provider.access_url())
        .bind(provider.account())
        .bind(provider.secret())
        .bind(provider.cloud_account_id().map(|id| id.to_string()))
        .bind(provider.project_id().map(|p| p.as_str().to_string()))
        .bind(provider.last_sync().map(|dt| dt.to_rfc3339()))
        .bind(json_to_string(provider.sysinfo()))
        .bind(provider.version())
        .bind((expected + 1) as i64)
        .bind(provider.id().to_string())
        .bind(expected as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_name(
        &self,
        sql: &str,
        what: &str,
        name: &str,
    ) -> anyhow::Result<Option<SqliteRow>> {
        let mut rows = sqlx::query(sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        if rows.len() > 1 {
            anyhow::bail!("{} name '{}' is ambiguous", what, name);
        }
        Ok(rows.pop())
    }
}

// ============================================================================
// IResourceRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IResourceRepository for SqliteResourceRepository {
    // --- Provider registrations ---

    async fn get_provider(&self, id: &ProviderId) -> anyhow::Result<Option<CloudProvider>> {
        Ok(self.fetch_provider(id).await?)
    }

    async fn get_provider_by_name(&self, name: &str) -> anyhow::Result<Option<CloudProvider>> {
        let row = sqlx::query("SELECT * FROM cloud_providers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(provider_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_provider(&self, provider: &CloudProvider) -> anyhow::Result<()> {
        let id = provider.id().to_string();
        sqlx::query(
            "INSERT INTO cloud_providers \
             (id, name, enabled, status, access_url, account, secret, cloud_account_id, \
              project_id, last_sync, provider, sysinfo, version, revision, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(provider.name())
        .bind(provider.enabled())
        .bind(provider.status().as_str())
        .bind(provider.access_url())
        .bind(provider.account())
        .bind(provider.secret())
        .bind(provider.cloud_account_id().map(|id| id.to_string()))
        .bind(provider.project_id().map(|p| p.as_str().to_string()))
        .bind(provider.last_sync().map(|dt| dt.to_rfc3339()))
        .bind(provider.kind().as_str())
        .bind(json_to_string(provider.sysinfo()))
        .bind(provider.version())
        .bind(provider.revision() as i64)
        .bind(provider.created_at().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(provider_id = %id, name = provider.name(), "Inserted provider");
        Ok(())
    }

    async fn update_provider(
        &self,
        id: &ProviderId,
        mutator: &ProviderMutator<'_>,
    ) -> Result<CloudProvider, ProviderError> {
        for attempt in 1..=self.max_update_retries {
            let current = self
                .fetch_provider(id)
                .await
                .map_err(storage_error)?
                .ok_or_else(|| ProviderError::not_found("Cloudprovider", id.to_string()))?;

            let expected = current.revision();
            let mut updated = current;
            mutator(&mut updated)?;

            if self
                .compare_and_write(&updated, expected)
                .await
                .map_err(storage_error)?
            {
                updated.set_revision(expected + 1);
                tracing::trace!(provider_id = %id, revision = expected + 1, "Updated provider");
                return Ok(updated);
            }

            tracing::debug!(
                provider_id = %id,
                attempt,
                "Provider changed concurrently, retrying update"
            );
        }

        Err(ProviderError::Conflict(format!(
            "provider {} kept changing concurrently; gave up after {} attempts",
            id, self.max_update_retries
        )))
    }

    // --- Owning accounts ---

    async fn get_cloud_account(
        &self,
        id: &CloudAccountId,
    ) -> anyhow::Result<Option<CloudAccount>> {
        let row = sqlx::query("SELECT * FROM cloud_accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(cloud_account_from_row(r)?)),
            None => Ok(None),
        }
    }

    // --- Catalog ---

    async fn get_catalog_entry(
        &self,
        kind: CatalogKind,
        id: &str,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        let sql = format!("SELECT id, name FROM {} WHERE id = ?", catalog_table(kind));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| CatalogEntry::new(r.get::<String, _>("id"), r.get::<String, _>("name"))))
    }

    async fn find_catalog_entry_by_name(
        &self,
        kind: CatalogKind,
        name: &str,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        let sql = format!(
            "SELECT id, name FROM {} WHERE name = ? LIMIT 2",
            catalog_table(kind)
        );
        let row = self.find_by_name(&sql, kind.label(), name).await?;

        Ok(row.map(|r| CatalogEntry::new(r.get::<String, _>("id"), r.get::<String, _>("name"))))
    }

    // --- Usage ---

    async fn count_dependents(
        &self,
        kind: DependentKind,
        provider_id: &ProviderId,
    ) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar(count_query(kind))
            .bind(provider_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    // --- Legacy records ---

    async fn list_legacy_vcenters(&self) -> anyhow::Result<Vec<LegacyVCenter>> {
        let rows = sqlx::query("SELECT * FROM vcenters WHERE deleted = 0 ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| vcenter_from_row(r).map_err(anyhow::Error::from))
            .collect()
    }

    async fn mark_legacy_vcenter_deleted(&self, id: &ProviderId) -> anyhow::Result<()> {
        sqlx::query("UPDATE vcenters SET deleted = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::debug!(vcenter_id = %id, "Marked vCenter deleted");
        Ok(())
    }
}
