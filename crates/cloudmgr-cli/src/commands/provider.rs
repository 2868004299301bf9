//! Provider command - Manage cloud provider registrations
//!
//! Provides the `cloudmgr provider` subcommands:
//! - `add` registers a provider under a new owning account
//! - `show`, `usage` and `tasks` inspect a registration
//! - `credentials` resolves the live-connection credentials
//! - `sync` requests a reconciliation pass
//! - `enable` / `disable` / `check-delete` manage its lifecycle
//! - `sysinfo` records system information reported by the cloud

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use tracing::info;

use cloudmgr_core::config::Config;
use cloudmgr_core::domain::{
    CloudAccount, CloudProvider, DependentKind, ProviderId, ProviderKind, UsageSnapshot,
};
use cloudmgr_core::ports::{IResourceRepository, ISecretStore};
use cloudmgr_core::usecases::SyncOutcome;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Provider subcommands
#[derive(Debug, Subcommand)]
pub enum ProviderCommand {
    /// Register a provider under a new owning account
    Add(AddArgs),
    /// Show a registration with its usage
    Show {
        /// Provider id or name
        provider: String,
    },
    /// Count resources that depend on a registration
    Usage {
        /// Provider id or name
        provider: String,
    },
    /// Resolve endpoint and login used for live connections
    Credentials {
        /// Provider id or name
        provider: String,
    },
    /// Request a sync of a registration
    Sync(SyncArgs),
    /// Enable a registration
    Enable {
        /// Provider id or name
        provider: String,
    },
    /// Disable a registration
    Disable {
        /// Provider id or name
        provider: String,
    },
    /// Check whether a registration may be deleted
    CheckDelete {
        /// Provider id or name
        provider: String,
    },
    /// Record system information from a JSON file
    Sysinfo {
        /// Provider id or name
        provider: String,
        /// JSON document to store
        #[arg(long)]
        file: PathBuf,
    },
    /// List sync tasks submitted for a registration
    Tasks {
        /// Provider id or name
        provider: String,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Registration name (must be unique)
    pub name: String,
    /// Provider kind, e.g. Aliyun, Azure, VMware
    #[arg(long)]
    pub kind: String,
    /// API endpoint URL
    #[arg(long)]
    pub access_url: Option<String>,
    /// Login of the owning account
    #[arg(long)]
    pub account: String,
    /// Secret of the owning account (stored encrypted)
    #[arg(long)]
    pub secret: String,
    /// Sub-account login of this registration
    #[arg(long)]
    pub sub_account: Option<String>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Provider id or name
    pub provider: String,
    /// Start even if a sync is already in flight
    #[arg(long)]
    pub force: bool,
    /// Request a full instead of an incremental sync
    #[arg(long)]
    pub full: bool,
    /// Limit to a region (id or name); repeatable
    #[arg(long = "region")]
    pub regions: Vec<String>,
    /// Limit to a zone (id or name); repeatable
    #[arg(long = "zone")]
    pub zones: Vec<String>,
    /// Limit to a host (id or name); repeatable
    #[arg(long = "host")]
    pub hosts: Vec<String>,
}

impl SyncArgs {
    /// Request payload in the shape accepted by `perform_sync`
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "force": self.force,
            "full_sync": self.full,
            "region": self.regions,
            "zone": self.zones,
            "host": self.hosts,
        })
    }
}

impl ProviderCommand {
    /// Execute the provider command
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ctx = AppContext::open(config).await?;

        let result = match self {
            ProviderCommand::Add(args) => execute_add(&ctx, args, format, &*formatter).await,
            ProviderCommand::Show { provider } => {
                execute_show(&ctx, provider, format, &*formatter).await
            }
            ProviderCommand::Usage { provider } => {
                execute_usage(&ctx, provider, format, &*formatter).await
            }
            ProviderCommand::Credentials { provider } => {
                execute_credentials(&ctx, provider, format, &*formatter).await
            }
            ProviderCommand::Sync(args) => execute_sync(&ctx, args, format, &*formatter).await,
            ProviderCommand::Enable { provider } => {
                execute_set_enabled(&ctx, provider, true, &*formatter).await
            }
            ProviderCommand::Disable { provider } => {
                execute_set_enabled(&ctx, provider, false, &*formatter).await
            }
            ProviderCommand::CheckDelete { provider } => {
                execute_check_delete(&ctx, provider, format, &*formatter).await
            }
            ProviderCommand::Sysinfo { provider, file } => {
                execute_sysinfo(&ctx, provider, file, &*formatter).await
            }
            ProviderCommand::Tasks { provider } => {
                execute_tasks(&ctx, provider, format, &*formatter).await
            }
        };

        ctx.close().await;
        result
    }
}

async fn lookup(ctx: &AppContext, reference: &str) -> Result<CloudProvider> {
    Ok(ctx.queries().fetch_by_id_or_name(reference).await?)
}

fn print_usage(formatter: &dyn OutputFormatter, usage: &UsageSnapshot) {
    for kind in DependentKind::ALL {
        formatter.field(kind.as_str(), &usage.count(kind).to_string());
    }
}

async fn execute_add(
    ctx: &AppContext,
    args: &AddArgs,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let kind: ProviderKind = args.kind.parse()?;
    if ctx.repository.get_provider_by_name(&args.name).await?.is_some() {
        anyhow::bail!("a provider named '{}' already exists", args.name);
    }

    // Secrets are bound to the registration id, so it is chosen up front
    let id = ProviderId::new();
    let ciphertext = ctx
        .secrets
        .encrypt(&id.to_string(), &args.secret)
        .context("Failed to encrypt secret")?;

    let mut cloud_account = CloudAccount::new(&args.name, &args.account, ciphertext);
    if let Some(ref url) = args.access_url {
        cloud_account = cloud_account.with_access_url(url);
    }
    ctx.repository.save_cloud_account(&cloud_account).await?;

    let mut provider =
        CloudProvider::with_id(id, &args.name, kind, Some(*cloud_account.id()), Utc::now());
    if let Some(ref url) = args.access_url {
        provider = provider.with_access_url(url);
    }
    if let Some(ref sub) = args.sub_account {
        provider = provider.with_account(sub);
    }
    ctx.repository
        .insert_provider(&provider)
        .await
        .context("Failed to save provider")?;

    info!(provider_id = %id, name = %args.name, kind = %kind, "Registered provider");
    if format.is_json() {
        formatter.print_json(&serde_json::to_value(&provider)?);
    } else {
        formatter.success(&format!("Registered provider '{}' ({})", args.name, id));
    }
    Ok(())
}

async fn execute_show(
    ctx: &AppContext,
    reference: &str,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, reference).await?;
    let details = ctx.queries().details(&provider).await?;

    if format.is_json() {
        formatter.print_json(&serde_json::to_value(&details)?);
        return Ok(());
    }

    formatter.success(&format!("Provider {}", provider.name()));
    formatter.field("Id", &provider.id().to_string());
    formatter.field("Kind", provider.kind().as_str());
    formatter.field("Enabled", &provider.enabled().to_string());
    formatter.field("Status", provider.status().as_str());
    formatter.field("Access URL", provider.access_url().unwrap_or("-"));
    formatter.field(
        "Project",
        provider.project_id().map(|p| p.as_str()).unwrap_or("-"),
    );
    formatter.field(
        "Last sync",
        &provider
            .last_sync()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    );
    print_usage(formatter, &details.usage);
    Ok(())
}

async fn execute_usage(
    ctx: &AppContext,
    reference: &str,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, reference).await?;
    let usage = ctx.queries().details(&provider).await?.usage;

    if format.is_json() {
        formatter.print_json(&serde_json::to_value(usage)?);
    } else {
        formatter.success(&format!("Usage of {}", provider.name()));
        print_usage(formatter, &usage);
    }
    Ok(())
}

async fn execute_credentials(
    ctx: &AppContext,
    reference: &str,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, reference).await?;
    let credential = ctx.credentials().resolve(&provider).await?;

    // The secret never leaves the process
    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "access_url": credential.access_url,
            "account": credential.account,
        }));
    } else {
        formatter.success(&format!("Credentials of {} resolved", provider.name()));
        formatter.field("Access URL", credential.access_url.as_deref().unwrap_or("-"));
        formatter.field("Account", &credential.account);
        formatter.field("Secret", &format!("{:?}", credential.secret));
    }
    Ok(())
}

async fn execute_sync(
    ctx: &AppContext,
    args: &SyncArgs,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, &args.provider).await?;
    let outcome = ctx
        .sync()
        .perform_sync(&provider, &AppContext::requester(), &args.payload())
        .await?;

    match (outcome, format.is_json()) {
        (SyncOutcome::Submitted(handle), true) => formatter.print_json(&serde_json::json!({
            "submitted": true,
            "task_id": handle.id,
            "task_name": handle.task_name,
        })),
        (SyncOutcome::Submitted(handle), false) => formatter.success(&format!(
            "Sync task {} submitted for {}",
            handle.id,
            provider.name()
        )),
        (SyncOutcome::Skipped, true) => {
            formatter.print_json(&serde_json::json!({ "submitted": false }))
        }
        (SyncOutcome::Skipped, false) => formatter.warn(&format!(
            "A sync of {} is already in progress; use --force to start anyway",
            provider.name()
        )),
    }
    Ok(())
}

async fn execute_set_enabled(
    ctx: &AppContext,
    reference: &str,
    enabled: bool,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, reference).await?;
    ctx.repository
        .update_provider(provider.id(), &|current: &mut CloudProvider| {
            if enabled {
                current.enable();
            } else {
                current.disable();
            }
            Ok(())
        })
        .await?;

    let state = if enabled { "enabled" } else { "disabled" };
    info!(provider_id = %provider.id(), state, "Changed provider state");
    formatter.success(&format!("Provider {} {}", provider.name(), state));
    Ok(())
}

async fn execute_check_delete(
    ctx: &AppContext,
    reference: &str,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, reference).await?;
    let verdict = ctx.delete_guard().validate_delete(&provider).await;

    if format.is_json() {
        let json = match verdict {
            Ok(()) => serde_json::json!({ "deletable": true }),
            Err(ref e) => serde_json::json!({
                "deletable": false,
                "reason": e.kind(),
                "message": e.to_string(),
            }),
        };
        formatter.print_json(&json);
        return Ok(());
    }

    match verdict {
        Ok(()) => formatter.success(&format!("Provider {} can be deleted", provider.name())),
        Err(e) => formatter.warn(&format!("Provider {} cannot be deleted: {}", provider.name(), e)),
    }
    Ok(())
}

async fn execute_sysinfo(
    ctx: &AppContext,
    reference: &str,
    file: &Path,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let sysinfo: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let provider = lookup(ctx, reference).await?;
    ctx.queries().save_sysinfo(provider.id(), sysinfo).await?;
    formatter.success(&format!("Saved system info of {}", provider.name()));
    Ok(())
}

async fn execute_tasks(
    ctx: &AppContext,
    reference: &str,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let provider = lookup(ctx, reference).await?;
    let tasks = ctx.tasks.list_tasks_for_target(provider.id()).await?;

    if format.is_json() {
        formatter.print_json(&serde_json::to_value(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        formatter.info(&format!("No tasks submitted for {}", provider.name()));
        return Ok(());
    }
    formatter.success(&format!("{} task(s) for {}", tasks.len(), provider.name()));
    for task in &tasks {
        formatter.info(&format!(
            "{}  {:<9}  {}  by {}",
            task.id,
            task.stage.as_str(),
            task.created_at.format("%Y-%m-%d %H:%M:%S"),
            task.user_name
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_payload_shape() {
        let args = SyncArgs {
            provider: "aws-prod".into(),
            force: true,
            full: false,
            regions: vec!["us-east-1".into()],
            zones: vec![],
            hosts: vec![],
        };
        let range = cloudmgr_core::domain::SyncRange::from_json(&args.payload()).unwrap();
        assert!(range.force);
        assert!(!range.full_sync);
        assert_eq!(range.region, vec!["us-east-1".to_string()]);
    }
}
