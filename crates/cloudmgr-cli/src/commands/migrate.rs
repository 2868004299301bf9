//! Migrate command - Fold legacy vCenter records into provider registrations
//!
//! Each legacy record that has no registration yet becomes a VMware
//! registration with the same id; the record is then soft-deleted. Records
//! already migrated are skipped, so the command can be re-run safely.

use anyhow::Result;
use clap::Args;
use tracing::info;

use cloudmgr_core::config::Config;
use cloudmgr_core::ports::IResourceRepository;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct MigrateCommand {
    /// Only list the records that would be migrated
    #[arg(long)]
    pub dry_run: bool,
}

impl MigrateCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ctx = AppContext::open(config).await?;

        let result = if self.dry_run {
            self.preview(&ctx, format, &*formatter).await
        } else {
            self.run(&ctx, format, &*formatter).await
        };

        ctx.close().await;
        result
    }

    async fn run(
        &self,
        ctx: &AppContext,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let count = ctx.migration().execute().await?;
        info!(count, "Legacy migration finished");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({ "migrated": count }));
        } else if count == 0 {
            formatter.success("Nothing to migrate");
        } else {
            formatter.success(&format!("Migrated {} vCenter record(s)", count));
        }
        Ok(())
    }

    async fn preview(
        &self,
        ctx: &AppContext,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let mut pending = Vec::new();
        for vcenter in ctx.repository.list_legacy_vcenters().await? {
            if ctx.repository.get_provider(&vcenter.id).await?.is_none() {
                pending.push(vcenter);
            }
        }

        if format.is_json() {
            formatter.print_json(&serde_json::to_value(&pending)?);
            return Ok(());
        }

        if pending.is_empty() {
            formatter.success("Nothing to migrate");
        } else {
            formatter.success(&format!("{} vCenter record(s) would be migrated", pending.len()));
            for vcenter in &pending {
                formatter.info(&format!("{}  {}  {}", vcenter.id, vcenter.name, vcenter.access_url()));
            }
        }
        Ok(())
    }
}
