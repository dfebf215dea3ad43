//! Sync command

use anyhow::{Context as _, Result};
use quiver_extensions::{SyncOutcome, SyncStatus};
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

use super::Context;
use crate::cli::SyncArgs;
use crate::output;

#[derive(Tabled)]
struct SyncRow {
    name: String,
    #[tabled(rename = "type")]
    unit_type: String,
    result: String,
    detail: String,
}

impl From<&SyncOutcome> for SyncRow {
    fn from(outcome: &SyncOutcome) -> Self {
        let (result, detail) = match &outcome.status {
            SyncStatus::Unchanged { version } => ("unchanged", version.clone()),
            SyncStatus::Updated { from, to } => ("updated", format!("{} -> {}", from, to)),
            SyncStatus::Skipped { reason } => ("skipped", reason.clone()),
            SyncStatus::Errored { message } => ("error", message.clone()),
        };
        Self {
            name: outcome.id.clone(),
            unit_type: outcome.unit_type.to_string(),
            result: result.to_string(),
            detail,
        }
    }
}

/// Reinstall catalog-managed units whose version drifted
pub async fn run(args: SyncArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    let report = service.sync().await.context("Sync failed")?;
    debug!(
        "Sync checked {} unit(s), document changed: {}",
        report.outcomes.len(),
        report.changed
    );

    if args.json {
        return output::json(&report);
    }

    if report.outcomes.is_empty() {
        output::info("No catalog-managed units installed");
        return Ok(());
    }

    let rows: Vec<SyncRow> = report.outcomes.iter().map(SyncRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    let updated = report.count(|s| matches!(s, SyncStatus::Updated { .. }));
    let errored = report.count(|s| matches!(s, SyncStatus::Errored { .. }));
    if errored > 0 {
        output::warning(&format!("{} unit(s) failed to update", errored));
    }
    output::success(&format!(
        "{} checked, {} updated",
        report.outcomes.len(),
        updated
    ));
    Ok(())
}
