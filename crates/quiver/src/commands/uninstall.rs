//! Uninstall command

use anyhow::{Context as _, Result};
use quiver_core::types::UnitType;

use super::Context;
use crate::cli::UninstallArgs;
use crate::output;

pub async fn run(args: UninstallArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    let unit_type: UnitType = args.unit_type.into();

    let outcome = service
        .uninstall(&args.id, unit_type)
        .await
        .with_context(|| format!("Failed to uninstall {} '{}'", unit_type, args.id))?;

    match &outcome.removed_path {
        Some(path) => output::success(&format!(
            "Removed {} '{}' ({})",
            outcome.unit_type,
            outcome.id,
            path.display()
        )),
        None => output::success(&format!(
            "Removed {} '{}' from the ledger; nothing was on disk",
            outcome.unit_type, outcome.id
        )),
    }
    Ok(())
}
