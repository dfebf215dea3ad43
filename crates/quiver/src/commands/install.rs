//! Install command

use anyhow::{Context as _, Result};
use tracing::debug;

use super::Context;
use crate::cli::InstallArgs;
use crate::output;

/// Install an extension or skill from the catalog
///
/// - `quiver install memory-lance` tries extensions first, then skills
/// - `quiver install pdf --type skill` restricts the lookup
pub async fn run(args: InstallArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    output::info(&format!("Installing {}", args.id));

    debug!("Install requested for {} (type filter {:?})", args.id, args.unit_type);
    let outcome = service
        .install(&args.id, args.unit_type.map(Into::into))
        .await
        .with_context(|| format!("Failed to install '{}'", args.id))?;

    for warning in &outcome.warnings {
        output::warning(&warning.to_string());
    }
    output::success(&format!(
        "Installed {} '{}' {} to {}",
        outcome.unit_type,
        outcome.id,
        outcome.version,
        outcome.path.display()
    ));
    Ok(())
}
