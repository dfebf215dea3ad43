//! Installed units command

use anyhow::Result;
use quiver_extensions::InstalledUnit;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::InstalledArgs;
use crate::output;

#[derive(Tabled)]
struct InstalledRow {
    name: String,
    #[tabled(rename = "type")]
    unit_type: String,
    kind: String,
    #[tabled(rename = "installed version")]
    version: String,
    #[tabled(rename = "catalog version")]
    catalog_version: String,
    status: String,
    #[tabled(rename = "install date")]
    installed_at: String,
}

impl From<&InstalledUnit> for InstalledRow {
    fn from(unit: &InstalledUnit) -> Self {
        let status = if unit.update_available {
            "update available"
        } else if !unit.enabled {
            "disabled"
        } else if !unit.catalog_managed {
            "local"
        } else {
            "up to date"
        };
        Self {
            name: unit.id.clone(),
            unit_type: unit.unit_type.to_string(),
            kind: unit
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string()),
            version: unit.version.clone(),
            catalog_version: unit
                .catalog_version
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            status: status.to_string(),
            installed_at: unit
                .installed_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// List installed extensions and skills with catalog drift
pub async fn run(args: InstalledArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    let units = service.list_installed().await?;

    if args.json {
        return output::json(&units);
    }

    if units.is_empty() {
        output::info("Nothing installed");
        return Ok(());
    }

    let rows: Vec<InstalledRow> = units.iter().map(InstalledRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    let updates = units.iter().filter(|u| u.update_available).count();
    if updates > 0 {
        output::info(&format!(
            "{} update(s) available; run `quiver sync` to apply",
            updates
        ));
    }
    Ok(())
}
