//! Catalog show and search commands

use anyhow::{Context as _, Result};
use quiver_catalog::{search, SearchResults};
use quiver_core::types::{ExtensionEntry, SkillEntry};
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::{CatalogCommands, CatalogSearchArgs, CatalogShowArgs};
use crate::output;

#[derive(Tabled)]
struct ExtensionRow {
    id: String,
    kind: String,
    version: String,
    description: String,
}

impl From<&ExtensionEntry> for ExtensionRow {
    fn from(entry: &ExtensionEntry) -> Self {
        Self {
            id: entry.id.clone(),
            kind: entry.kind.to_string(),
            version: entry.version.clone(),
            description: entry.description.clone(),
        }
    }
}

#[derive(Tabled)]
struct SkillRow {
    name: String,
    version: String,
    description: String,
}

impl From<&SkillEntry> for SkillRow {
    fn from(entry: &SkillEntry) -> Self {
        Self {
            name: entry.name.clone(),
            version: entry.version.clone(),
            description: entry.description.clone(),
        }
    }
}

/// Main entry point for catalog subcommands
pub async fn run(cmd: CatalogCommands, ctx: &Context) -> Result<()> {
    match cmd {
        CatalogCommands::Show(args) => show(args, ctx).await,
        CatalogCommands::Search(args) => search_catalog(args, ctx).await,
    }
}

async fn show(args: CatalogShowArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    let catalog = service
        .fetch_catalog()
        .await
        .context("Failed to fetch catalog")?;

    if args.json {
        return output::json(&catalog);
    }

    output::header("Catalog");
    output::kv("version", &catalog.version.to_string());
    if let Some(updated) = &catalog.updated_at {
        output::kv("updated", updated);
    }
    if let Some(registry) = &catalog.registry {
        output::kv("registry", registry);
    }
    print_entries(&SearchResults {
        extensions: catalog.extensions,
        skills: catalog.skills,
    });
    Ok(())
}

async fn search_catalog(args: CatalogSearchArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    let catalog = service
        .fetch_catalog()
        .await
        .context("Failed to fetch catalog")?;
    let results = search(&catalog, &args.query);

    if args.json {
        return output::json(&results);
    }

    if results.is_empty() {
        output::info(&format!("No catalog entries match '{}'", args.query));
        return Ok(());
    }
    output::info(&format!("{} match(es) for '{}'", results.len(), args.query));
    print_entries(&results);
    Ok(())
}

fn print_entries(results: &SearchResults) {
    if !results.extensions.is_empty() {
        output::header("Extensions");
        let rows: Vec<ExtensionRow> = results.extensions.iter().map(ExtensionRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }
    if !results.skills.is_empty() {
        output::header("Skills");
        let rows: Vec<SkillRow> = results.skills.iter().map(SkillRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }
}
