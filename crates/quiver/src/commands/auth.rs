//! Credential diagnostics
//!
//! Neither command prints token material.

use anyhow::Result;
use quiver_secrets::build_registry_auth_env;

use super::Context;
use crate::cli::AuthCommands;
use crate::output;

pub async fn run(cmd: AuthCommands, ctx: &Context) -> Result<()> {
    match cmd {
        AuthCommands::Token => token(ctx).await,
        AuthCommands::Env => env(ctx).await,
    }
}

async fn token(ctx: &Context) -> Result<()> {
    let service = ctx.service()?;
    let chain = service.credentials().strategy_names();
    output::kv("strategies", &display_chain(&chain));

    match service.probe_token().await {
        Some((strategy, token)) => output::success(&format!(
            "Token obtained via {} ({} characters)",
            strategy,
            token.len()
        )),
        None => output::warning("No credential strategy produced a token"),
    }
    Ok(())
}

async fn env(ctx: &Context) -> Result<()> {
    let service = ctx.service()?;

    let registry = match service.registry_url(None) {
        Some(url) => Some(url),
        None => match service.fetch_catalog().await {
            Ok(catalog) => service.registry_url(Some(&catalog)),
            Err(e) => {
                output::warning(&format!("Catalog unavailable: {}", e));
                None
            }
        },
    };
    let Some(registry) = registry else {
        output::warning("No registry configured and the catalog names none");
        return Ok(());
    };
    output::kv("registry", &registry);

    let Some((strategy, token)) = service.probe_token().await else {
        output::warning("No token available; package installs will be unauthenticated");
        return Ok(());
    };
    output::kv("token source", strategy);
    for name in build_registry_auth_env(&registry, &token).keys() {
        println!("  {}", name);
    }
    Ok(())
}

fn display_chain(chain: &[&str]) -> String {
    if chain.is_empty() {
        "(none)".to_string()
    } else {
        chain.join(" -> ")
    }
}
