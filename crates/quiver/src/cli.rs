//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use quiver_core::types::UnitType;

/// Quiver - install extensions and skills from a remote catalog
#[derive(Parser, Debug)]
#[command(name = "quiver")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to runtime.yaml (defaults to ~/.quiver/runtime.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Catalog URL, overriding runtime settings
    #[arg(long, global = true)]
    pub catalog_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the remote catalog
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// List installed units and available updates
    Installed(InstalledArgs),

    /// Install an extension or skill from the catalog
    Install(InstallArgs),

    /// Remove an installed extension or skill
    Uninstall(UninstallArgs),

    /// Update catalog-managed units to the catalog's versions
    Sync(SyncArgs),

    /// Credential diagnostics
    #[command(subcommand)]
    Auth(AuthCommands),
}

/// Unit type as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeArg {
    Extension,
    Skill,
}

impl From<TypeArg> for UnitType {
    fn from(value: TypeArg) -> Self {
        match value {
            TypeArg::Extension => UnitType::Extension,
            TypeArg::Skill => UnitType::Skill,
        }
    }
}

// Catalog commands
#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Show every catalog entry
    Show(CatalogShowArgs),

    /// Search catalog entries by id, name, description or tag
    Search(CatalogSearchArgs),
}

#[derive(Args, Debug)]
pub struct CatalogShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CatalogSearchArgs {
    /// Text to look for (case-insensitive)
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InstalledArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Extension id or skill name
    pub id: String,

    /// Restrict the lookup to one unit type (extensions are tried first otherwise)
    #[arg(short = 't', long = "type", value_enum)]
    pub unit_type: Option<TypeArg>,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Extension id or skill name
    pub id: String,

    /// Unit type of the installed unit
    #[arg(short = 't', long = "type", value_enum)]
    pub unit_type: TypeArg,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Auth commands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Report which credential strategy yields a token (the token is not printed)
    Token,

    /// Show the registry auth variables handed to the package installer
    Env,
}
