//! Command-line interface for eoap-tools.
//!
//! Provides commands for preparing STAC assets, generating output catalogs
//! and downloading dataset repositories.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

pub mod sharinghub;
pub mod stac;

/// eoap-tools - Earth Observation Application Package tools
#[derive(Parser, Debug)]
#[command(name = "eoap-tools")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version and exit
    Version,

    /// Show resolved configuration (debug)
    Config,

    /// STAC assets and catalogs
    Stac {
        #[command(subcommand)]
        command: stac::StacCommands,
    },

    /// SharingHub datasets
    Sharinghub {
        #[command(subcommand)]
        command: sharinghub::SharinghubCommands,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Version => {
                show_version();
                Ok(())
            }
            Commands::Config => show_config(),
            Commands::Stac { command } => stac::execute(command).await,
            Commands::Sharinghub { command } => sharinghub::execute(command).await,
        }
    }
}

/// Package name, version and summary
pub fn version_text() -> String {
    format!(
        "{}: {}\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION")
    )
}

fn show_version() {
    println!("{}", version_text());
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = crate::config::config()?;

    println!("eoap-tools configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("HTTP:");
    println!("  Timeout:    {}s", cfg.http.timeout_seconds);
    println!("  User agent: {}", cfg.http.user_agent);
    println!();
    println!("Generated catalogs:");
    println!("  Id prefix:   {}", cfg.catalog.id_prefix);
    println!("  Description: {}", cfg.catalog.description);
    println!();
    println!("Default outputs:");
    println!("  Assets:  {}", cfg.assets_dir.display());
    println!("  Catalog: {}", cfg.catalog_dir.display());
    println!();
    println!("DVC binary: {}", cfg.dvc_binary);

    Ok(())
}
