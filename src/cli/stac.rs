//! `stac` subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config;
use crate::stac::{AssetMaterializer, CatalogGenerator};

#[derive(Subcommand, Debug)]
pub enum StacCommands {
    /// Download or copy the assets of a STAC item
    #[command(alias = "download-assets")]
    PrepareAssets {
        /// Item URL, or a directory containing catalog.json
        stac_input: String,

        /// Output directory, must not exist [default: ./stac-assets]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a STAC catalog from a directory of files
    GenerateCatalog {
        /// Directory of asset files
        #[arg(value_parser = existing_dir)]
        assets_path: PathBuf,

        /// Output directory, must not exist [default: ./stac-catalog]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Reject paths that are not existing directories at parse time
fn existing_dir(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("directory '{}' does not exist", value))
    }
}

pub async fn execute(command: StacCommands) -> Result<()> {
    let cfg = config::config()?;

    match command {
        StacCommands::PrepareAssets { stac_input, output } => {
            let output = output.unwrap_or_else(|| cfg.assets_dir.clone());
            let summary = AssetMaterializer::new(&cfg.http)?
                .prepare_assets(&stac_input, &output)
                .await
                .with_context(|| format!("Failed to prepare assets of {}", stac_input))?;

            tracing::info!(
                "{} asset(s) of item '{}' prepared in {}",
                summary.written.len(),
                summary.item_id,
                output.display()
            );
            Ok(())
        }
        StacCommands::GenerateCatalog {
            assets_path,
            output,
        } => {
            let output = output.unwrap_or_else(|| cfg.catalog_dir.clone());
            let generated = CatalogGenerator::new(cfg.catalog.clone())
                .generate(&assets_path, &output)
                .await
                .with_context(|| {
                    format!("Failed to generate catalog from {}", assets_path.display())
                })?;

            tracing::info!(
                "catalog '{}' with {} asset(s) written to {}",
                generated.catalog_id,
                generated.asset_count,
                generated.catalog_file.display()
            );
            Ok(())
        }
    }
}
