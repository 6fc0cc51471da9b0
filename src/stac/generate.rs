//! Catalog generation from a directory of processing outputs.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use super::io::save_self_contained;
use super::model::{Asset, Catalog, Item};
use super::assets::copy_file;
use super::{create_output, ensure_absent, PreconditionError, StacError};
use crate::config::CatalogSettings;

/// Id of the single item of a generated catalog
pub const OUTPUT_ITEM_ID: &str = "output";

/// Media type used when the extension is unknown
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Catalog id: `<prefix>-<8 random hex chars>-<unix timestamp>`
pub fn generate_catalog_id(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        &Uuid::new_v4().simple().to_string()[..8],
        Utc::now().timestamp()
    )
}

/// Media type inferred from the file extension
pub fn guess_media_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Result of a catalog generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCatalog {
    pub catalog_id: String,
    /// Path of the written `catalog.json`
    pub catalog_file: PathBuf,
    pub item_id: String,
    pub asset_count: usize,
}

/// Builds self-contained single-item catalogs
#[derive(Debug, Clone, Default)]
pub struct CatalogGenerator {
    settings: CatalogSettings,
}

impl CatalogGenerator {
    pub fn new(settings: CatalogSettings) -> Self {
        Self { settings }
    }

    /// Package every regular file directly inside `assets_path` into a new
    /// catalog at `catalog_path`, which must not exist yet.
    pub async fn generate(
        &self,
        assets_path: &Path,
        catalog_path: &Path,
    ) -> Result<GeneratedCatalog, StacError> {
        if !assets_path.is_dir() {
            return Err(PreconditionError::AssetsNotFound(assets_path.to_path_buf()).into());
        }
        ensure_absent(catalog_path)?;

        let mut catalog = Catalog::new(
            generate_catalog_id(&self.settings.id_prefix),
            self.settings.description.clone(),
        );
        let mut item = Item::new(OUTPUT_ITEM_ID, Utc::now());
        let item_dir = catalog_path.join(&item.id);

        let files = list_files(assets_path).await?;
        // The item document is written next to the copied assets
        let item_file = format!("{}.json", item.id);
        if files
            .iter()
            .any(|f| f.file_name().is_some_and(|n| n == item_file.as_str()))
        {
            return Err(StacError::ReservedAssetName { name: item_file });
        }

        create_output(catalog_path).await?;

        for source in files {
            let Some(name) = source.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let media_type = guess_media_type(&source);
            item.add_asset(name.clone(), Asset::new(name.clone()).with_media_type(media_type));

            let dest = item_dir.join(&name);
            tracing::info!("copy '{}' to: {}", source.display(), dest.display());
            copy_file(&source, &dest).await?;
        }

        let item_id = item.id.clone();
        let asset_count = item.assets.len();
        catalog.add_item(item);

        let catalog_file = save_self_contained(&mut catalog, catalog_path).await?;
        tracing::info!("STAC catalog saved to: {}", catalog_path.display());

        Ok(GeneratedCatalog {
            catalog_id: catalog.id,
            catalog_file,
            item_id,
            asset_count,
        })
    }
}

/// Regular files directly inside `dir` (symlinks followed), sorted by name
async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, StacError> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| StacError::io(dir, e))?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| StacError::io(dir, e))? {
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::debug!("ignoring '{}': {}", path.display(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Generate a catalog with default settings
pub async fn generate_catalog(
    assets_path: &Path,
    catalog_path: &Path,
) -> Result<GeneratedCatalog, StacError> {
    CatalogGenerator::default()
        .generate(assets_path, catalog_path)
        .await
}
