//! Asset materialization: copy or download every asset of an item.
//!
//! The item comes either from a remote item URL or from the first item (in id
//! order) of `<input>/catalog.json`. Remote assets are streamed to
//! `<output>/<asset-key>`; local assets are copied to
//! `<output>/<source-file-name>`.
//!
//! Two assets mapping to the same destination overwrite each other in asset
//! key order (last write wins); the overwrite is reported, not rejected.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::io::{http_client, StacReader};
use super::model::Item;
use super::{create_output, ensure_absent, StacError};
use crate::config::HttpSettings;
use crate::utils::{is_url, local_path};

/// Progress notifications emitted while materializing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    /// A remote asset is about to be downloaded
    Downloading {
        key: String,
        href: String,
        dest: PathBuf,
    },
    /// A remote asset finished downloading
    Downloaded { key: String, bytes: u64 },
    /// A local asset is about to be copied
    Copying {
        key: String,
        source: PathBuf,
        dest: PathBuf,
    },
    /// No absolute location could be computed for the asset
    Skipped { key: String },
    /// A destination written earlier in this run is written again
    Overwriting { key: String, dest: PathBuf },
}

/// Callback receiving [`AssetEvent`]s
pub type AssetReporter = Arc<dyn Fn(&AssetEvent) + Send + Sync>;

/// Default reporter: log through tracing
fn log_event(event: &AssetEvent) {
    match event {
        AssetEvent::Downloading { href, dest, .. } => {
            tracing::info!("download '{}' to '{}'", href, dest.display());
        }
        AssetEvent::Downloaded { key, bytes } => {
            tracing::debug!("asset '{}': {} bytes", key, bytes);
        }
        AssetEvent::Copying { source, dest, .. } => {
            tracing::info!("copy '{}' to '{}'", source.display(), dest.display());
        }
        AssetEvent::Skipped { key } => {
            tracing::debug!("asset '{}' has no absolute href, skipped", key);
        }
        AssetEvent::Overwriting { key, dest } => {
            tracing::warn!("asset '{}' overwrites '{}'", key, dest.display());
        }
    }
}

/// Outcome of [`AssetMaterializer::prepare_assets`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    /// Id of the item whose assets were materialized
    pub item_id: String,
    /// Destination of every written asset, in processing order
    pub written: Vec<PathBuf>,
    /// Assets without a resolvable location
    pub skipped: usize,
}

/// Downloads or copies the assets of a STAC item into a directory
pub struct AssetMaterializer {
    client: reqwest::Client,
    reader: StacReader,
    reporter: AssetReporter,
}

impl AssetMaterializer {
    /// Create a materializer with its own HTTP client
    pub fn new(http: &HttpSettings) -> Result<Self, StacError> {
        Ok(Self::with_client(http_client(http)?))
    }

    /// Create a materializer sharing an existing HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            reader: StacReader::new(client.clone()),
            client,
            reporter: Arc::new(log_event),
        }
    }

    /// Replace the default tracing reporter
    pub fn with_reporter(mut self, reporter: AssetReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Resolve the item designated by `stac_input`
    ///
    /// A URL is read as an item; anything else is a directory holding a
    /// `catalog.json` whose first item (in id order) is used.
    pub async fn resolve_item(&self, stac_input: &str) -> Result<Item, StacError> {
        if is_url(stac_input) {
            tracing::info!("remote STAC item: {}", stac_input);
            return self.reader.read_item(stac_input).await;
        }

        let catalog = self.reader.open_local_catalog(Path::new(stac_input)).await?;
        let item = self.reader.first_item(&catalog).await?;
        tracing::debug!("using item '{}' of catalog '{}'", item.id, catalog.id);
        Ok(item)
    }

    /// Materialize every asset of the item designated by `stac_input` into
    /// `output_path`, which must not exist yet.
    ///
    /// Any asset failure aborts the remaining assets; files already written
    /// are left in place.
    pub async fn prepare_assets(
        &self,
        stac_input: &str,
        output_path: &Path,
    ) -> Result<MaterializeSummary, StacError> {
        // Checked again at creation; this one fails before any network access
        ensure_absent(output_path)?;

        let item = self.resolve_item(stac_input).await?;
        self.materialize_item(&item, output_path).await
    }

    /// Materialize every asset of an already resolved `item` into a new
    /// directory `output_path`.
    ///
    /// Relative hrefs are resolved against the item's own location; assets
    /// whose location cannot be made absolute are skipped.
    pub async fn materialize_item(
        &self,
        item: &Item,
        output_path: &Path,
    ) -> Result<MaterializeSummary, StacError> {
        create_output(output_path).await?;

        let mut summary = MaterializeSummary {
            item_id: item.id.clone(),
            ..Default::default()
        };
        let mut destinations = HashSet::new();

        for (key, asset) in &item.assets {
            let Some(href) = item.absolute_href(asset) else {
                (self.reporter)(&AssetEvent::Skipped { key: key.clone() });
                summary.skipped += 1;
                continue;
            };

            let remote = is_url(&href);
            let dest = if remote {
                output_path.join(relative_key(key)?)
            } else {
                let source = local_path(&href);
                let name = source
                    .file_name()
                    .ok_or_else(|| StacError::InvalidHref { href: href.clone() })?;
                output_path.join(name)
            };

            if !destinations.insert(dest.clone()) {
                (self.reporter)(&AssetEvent::Overwriting {
                    key: key.clone(),
                    dest: dest.clone(),
                });
            }

            if remote {
                (self.reporter)(&AssetEvent::Downloading {
                    key: key.clone(),
                    href: href.clone(),
                    dest: dest.clone(),
                });
                let bytes = self.download(&href, &dest).await?;
                (self.reporter)(&AssetEvent::Downloaded {
                    key: key.clone(),
                    bytes,
                });
            } else {
                let source = local_path(&href);
                (self.reporter)(&AssetEvent::Copying {
                    key: key.clone(),
                    source: source.clone(),
                    dest: dest.clone(),
                });
                copy_file(&source, &dest).await?;
            }

            summary.written.push(dest);
        }

        Ok(summary)
    }

    /// Stream `href` into `dest` chunk by chunk; returns the byte count
    async fn download(&self, href: &str, dest: &Path) -> Result<u64, StacError> {
        create_parent(dest).await?;

        let mut response = self.client.get(href).send().await?.error_for_status()?;

        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| StacError::io(dest, e))?;
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| StacError::io(dest, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| StacError::io(dest, e))?;
        Ok(written)
    }
}

/// Asset keys become relative paths below the output directory
fn relative_key(key: &str) -> Result<&Path, StacError> {
    let path = Path::new(key);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)));

    if safe {
        Ok(path)
    } else {
        Err(StacError::UnsafeAssetKey {
            key: key.to_string(),
        })
    }
}

async fn create_parent(dest: &Path) -> Result<(), StacError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StacError::io(parent, e))?;
    }
    Ok(())
}

pub(crate) async fn copy_file(source: &Path, dest: &Path) -> Result<(), StacError> {
    create_parent(dest).await?;
    fs::copy(source, dest)
        .await
        .map_err(|e| StacError::Copy {
            from: source.to_path_buf(),
            to: dest.to_path_buf(),
            source: e,
        })?;
    Ok(())
}

/// Materialize with default settings and the tracing reporter
pub async fn prepare_assets(
    stac_input: &str,
    output_path: &Path,
    http: &HttpSettings,
) -> Result<MaterializeSummary, StacError> {
    AssetMaterializer::new(http)?
        .prepare_assets(stac_input, output_path)
        .await
}
