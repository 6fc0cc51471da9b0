//! STAC asset packaging.
//!
//! Two pipelines built on a small STAC document model:
//!
//! - [`AssetMaterializer`]: resolves an item (remote item URL, or the first
//!   item of a local `catalog.json`) and downloads or copies each of its
//!   assets into a fresh output directory.
//! - [`CatalogGenerator`]: wraps a directory of files into a self-contained
//!   catalog with a single `output` item.
//!
//! # Generated Layout
//!
//! ```text
//! stac-catalog/
//! ├── catalog.json          # root catalog, links: root, item
//! └── output/
//!     ├── output.json       # item, links: root, parent
//!     ├── image.tif         # copied asset, href "image.tif"
//!     └── metadata.xml
//! ```
//!
//! Both pipelines refuse to write into an output path that already exists.

pub mod assets;
pub mod generate;
pub mod io;
pub mod model;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use assets::{AssetEvent, AssetMaterializer, AssetReporter, MaterializeSummary};
pub use generate::{CatalogGenerator, GeneratedCatalog};
pub use io::{http_client, save_self_contained, StacReader};
pub use model::{Asset, Catalog, Item, Link};

/// STAC version written by this crate
pub const STAC_VERSION: &str = "1.1.0";

/// File name of a catalog document inside a catalog directory
pub const CATALOG_FILE: &str = "catalog.json";

/// Conditions checked before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Output path already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("Assets path does not exist: {}", .0.display())]
    AssetsNotFound(PathBuf),

    #[error("STAC catalog not found: {}", .0.display())]
    CatalogNotFound(PathBuf),

    #[error("STAC catalog has no items: {0}")]
    NoItems(String),
}

/// Errors from reading, materializing or generating STAC content
#[derive(Debug, Error)]
pub enum StacError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid STAC document {href}: {source}")]
    Json {
        href: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a STAC {expected} at {href}, found type '{found}'")]
    UnexpectedType {
        href: String,
        expected: &'static str,
        found: String,
    },

    #[error("Asset key '{key}' would be written outside the output directory")]
    UnsafeAssetKey { key: String },

    #[error("Asset href has no file name: {href}")]
    InvalidHref { href: String },

    #[error("Asset file '{name}' collides with the item document of the same name")]
    ReservedAssetName { name: String },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StacError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(href: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            href: href.into(),
            source,
        }
    }

    /// True for errors raised before any side effect
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

/// Fail if `path` already exists (file, directory or dangling symlink)
pub(crate) fn ensure_absent(path: &Path) -> Result<(), StacError> {
    if path.symlink_metadata().is_ok() {
        return Err(PreconditionError::OutputExists(path.to_path_buf()).into());
    }
    Ok(())
}

/// Create `path` as a new directory (parents as needed).
///
/// Fails with [`PreconditionError::OutputExists`] if something else created
/// it first.
pub(crate) async fn create_output(path: &Path) -> Result<(), StacError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StacError::io(parent, e))?;
    }

    match tokio::fs::create_dir(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(PreconditionError::OutputExists(path.to_path_buf()).into())
        }
        Err(e) => Err(StacError::io(path, e)),
    }
}
