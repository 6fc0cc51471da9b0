//! Reading STAC documents from URLs or paths, and persisting catalogs.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use super::model::{Catalog, Item};
use super::{PreconditionError, StacError, CATALOG_FILE};
use crate::config::HttpSettings;
use crate::utils::{is_url, local_path};

/// Build the HTTP client used for STAC documents and asset downloads.
///
/// The timeout bounds connecting and each read, not the whole transfer, so
/// large assets are not cut off.
pub fn http_client(settings: &HttpSettings) -> Result<reqwest::Client, StacError> {
    let client = reqwest::Client::builder()
        .connect_timeout(settings.timeout())
        .read_timeout(settings.timeout())
        .user_agent(settings.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Reads catalogs and items from HTTP(S) URLs or local paths
#[derive(Debug, Clone)]
pub struct StacReader {
    client: reqwest::Client,
}

impl StacReader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch and parse a JSON document; returns it with its absolute location
    async fn read_document<T: DeserializeOwned>(&self, href: &str) -> Result<(T, String), StacError> {
        if is_url(href) {
            tracing::debug!("GET {}", href);
            let bytes = self
                .client
                .get(href)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            let document = serde_json::from_slice(&bytes).map_err(|e| StacError::json(href, e))?;
            return Ok((document, href.to_string()));
        }

        let path = local_path(href);
        let bytes = fs::read(&path).await.map_err(|e| StacError::io(&path, e))?;
        let document = serde_json::from_slice(&bytes).map_err(|e| StacError::json(href, e))?;
        let location = std::path::absolute(&path).map_err(|e| StacError::io(&path, e))?;

        Ok((document, location.to_string_lossy().into_owned()))
    }

    /// Read an item document
    pub async fn read_item(&self, href: &str) -> Result<Item, StacError> {
        let (mut item, location): (Item, String) = self.read_document(href).await?;

        if item.r#type != Item::TYPE {
            return Err(StacError::UnexpectedType {
                href: href.to_string(),
                expected: "Item",
                found: item.r#type,
            });
        }

        item.self_href = Some(location);
        Ok(item)
    }

    /// Read a catalog (or collection) document
    pub async fn read_catalog(&self, href: &str) -> Result<Catalog, StacError> {
        let (mut catalog, location): (Catalog, String) = self.read_document(href).await?;

        if !Catalog::READABLE_TYPES.contains(&catalog.r#type.as_str()) {
            return Err(StacError::UnexpectedType {
                href: href.to_string(),
                expected: "Catalog",
                found: catalog.r#type,
            });
        }

        catalog.self_href = Some(location);
        Ok(catalog)
    }

    /// Read `<dir>/catalog.json`, failing with a precondition error if absent
    pub async fn open_local_catalog(&self, dir: &Path) -> Result<Catalog, StacError> {
        let catalog_path = dir.join(CATALOG_FILE);
        tracing::info!("local STAC catalog: {}", catalog_path.display());

        if !catalog_path.is_file() {
            return Err(PreconditionError::CatalogNotFound(catalog_path).into());
        }

        self.read_catalog(&catalog_path.to_string_lossy()).await
    }

    /// Load every direct item of `catalog`, sorted by id
    pub async fn items(&self, catalog: &Catalog) -> Result<Vec<Item>, StacError> {
        let mut items = Vec::new();
        for href in catalog.item_hrefs() {
            items.push(self.read_item(&href).await?);
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// The first item of `catalog` in id order
    pub async fn first_item(&self, catalog: &Catalog) -> Result<Item, StacError> {
        self.items(catalog)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PreconditionError::NoItems(catalog.id.clone()).into())
    }
}

async fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<(), StacError> {
    let content =
        serde_json::to_string_pretty(document).map_err(|e| StacError::json(path.to_string_lossy(), e))?;
    fs::write(path, content)
        .await
        .map_err(|e| StacError::io(path, e))
}

/// Normalize `catalog` and write it as a self-contained tree under `root`.
///
/// Returns the path of the written `catalog.json`.
pub async fn save_self_contained(catalog: &mut Catalog, root: &Path) -> Result<PathBuf, StacError> {
    catalog.normalize_self_contained();

    fs::create_dir_all(root)
        .await
        .map_err(|e| StacError::io(root, e))?;

    let catalog_file = root.join(CATALOG_FILE);
    write_json(&catalog_file, catalog).await?;

    for item in &catalog.items {
        let item_dir = root.join(&item.id);
        fs::create_dir_all(&item_dir)
            .await
            .map_err(|e| StacError::io(&item_dir, e))?;
        write_json(&item_dir.join(format!("{}.json", item.id)), item).await?;
    }

    Ok(catalog_file)
}
