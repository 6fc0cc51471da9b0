//! STAC documents: catalogs, items, assets and links.
//!
//! Only the fields the pipelines need are typed; everything else round-trips
//! through `additional_fields`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::STAC_VERSION;
use crate::utils::make_absolute_href;

/// Media type of catalog documents
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Media type of item documents
pub const MEDIA_TYPE_GEOJSON: &str = "application/geo+json";

/// Link relations rewritten when a catalog is normalized
const STRUCTURAL_RELS: [&str; 4] = ["root", "parent", "self", "item"];

/// A STAC link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            title: None,
            additional_fields: Map::new(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn root(href: impl Into<String>) -> Self {
        Self::new("root", href).with_media_type(MEDIA_TYPE_JSON)
    }

    pub fn parent(href: impl Into<String>) -> Self {
        Self::new("parent", href).with_media_type(MEDIA_TYPE_JSON)
    }

    pub fn item(href: impl Into<String>) -> Self {
        Self::new("item", href).with_media_type(MEDIA_TYPE_GEOJSON)
    }

    fn is_structural(&self) -> bool {
        STRUCTURAL_RELS.contains(&self.rel.as_str())
    }
}

/// A named file or resource attached to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl Asset {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
            description: None,
            media_type: None,
            roles: Vec::new(),
            additional_fields: Map::new(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// A STAC item (GeoJSON Feature)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub r#type: String,

    pub stac_version: String,

    #[serde(default)]
    pub stac_extensions: Vec<String>,

    pub id: String,

    /// Always serialized, `null` when absent
    #[serde(default)]
    pub geometry: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(default)]
    pub properties: Map<String, Value>,

    #[serde(default)]
    pub links: Vec<Link>,

    /// Keyed by asset name, iterated in key order
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,

    /// Where this item was read from; base for relative asset hrefs
    #[serde(skip)]
    pub self_href: Option<String>,
}

impl Item {
    pub const TYPE: &'static str = "Feature";

    /// Create an item without geometry, timestamped with `datetime`
    pub fn new(id: impl Into<String>, datetime: DateTime<Utc>) -> Self {
        let mut properties = Map::new();
        properties.insert(
            "datetime".to_string(),
            Value::String(datetime.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        Self {
            r#type: Self::TYPE.to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            geometry: None,
            bbox: None,
            properties,
            links: Vec::new(),
            assets: BTreeMap::new(),
            collection: None,
            additional_fields: Map::new(),
            self_href: None,
        }
    }

    /// Add (or replace) an asset
    pub fn add_asset(&mut self, key: impl Into<String>, asset: Asset) {
        self.assets.insert(key.into(), asset);
    }

    /// Absolute location of `asset`, resolved against this item's location
    ///
    /// `None` when the href is relative and the item has no known location.
    pub fn absolute_href(&self, asset: &Asset) -> Option<String> {
        make_absolute_href(&asset.href, self.self_href.as_deref())
    }

    /// The `properties.datetime` value, if set
    pub fn datetime(&self) -> Option<&str> {
        self.properties.get("datetime").and_then(Value::as_str)
    }
}

/// A STAC catalog (or collection, read as a catalog)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub r#type: String,

    pub id: String,

    pub stac_version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub description: String,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,

    /// Where this catalog was read from; base for relative link hrefs
    #[serde(skip)]
    pub self_href: Option<String>,

    /// Items owned in memory, written on save
    #[serde(skip)]
    pub items: Vec<Item>,
}

impl Catalog {
    pub const TYPE: &'static str = "Catalog";

    /// Document types accepted when reading a catalog
    pub const READABLE_TYPES: [&'static str; 2] = ["Catalog", "Collection"];

    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            r#type: Self::TYPE.to_string(),
            id: id.into(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            title: None,
            description: description.into(),
            links: Vec::new(),
            additional_fields: Map::new(),
            self_href: None,
            items: Vec::new(),
        }
    }

    /// Attach an item; it is written under `<root>/<item-id>/` on save
    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Absolute hrefs of every `item` link, in document order
    pub fn item_hrefs(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| l.rel == "item")
            .filter_map(|l| make_absolute_href(&l.href, self.self_href.as_deref()))
            .collect()
    }

    /// Rewrite structural links for a self-contained layout.
    ///
    /// The catalog links to `./catalog.json` (root) and `./<id>/<id>.json` for
    /// each owned item; items link back to `../catalog.json` as root and
    /// parent. No `self` links are written and other links are kept.
    pub fn normalize_self_contained(&mut self) {
        let mut links = vec![Link::root(format!("./{}", super::CATALOG_FILE))];

        for item in &mut self.items {
            links.push(Link::item(format!("./{0}/{0}.json", item.id)));

            let mut item_links = vec![
                Link::root(format!("../{}", super::CATALOG_FILE)),
                Link::parent(format!("../{}", super::CATALOG_FILE)),
            ];
            item_links.extend(item.links.drain(..).filter(|l| !l.is_structural()));
            item.links = item_links;
        }

        links.extend(self.links.drain(..).filter(|l| !l.is_structural()));
        self.links = links;
    }
}
