//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use eoap_tools::stac::{Asset, Catalog, Item, Link};

/// Serve `router` on an ephemeral local port
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Write a catalog with one item `id` holding `assets` (key, href) under `root`
pub fn write_local_catalog(root: &Path, id: &str, assets: &[(&str, &str)]) {
    let item_dir = root.join(id);
    std::fs::create_dir_all(&item_dir).unwrap();

    let mut item = Item::new(id, chrono::Utc::now());
    for (key, href) in assets {
        item.add_asset(*key, Asset::new(*href));
    }
    std::fs::write(
        item_dir.join(format!("{id}.json")),
        serde_json::to_vec_pretty(&item).unwrap(),
    )
    .unwrap();

    let mut catalog = Catalog::new("fixture", "test catalog");
    catalog.links.push(Link::root("./catalog.json"));
    catalog.links.push(Link::item(format!("./{id}/{id}.json")));
    std::fs::write(
        root.join("catalog.json"),
        serde_json::to_vec_pretty(&catalog).unwrap(),
    )
    .unwrap();
}

/// Names of the entries directly inside `dir`, sorted
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
