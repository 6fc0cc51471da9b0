//! Asset Materialization Integration Tests
//!
//! Local catalogs, remote items served by a local HTTP server, and the
//! output-directory preconditions.

mod common;

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use eoap_tools::config::HttpSettings;
use eoap_tools::stac::{
    Asset, AssetEvent, AssetMaterializer, CatalogGenerator, Item, PreconditionError, StacError,
};
use tempfile::TempDir;

fn materializer() -> AssetMaterializer {
    // Local test servers must not go through a proxy from the environment
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(HttpSettings::default().timeout())
        .build()
        .unwrap();
    AssetMaterializer::with_client(client)
}

fn recording_materializer() -> (AssetMaterializer, Arc<Mutex<Vec<AssetEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let materializer = materializer().with_reporter(Arc::new(move |event: &AssetEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    (materializer, events)
}

#[tokio::test]
async fn test_local_asset_copied_under_source_basename() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("raw").join("scene_B04.tif");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, b"\x49\x49\x2a\x00 tiff bytes").unwrap();

    let catalog_dir = temp.path().join("catalog");
    common::write_local_catalog(&catalog_dir, "scene", &[("red", source.to_str().unwrap())]);

    let output = temp.path().join("out");
    let summary = materializer()
        .prepare_assets(catalog_dir.to_str().unwrap(), &output)
        .await
        .unwrap();

    assert_eq!(summary.item_id, "scene");
    assert_eq!(summary.written, vec![output.join("scene_B04.tif")]);
    assert_eq!(common::entries(&output), vec!["scene_B04.tif"]);
    assert_eq!(
        std::fs::read(output.join("scene_B04.tif")).unwrap(),
        std::fs::read(&source).unwrap()
    );
}

#[tokio::test]
async fn test_relative_asset_resolved_against_item_location() {
    let temp = TempDir::new().unwrap();
    let catalog_dir = temp.path().join("catalog");
    common::write_local_catalog(&catalog_dir, "scene", &[("dem", "./dem.tif")]);
    std::fs::write(catalog_dir.join("scene").join("dem.tif"), b"elevation").unwrap();

    let output = temp.path().join("out");
    materializer()
        .prepare_assets(catalog_dir.to_str().unwrap(), &output)
        .await
        .unwrap();

    assert_eq!(std::fs::read(output.join("dem.tif")).unwrap(), b"elevation");
}

#[tokio::test]
async fn test_existing_output_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.tif");
    std::fs::write(&source, b"a").unwrap();
    let catalog_dir = temp.path().join("catalog");
    common::write_local_catalog(&catalog_dir, "scene", &[("a", source.to_str().unwrap())]);

    let output = temp.path().join("out");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("keep.txt"), b"mine").unwrap();

    let err = materializer()
        .prepare_assets(catalog_dir.to_str().unwrap(), &output)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StacError::Precondition(PreconditionError::OutputExists(ref p)) if p == &output
    ));
    assert_eq!(common::entries(&output), vec!["keep.txt"]);
}

#[tokio::test]
async fn test_missing_catalog_fails_before_writing() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");

    let err = materializer()
        .prepare_assets(temp.path().to_str().unwrap(), &output)
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert!(matches!(
        err,
        StacError::Precondition(PreconditionError::CatalogNotFound(_))
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_remote_item_assets_downloaded_under_asset_key() {
    let big: Vec<u8> = (0..512 * 1024).map(|i| (i % 251) as u8).collect();
    let expected_big = big.clone();

    // The item is rendered once the server address is known
    let item_json = Arc::new(Mutex::new(String::new()));
    let served_item = item_json.clone();

    let router = Router::new()
        .route(
            "/items/S2A.json",
            get(move || {
                let body = served_item.lock().unwrap().clone();
                async move { body }
            }),
        )
        .route("/items/B04.tif", get(|| async { "red band" }))
        .route(
            "/previews/full.bin",
            get(move || {
                let body = big.clone();
                async move { body }
            }),
        );
    let addr = common::serve(router).await;

    let mut item = Item::new("S2A", chrono::Utc::now());
    item.add_asset("B04", eoap_tools::stac::Asset::new("B04.tif"));
    item.add_asset(
        "previews/full",
        eoap_tools::stac::Asset::new(format!("http://{addr}/previews/full.bin")),
    );
    *item_json.lock().unwrap() = serde_json::to_string(&item).unwrap();

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    let (materializer, events) = recording_materializer();
    let summary = materializer
        .prepare_assets(&format!("http://{addr}/items/S2A.json"), &output)
        .await
        .unwrap();

    assert_eq!(summary.item_id, "S2A");
    assert_eq!(std::fs::read(output.join("B04")).unwrap(), b"red band");
    assert_eq!(
        std::fs::read(output.join("previews").join("full")).unwrap(),
        expected_big
    );

    let events = events.lock().unwrap();
    assert!(events.contains(&AssetEvent::Downloaded {
        key: "previews/full".to_string(),
        bytes: 512 * 1024,
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        AssetEvent::Downloading { href, .. } if href == &format!("http://{addr}/items/B04.tif")
    )));
}

#[tokio::test]
async fn test_http_error_status_is_surfaced() {
    let item_json = Arc::new(Mutex::new(String::new()));
    let served_item = item_json.clone();

    let router = Router::new()
        .route(
            "/item.json",
            get(move || {
                let body = served_item.lock().unwrap().clone();
                async move { body }
            }),
        )
        .route(
            "/gone.tif",
            get(|| async { (StatusCode::NOT_FOUND, "no such asset") }),
        );
    let addr = common::serve(router).await;

    let mut item = Item::new("broken", chrono::Utc::now());
    item.add_asset("gone", eoap_tools::stac::Asset::new("gone.tif"));
    *item_json.lock().unwrap() = serde_json::to_string(&item).unwrap();

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    let err = materializer()
        .prepare_assets(&format!("http://{addr}/item.json"), &output)
        .await
        .unwrap_err();

    match err {
        StacError::Transport(e) => assert_eq!(e.status(), Some(reqwest::StatusCode::NOT_FOUND)),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(!output.join("gone").exists());
}

#[tokio::test]
async fn test_remote_document_not_an_item() {
    let router = Router::new().route(
        "/catalog.json",
        get(|| async {
            r#"{"type": "Catalog", "id": "c", "stac_version": "1.1.0", "description": "d", "links": []}"#
        }),
    );
    let addr = common::serve(router).await;

    let temp = TempDir::new().unwrap();
    let err = materializer()
        .prepare_assets(&format!("http://{addr}/catalog.json"), &temp.path().join("out"))
        .await
        .unwrap_err();

    assert!(matches!(err, StacError::UnexpectedType { ref found, .. } if found == "Catalog"));
}

#[tokio::test]
async fn test_basename_collision_last_write_wins() {
    let temp = TempDir::new().unwrap();
    for (dir, content) in [("first", "one"), ("second", "two")] {
        let path = temp.path().join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("x.bin"), content).unwrap();
    }

    let first = temp.path().join("first").join("x.bin");
    let second = temp.path().join("second").join("x.bin");
    let catalog_dir = temp.path().join("catalog");
    common::write_local_catalog(
        &catalog_dir,
        "dup",
        &[("a", first.to_str().unwrap()), ("b", second.to_str().unwrap())],
    );

    let output = temp.path().join("out");
    let (materializer, events) = recording_materializer();
    let summary = materializer
        .prepare_assets(catalog_dir.to_str().unwrap(), &output)
        .await
        .unwrap();

    assert_eq!(summary.written.len(), 2);
    assert_eq!(common::entries(&output), vec!["x.bin"]);
    assert_eq!(std::fs::read_to_string(output.join("x.bin")).unwrap(), "two");
    assert!(events.lock().unwrap().contains(&AssetEvent::Overwriting {
        key: "b".to_string(),
        dest: output.join("x.bin"),
    }));
}

#[tokio::test]
async fn test_generated_catalog_can_be_materialized() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    std::fs::create_dir_all(&results).unwrap();
    std::fs::write(results.join("ndvi.tif"), b"ndvi").unwrap();
    std::fs::write(results.join("report.json"), b"{}").unwrap();

    let catalog_dir = temp.path().join("catalog");
    CatalogGenerator::default()
        .generate(&results, &catalog_dir)
        .await
        .unwrap();

    let output = temp.path().join("inputs");
    let summary = materializer()
        .prepare_assets(catalog_dir.to_str().unwrap(), &output)
        .await
        .unwrap();

    assert_eq!(summary.item_id, "output");
    assert_eq!(common::entries(&output), vec!["ndvi.tif", "report.json"]);
    assert_eq!(std::fs::read(output.join("ndvi.tif")).unwrap(), b"ndvi");
}

#[tokio::test]
async fn test_relative_asset_without_item_location_is_skipped() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");

    // Built in memory: no self location to resolve "bands/B04.tif" against
    let mut item = Item::new("detached", chrono::Utc::now());
    item.add_asset("B04", Asset::new("bands/B04.tif"));
    assert!(item.self_href.is_none());

    let (materializer, events) = recording_materializer();
    let summary = materializer.materialize_item(&item, &output).await.unwrap();

    assert_eq!(summary.item_id, "detached");
    assert_eq!(summary.skipped, 1);
    assert!(summary.written.is_empty());
    assert_eq!(
        *events.lock().unwrap(),
        vec![AssetEvent::Skipped {
            key: "B04".to_string()
        }]
    );
    assert!(output.is_dir());
    assert!(common::entries(&output).is_empty());
}

#[tokio::test]
async fn test_materialize_item_refuses_existing_output() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.txt");
    std::fs::write(&source, b"a").unwrap();

    let output = temp.path().join("out");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("keep.txt"), b"keep").unwrap();

    let mut item = Item::new("late", chrono::Utc::now());
    item.add_asset("a", Asset::new(source.to_str().unwrap()));

    let err = materializer()
        .materialize_item(&item, &output)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StacError::Precondition(PreconditionError::OutputExists(p)) if p == output
    ));
    assert_eq!(common::entries(&output), vec!["keep.txt"]);
}
