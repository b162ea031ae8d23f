use std::sync::Arc;

use serde_json::{json, Value};
use slides_core::{ErrorKind, IncomingImage, NamingPolicy, SyncSettings, UploadIngestor};
use slides_store::MemoryStore;

const MANIFEST: &str = "slides/manifest.json";

fn manifest_json(store: &MemoryStore) -> Value {
    serde_json::from_slice(&store.content(MANIFEST).expect("manifest written")).unwrap()
}

#[tokio::test]
async fn disallowed_file_is_rejected_while_the_rest_of_the_batch_lands() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = UploadIngestor::new(store.clone(), SyncSettings::default());

    let outcome = ingestor
        .ingest(vec![
            IncomingImage::new("a.png", "A"),
            IncomingImage::new("bad.exe", "MZ"),
            IncomingImage::new("c.png", "C"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].name, "bad.exe");
    assert!(store.contains("slides/a.png"));
    assert!(store.contains("slides/c.png"));
    assert!(!store.paths().iter().any(|p| p.contains("bad")));

    assert_eq!(
        manifest_json(&store),
        json!([
            { "src": "slides/a.png", "duration": 8.0 },
            { "src": "slides/c.png", "duration": 8.0 }
        ])
    );
}

#[tokio::test]
async fn uploads_append_after_existing_slides_with_unique_names() {
    let store = Arc::new(
        MemoryStore::new()
            .with_file("slides/photo.png", "old")
            .with_file(MANIFEST, r#"[{ "src": "slides/photo.png", "alt": "first" }]"#),
    );
    let ingestor = UploadIngestor::new(store.clone(), SyncSettings::default());

    let outcome = ingestor
        .ingest(vec![
            IncomingImage::new("photo.png", "new-1").with_duration(3.0).with_alt("  second "),
            IncomingImage::new("photo.png", "new-2").with_alt("   "),
        ])
        .await
        .unwrap();

    let paths: Vec<_> = outcome.uploaded.iter().map(|u| u.path.as_str()).collect();
    assert_eq!(paths, vec!["slides/photo-1.png", "slides/photo-2.png"]);
    assert_eq!(outcome.count, 3);
    assert_eq!(
        manifest_json(&store),
        json!([
            { "src": "slides/photo.png", "alt": "first" },
            { "src": "slides/photo-1.png", "duration": 3.0, "alt": "second" },
            { "src": "slides/photo-2.png", "duration": 8.0 }
        ])
    );
    assert_eq!(
        store.content("slides/photo.png").unwrap(),
        bytes::Bytes::from_static(b"old")
    );
}

#[tokio::test]
async fn strict_policy_lowercases_names() {
    let store = Arc::new(MemoryStore::new());
    let settings = SyncSettings::default().with_naming(NamingPolicy::Strict);
    let ingestor = UploadIngestor::new(store.clone(), settings);

    let outcome = ingestor
        .ingest(vec![IncomingImage::new(" My Photo!! .PNG ", "p")])
        .await
        .unwrap();

    assert_eq!(outcome.uploaded[0].path, "slides/my-photo-.png");
}

#[tokio::test]
async fn empty_or_fully_rejected_batches_are_invalid() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = UploadIngestor::new(store.clone(), SyncSettings::default());

    let err = ingestor.ingest(vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = ingestor
        .ingest(vec![IncomingImage::new("virus.exe", "x"), IncomingImage::new("notes", "y")])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(err.data.as_ref().unwrap()["rejected"].as_array().unwrap().len(), 2);

    assert!(store.paths().is_empty());
}

#[tokio::test]
async fn manifest_entry_already_pointing_at_the_new_path_is_not_duplicated() {
    // manifest references a blob that was deleted out of band
    let store = Arc::new(MemoryStore::new().with_file(MANIFEST, r#"["slides/a.png"]"#));
    let ingestor = UploadIngestor::new(store.clone(), SyncSettings::default());

    let outcome = ingestor
        .ingest(vec![IncomingImage::new("a.png", "A")])
        .await
        .unwrap();

    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.uploaded.len(), 1);
    assert_eq!(manifest_json(&store), json!([{ "src": "slides/a.png" }]));
}

#[tokio::test]
async fn mid_batch_failure_reports_what_already_landed() {
    let store = Arc::new(MemoryStore::new().with_file("slides/b.png", "taken"));
    let ingestor =
        UploadIngestor::new(store.clone(), SyncSettings::default().with_max_attempts(0));

    let err = ingestor
        .ingest(vec![
            IncomingImage::new("a.png", "A"),
            IncomingImage::new("bad.exe", "MZ"),
            IncomingImage::new("b.png", "B"),
            IncomingImage::new("c.png", "C"),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NameExhausted);
    assert!(err.message.contains("1 of 3 images uploaded before b.png failed"));

    let data = err.data.expect("batch progress in data");
    assert_eq!(data["failed"], "b.png");
    assert_eq!(data["attempted"], 3);
    assert_eq!(data["total"], 4);
    assert_eq!(data["uploaded"], json!([{ "name": "a.png", "path": "slides/a.png" }]));
    assert_eq!(data["rejected"][0]["name"], "bad.exe");
    assert_eq!(data["cause"]["path"], "slides/b.png");

    assert!(store.contains("slides/a.png"));
    assert!(!store.contains("slides/c.png"));
    assert!(!store.contains(MANIFEST));
}
