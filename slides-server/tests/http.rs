use std::sync::Arc;

use http_body_util::BodyExt;
use serde_json::{json, Value};
use slides_axum::axum::body::Body;
use slides_axum::axum::http::Request;
use slides_axum::axum::response::Response;
use slides_axum::axum::Router;
use slides_core::SlidesConfig;
use slides_server::build_with_store;
use slides_store::MemoryStore;
use tower::ServiceExt;

fn router(store: &Arc<MemoryStore>) -> Router {
    build_with_store(store.clone(), &SlidesConfig::with_defaults()).into_router()
}

async fn json_body(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

const UPLOAD: &str = "--B0UNDARY
Content-Disposition: form-data; name=\"images[]\"; filename=\"Slide 2.png\"
Content-Type: image/png

two
--B0UNDARY
Content-Disposition: form-data; name=\"images[]\"; filename=\"setup.exe\"
Content-Type: application/octet-stream

MZ
--B0UNDARY
Content-Disposition: form-data; name=\"images[]\"; filename=\"Slide 1.png\"
Content-Type: image/png

one
--B0UNDARY
Content-Disposition: form-data; name=\"durations[]\"

5
--B0UNDARY
Content-Disposition: form-data; name=\"durations[]\"

7
--B0UNDARY
Content-Disposition: form-data; name=\"durations[]\"


--B0UNDARY
Content-Disposition: form-data; name=\"alts[]\"

Second slide
--B0UNDARY--
";

#[tokio::test]
async fn health_ok() {
    let store = Arc::new(MemoryStore::new());
    let res = router(&store)
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "ok");
}

#[tokio::test]
async fn absent_manifest_is_empty_with_null_sha() {
    let store = Arc::new(MemoryStore::new());
    let res = router(&store)
        .oneshot(empty_request("GET", "/manifest"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await, json!({ "items": [], "sha": null }));
}

#[tokio::test]
async fn multipart_upload_lands_accepted_files_and_reports_rejections() {
    let store = Arc::new(MemoryStore::new());
    let res = router(&store)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/files")
                .header("content-type", "multipart/form-data; boundary=B0UNDARY")
                .body(Body::from(UPLOAD.replace('\n', "\r\n")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["added"], 2);
    assert_eq!(body["manifestCount"], 2);
    assert_eq!(body["rejected"][0]["name"], "setup.exe");
    assert!(body["commitSha"].is_string());

    assert_eq!(&store.content("slides/Slide-2.png").unwrap()[..], b"two");
    assert!(!store.paths().iter().any(|p| p.contains("setup")));

    let res = router(&store)
        .oneshot(empty_request("GET", "/manifest"))
        .await
        .unwrap();
    let manifest = json_body(res).await;
    assert_eq!(
        manifest["items"],
        json!([
            { "src": "slides/Slide-2.png", "duration": 5.0, "alt": "Second slide" },
            { "src": "slides/Slide-1.png", "duration": 8.0 }
        ])
    );
    assert!(manifest["sha"].is_string());
}

#[tokio::test]
async fn files_listing_rename_and_delete() {
    let store = Arc::new(
        MemoryStore::new()
            .with_file("slides/img-10.png", "10")
            .with_file("slides/img-2.png", "2")
            .with_file("slides/readme.txt", "r"),
    );

    let res = router(&store)
        .oneshot(empty_request("GET", "/files"))
        .await
        .unwrap();
    let body = json_body(res).await;
    let names: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["img-2.png", "img-10.png"]);
    assert_eq!(body["items"][0]["type"], "file");
    assert!(body["items"][0]["sha"].is_string());

    let res = router(&store)
        .oneshot(json_request(
            "PUT",
            "/files",
            json!({ "old_path": "slides/img-10.png", "new_name": "img-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["new"], "slides/img-1.png");
    assert_eq!(body["manifestCount"], 2);

    let res = router(&store)
        .oneshot(empty_request("DELETE", "/files?path=slides/img-2.png"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["removed"], "slides/img-2.png");
    assert_eq!(body["manifestCount"], 1);

    assert_eq!(
        store.paths(),
        vec![
            "slides/img-1.png".to_string(),
            "slides/manifest.json".to_string(),
            "slides/readme.txt".to_string()
        ]
    );
}

#[tokio::test]
async fn save_reorders_and_cleans_orphans() {
    let store = Arc::new(
        MemoryStore::new()
            .with_file("slides/a.png", "a")
            .with_file("slides/b.png", "b")
            .with_file("slides/c.png", "c"),
    );

    let res = router(&store)
        .oneshot(empty_request("POST", "/manifest"))
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["manifestCount"], 3);

    let res = router(&store)
        .oneshot(empty_request("GET", "/manifest"))
        .await
        .unwrap();
    let sha = json_body(res).await["sha"].clone();

    let res = router(&store)
        .oneshot(json_request(
            "PUT",
            "/manifest",
            json!({
                "items": [{ "src": "slides/c.png", "duration": 3 }, "slides/a.png"],
                "delete_orphans": true,
                "sha": sha,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["removedCount"], 1);
    assert_eq!(body["deletedFileCount"], 1);
    assert_eq!(body["failedDeletions"], json!([]));
    assert!(!store.contains("slides/b.png"));

    let res = router(&store)
        .oneshot(empty_request("GET", "/manifest"))
        .await
        .unwrap();
    assert_eq!(
        json_body(res).await["items"],
        json!([{ "src": "slides/c.png", "duration": 3.0 }, { "src": "slides/a.png" }])
    );
}
