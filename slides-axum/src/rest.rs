//! REST routes for image files and the manifest.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Query, State},
    routing, Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use slides_core::{manifest, IncomingImage, SaveRequest, SlideError};
use slides_store::ContentHash;

use crate::{SlidesAxumError, SlidesAxumState};

type ApiResult = Result<Json<Value>, SlidesAxumError>;

fn map_json_rejection(rejection: JsonRejection) -> SlidesAxumError {
    SlideError::invalid_input("Failed to parse the request body as JSON")
        .with_data(json!({ "_schema": [rejection.to_string()] }))
        .into()
}

#[derive(Debug, Deserialize)]
struct RenameBody {
    #[serde(alias = "oldPath")]
    old_path: String,
    #[serde(alias = "newName")]
    new_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PathBody {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveBody {
    items: Value,
    #[serde(default, alias = "deleteOrphans")]
    delete_orphans: bool,
    #[serde(default)]
    sha: Option<String>,
}

/// Items of a field that may hold one value or an array of them.
fn list_of(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => vec![other],
    }
}

/// Lenient number parse; an empty or invalid duration means "use the default".
fn parse_duration(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Build the upload batch from the JSON body (direct or converted from multipart).
///
/// `images` entries carry `filename` (or `name`) and base64 `data`; durations
/// and alt texts come from the entry itself or from the parallel `durations`
/// and `alts` arrays.
fn parse_upload(body: &Value) -> Result<Vec<IncomingImage>, SlideError> {
    let durations = list_of(body.get("durations"));
    let alts = list_of(body.get("alts"));

    list_of(body.get("images"))
        .into_iter()
        .enumerate()
        .map(|(i, image)| {
            let name = image
                .get("filename")
                .or_else(|| image.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| SlideError::invalid_input(format!("image {i} has no file name")))?;
            let data = image
                .get("data")
                .and_then(Value::as_str)
                .ok_or_else(|| SlideError::invalid_input(format!("image {i} has no data")))?;
            let content = base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .map_err(|e| {
                    SlideError::invalid_input(format!("image {i} data is not valid base64: {e}"))
                })?;

            let duration = parse_duration(image.get("duration"))
                .or_else(|| parse_duration(durations.get(i).copied()));
            let alt = image
                .get("alt")
                .or_else(|| alts.get(i).copied())
                .and_then(Value::as_str)
                .map(str::to_string);

            Ok(IncomingImage {
                name: name.to_string(),
                content: content.into(),
                duration,
                alt,
            })
        })
        .collect()
}

async fn list_files(State(state): State<SlidesAxumState>) -> ApiResult {
    let items = state.manager.list_images().await?;
    Ok(Json(json!({ "items": items })))
}

async fn upload_files(
    State(state): State<SlidesAxumState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(map_json_rejection)?;
    let images = parse_upload(&body)?;

    let outcome = state.manager.upload(images).await?;
    Ok(Json(json!({
        "added": outcome.added,
        "uploaded": outcome.uploaded,
        "rejected": outcome.rejected,
        "manifestCount": outcome.count,
        "commitSha": outcome.version,
    })))
}

async fn rename_file(
    State(state): State<SlidesAxumState>,
    body: Result<Json<RenameBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(map_json_rejection)?;

    let outcome = state.manager.rename(&body.old_path, &body.new_name).await?;
    Ok(Json(json!({
        "old": outcome.old,
        "new": outcome.new,
        "manifestCount": outcome.count,
        "commitSha": outcome.version,
    })))
}

/// Path from the JSON body, or from `?path=` when the body is empty.
async fn delete_file(
    State(state): State<SlidesAxumState>,
    Query(query): Query<PathBody>,
    body: Bytes,
) -> ApiResult {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<PathBody>(&body)
            .map_err(|e| {
                SlideError::invalid_input("Failed to parse the request body as JSON")
                    .with_data(json!({ "_schema": [e.to_string()] }))
            })?
            .path
    };
    let path = from_body
        .or(query.path)
        .ok_or_else(|| SlideError::invalid_input("missing path"))?;

    let outcome = state.manager.remove(&path).await?;
    Ok(Json(json!({
        "removed": outcome.removed,
        "manifestCount": outcome.count,
        "commitSha": outcome.version,
    })))
}

async fn get_manifest(State(state): State<SlidesAxumState>) -> ApiResult {
    let snapshot = state.manager.manifest().await?;
    Ok(Json(json!({
        "items": manifest::to_json(&snapshot.slides),
        "sha": snapshot.hash,
    })))
}

async fn save_manifest(
    State(state): State<SlidesAxumState>,
    body: Result<Json<SaveBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(map_json_rejection)?;
    let slides = manifest::parse_items(&body.items)?;

    let request = SaveRequest::new(slides)
        .delete_orphans(body.delete_orphans)
        .base_version(body.sha.map(ContentHash::from_string));
    let outcome = state.manager.save(request).await?;

    Ok(Json(json!({
        "commitSha": outcome.version,
        "manifestCount": outcome.count,
        "removedCount": outcome.removed_count,
        "deletedFileCount": outcome.deleted_file_count,
        "orphans": outcome.orphans,
        "skipped": outcome.skipped,
        "failedDeletions": outcome.failed_deletions,
    })))
}

async fn rebuild_manifest(State(state): State<SlidesAxumState>) -> ApiResult {
    let outcome = state.manager.rebuild().await?;
    Ok(Json(json!({
        "manifestCount": outcome.count,
        "commitSha": outcome.version,
    })))
}

/// `/files` and `/manifest` routes bound to `state`
pub fn slides_router(state: SlidesAxumState) -> Router<()> {
    Router::new()
        .route(
            "/files",
            routing::get(list_files)
                .post(upload_files)
                .put(rename_file)
                .delete(delete_file),
        )
        .route(
            "/manifest",
            routing::get(get_manifest)
                .put(save_manifest)
                .post(rebuild_manifest),
        )
        .with_state(state)
}
