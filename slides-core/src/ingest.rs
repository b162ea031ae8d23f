//! Upload ingestor: sanitize, pick a free name, write each image, then append
//! the new slides to the manifest in one save.
//!
//! Batch policy is per-item: a file with a disallowed name is rejected and the
//! rest of the batch proceeds. Nothing already written is rolled back; a store
//! failure mid-batch leaves earlier blobs outside the manifest, where a later
//! rebuild picks them up. That error keeps its kind and lists in `data` what
//! was uploaded and rejected before it.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use slides_store::{join_path, CommitId, ContentStore};
use tracing::{info, instrument, warn};

use crate::errors::{SlideError, SlideResult};
use crate::manifest::SlideRecord;
use crate::naming::UniqueNameResolver;
use crate::sanitize::{extension_of, is_allowed_image};
use crate::sync::{ManifestSynchronizer, SaveRequest, SyncSettings};

/// One image as received from the client
#[derive(Debug, Clone)]
pub struct IncomingImage {
    pub name: String,
    pub content: Bytes,
    pub duration: Option<f64>,
    pub alt: Option<String>,
}

impl IncomingImage {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            duration: None,
            alt: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadedImage {
    /// Name as sent by the client
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RejectedImage {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Slides appended to the manifest
    pub added: usize,
    pub uploaded: Vec<UploadedImage>,
    pub rejected: Vec<RejectedImage>,
    /// Slides in the manifest after the save
    pub count: usize,
    pub version: CommitId,
}

pub struct UploadIngestor {
    store: Arc<dyn ContentStore>,
    settings: SyncSettings,
    resolver: UniqueNameResolver,
    sync: ManifestSynchronizer,
}

impl UploadIngestor {
    pub fn new(store: Arc<dyn ContentStore>, settings: SyncSettings) -> Self {
        let resolver =
            UniqueNameResolver::new(store.clone()).with_max_attempts(settings.max_attempts);
        let sync = ManifestSynchronizer::new(store.clone(), settings.clone());
        Self {
            store,
            settings,
            resolver,
            sync,
        }
    }

    fn check_name(&self, raw: &str) -> Result<String, String> {
        let name = self.settings.naming.apply(raw);
        if name.is_empty() {
            return Err("empty file name".to_string());
        }
        if extension_of(&name) == name.to_lowercase() {
            return Err("file name has no base".to_string());
        }
        if !is_allowed_image(&name) {
            let ext = extension_of(&name);
            return Err(if ext.is_empty() {
                "missing image extension".to_string()
            } else {
                format!("extension {ext} is not allowed")
            });
        }
        Ok(name)
    }

    fn duration_or_default(&self, duration: Option<f64>) -> f64 {
        duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.settings.default_duration)
    }

    /// Resolve a free path for `name` in the image directory and write the blob there.
    async fn store_image(&self, name: &str, content: Bytes) -> SlideResult<String> {
        let path = self
            .resolver
            .resolve(&join_path(&self.settings.image_dir, name))
            .await?;
        let message = format!("chore(slides): add {}", slides_store::file_name(&path));
        self.store.write(&path, content, None, &message).await?;
        Ok(path)
    }

    #[instrument(skip(self, images), fields(files = images.len()))]
    pub async fn ingest(&self, images: Vec<IncomingImage>) -> SlideResult<IngestOutcome> {
        if images.is_empty() {
            return Err(SlideError::invalid_input("no images in upload"));
        }

        let snapshot = self.sync.read_manifest().await?;
        let mut slides = snapshot.slides;
        let mut present: HashSet<String> = slides.iter().map(|s| s.src.clone()).collect();

        let total = images.len();
        let mut uploaded = Vec::new();
        let mut rejected = Vec::new();
        let mut added = 0;

        for image in images {
            let name = match self.check_name(&image.name) {
                Ok(name) => name,
                Err(reason) => {
                    warn!(name = %image.name, %reason, "rejected upload");
                    rejected.push(RejectedImage {
                        name: image.name,
                        reason,
                    });
                    continue;
                }
            };

            let path = match self.store_image(&name, image.content).await {
                Ok(path) => path,
                Err(err) => {
                    return Err(batch_failure(err, &image.name, total, &uploaded, &rejected));
                }
            };
            info!(%path, "uploaded image");

            if present.insert(path.clone()) {
                let mut record =
                    SlideRecord::new(path.clone()).with_duration(self.duration_or_default(image.duration));
                if let Some(alt) = &image.alt {
                    record = record.with_alt(alt);
                }
                slides.push(record);
                added += 1;
            }
            uploaded.push(UploadedImage {
                name: image.name,
                path,
            });
        }

        if uploaded.is_empty() {
            return Err(SlideError::invalid_input("no acceptable images in upload")
                .with_data(serde_json::json!({ "rejected": rejected })));
        }

        let request = SaveRequest::new(slides)
            .base_version(snapshot.hash)
            .message(format!("chore(manifest): append {added} slide(s)"));
        let saved = self.sync.save(request).await?;

        Ok(IngestOutcome {
            added,
            uploaded,
            rejected,
            count: saved.count,
            version: saved.version,
        })
    }
}

/// Keep the failing kind, and report how far the batch got before it stopped.
fn batch_failure(
    err: SlideError,
    failed: &str,
    total: usize,
    uploaded: &[UploadedImage],
    rejected: &[RejectedImage],
) -> SlideError {
    warn!(
        failed,
        uploaded = uploaded.len(),
        total,
        error = %err,
        "upload batch stopped, earlier images are not in the manifest"
    );
    let attempted = uploaded.len() + rejected.len() + 1;
    let message = format!(
        "{} ({} of {} images uploaded before {} failed)",
        err.message,
        uploaded.len(),
        attempted,
        failed
    );
    let data = serde_json::json!({
        "failed": failed,
        "cause": err.data,
        "attempted": attempted,
        "total": total,
        "uploaded": uploaded,
        "rejected": rejected,
    });

    let mut wrapped = SlideError::new(err.kind, message).with_data(data);
    wrapped.source = err.source;
    wrapped
}
