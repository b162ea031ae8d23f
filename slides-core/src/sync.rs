//! Manifest synchronizer.
//!
//! Two ways to produce a new manifest:
//! - **rebuild**: derive it from the image directory listing (resets order and metadata)
//! - **save**: accept a client replacement list, then optionally clean up orphans
//!
//! Save is a two-phase sequence. Phase 1 writes the manifest with the hash read
//! at the start and is authoritative. Phase 2 deletes orphaned blobs one by
//! one; its failures are reported and never unwind phase 1.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use slides_store::{file_name, parent_dir, CommitId, ContentHash, ContentStore, ReadOutcome};
use tracing::{debug, info, instrument, warn};

use crate::config::{keys, SlidesConfigSnapshot};
use crate::errors::{SlideError, SlideResult};
use crate::listing::natural_cmp;
use crate::manifest::{self, SlideRecord};
use crate::naming::DEFAULT_MAX_ATTEMPTS;
use crate::sanitize::{is_allowed_image, NamingPolicy};

pub const DEFAULT_DURATION: f64 = 8.0;

/// Explicit settings handed to every engine component
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Directory holding the slide images, without trailing slash
    pub image_dir: String,
    pub manifest_path: String,
    /// Seconds used when an upload carries no valid duration
    pub default_duration: f64,
    pub naming: NamingPolicy,
    pub max_attempts: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            image_dir: "slides".to_string(),
            manifest_path: "slides/manifest.json".to_string(),
            default_duration: DEFAULT_DURATION,
            naming: NamingPolicy::Relaxed,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SyncSettings {
    /// Build from a config snapshot, falling back to defaults for missing or
    /// unparsable values.
    pub fn from_snapshot(snapshot: &SlidesConfigSnapshot) -> Self {
        let mut settings = Self::default();
        if let Some(dir) = snapshot.get_string(keys::IMAGE_DIR) {
            settings = settings.with_image_dir(dir);
        }
        if let Some(path) = snapshot.get_string(keys::MANIFEST_PATH) {
            settings = settings.with_manifest_path(path);
        }
        if let Some(duration) = snapshot
            .get_f64(keys::DEFAULT_DURATION)
            .filter(|d| d.is_finite() && *d > 0.0)
        {
            settings.default_duration = duration;
        }
        if let Some(strict) = snapshot.get_bool(keys::STRICT_NAMES) {
            settings = settings.with_naming(NamingPolicy::from_strict_flag(strict));
        }
        if let Some(max_attempts) = snapshot.get_usize(keys::MAX_NAME_ATTEMPTS).filter(|n| *n > 0) {
            settings = settings.with_max_attempts(max_attempts);
        }
        settings
    }

    pub fn with_image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into().trim_matches('/').to_string();
        self
    }

    pub fn with_manifest_path(mut self, path: impl Into<String>) -> Self {
        self.manifest_path = path.into().trim_start_matches('/').to_string();
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// True for a direct child of the image directory
    pub fn is_image_path(&self, path: &str) -> bool {
        let name = file_name(path);
        !name.is_empty()
            && name != "."
            && name != ".."
            && parent_dir(path) == self.image_dir
            && path != self.manifest_path
    }
}

/// The current manifest with the hash it was read at
#[derive(Debug, Clone, Default)]
pub struct ManifestSnapshot {
    pub slides: Vec<SlideRecord>,
    /// `None` when the manifest does not exist yet
    pub hash: Option<ContentHash>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebuildOutcome {
    pub count: usize,
    pub version: CommitId,
}

#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub slides: Vec<SlideRecord>,
    pub delete_orphans: bool,
    /// Manifest hash the client edited from; a mismatch fails without writing
    pub base_version: Option<ContentHash>,
    /// Commit message override
    pub message: Option<String>,
}

impl SaveRequest {
    pub fn new(slides: Vec<SlideRecord>) -> Self {
        Self {
            slides,
            ..Default::default()
        }
    }

    pub fn delete_orphans(mut self, delete: bool) -> Self {
        self.delete_orphans = delete;
        self
    }

    pub fn base_version(mut self, hash: Option<ContentHash>) -> Self {
        self.base_version = hash;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDeletion {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub version: CommitId,
    /// Number of slides in the written manifest
    pub count: usize,
    /// Orphans identified, deleted or not
    pub removed_count: usize,
    pub deleted_file_count: usize,
    pub orphans: Vec<String>,
    /// Orphans not eligible for deletion or already gone
    pub skipped: Vec<String>,
    pub failed_deletions: Vec<FailedDeletion>,
}

pub struct ManifestSynchronizer {
    store: Arc<dyn ContentStore>,
    settings: SyncSettings,
}

impl ManifestSynchronizer {
    pub fn new(store: Arc<dyn ContentStore>, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    #[instrument(skip(self), fields(path = %self.settings.manifest_path))]
    pub async fn read_manifest(&self) -> SlideResult<ManifestSnapshot> {
        match self.store.read(&self.settings.manifest_path).await? {
            ReadOutcome::Found(file) => Ok(ManifestSnapshot {
                slides: manifest::normalize_bytes(&file.content),
                hash: Some(file.hash),
            }),
            ReadOutcome::NotFound => {
                debug!("manifest absent, starting empty");
                Ok(ManifestSnapshot::default())
            }
        }
    }

    /// Regenerate the manifest from the image directory, natural-sorted.
    #[instrument(skip(self), fields(dir = %self.settings.image_dir))]
    pub async fn rebuild(&self) -> SlideResult<RebuildOutcome> {
        let mut images: Vec<_> = self
            .store
            .list(&self.settings.image_dir)
            .await?
            .into_iter()
            .filter(|entry| entry.is_file() && is_allowed_image(&entry.name))
            .collect();
        images.sort_by(|a, b| natural_cmp(&a.name, &b.name));

        let paths: Vec<String> = images.into_iter().map(|entry| entry.path).collect();
        let current = self.store.current_hash(&self.settings.manifest_path).await?;
        let body = manifest::encode_paths(&paths)?;
        let message = format!("chore(manifest): rebuild ({} items)", paths.len());

        let receipt = self
            .store
            .write(&self.settings.manifest_path, body, current.as_ref(), &message)
            .await
            .map_err(stale_manifest)?;

        info!(count = paths.len(), commit = %receipt.commit, "manifest rebuilt");
        Ok(RebuildOutcome {
            count: paths.len(),
            version: receipt.commit,
        })
    }

    /// Replace the manifest with a client list, optionally deleting orphans.
    #[instrument(skip(self, request), fields(items = request.slides.len(), delete_orphans = request.delete_orphans))]
    pub async fn save(&self, request: SaveRequest) -> SlideResult<SaveOutcome> {
        let slides = validate_slides(request.slides)?;
        let current = self.read_manifest().await?;

        if let Some(base) = &request.base_version {
            if current.hash.as_ref() != Some(base) {
                return Err(SlideError::concurrent_modification(
                    "manifest changed since it was read",
                )
                .with_data(serde_json::json!({
                    "expected": base,
                    "current": current.hash,
                })));
            }
        }

        let kept: HashSet<&str> = slides.iter().map(|s| s.src.as_str()).collect();
        let orphans: Vec<String> = current
            .slides
            .iter()
            .filter(|s| !kept.contains(s.src.as_str()))
            .map(|s| s.src.clone())
            .collect();

        // Phase 1
        let body = manifest::encode_records(&slides)?;
        let message = request
            .message
            .unwrap_or_else(|| format!("chore(manifest): save ({} items)", slides.len()));
        let receipt = self
            .store
            .write(
                &self.settings.manifest_path,
                body,
                current.hash.as_ref(),
                &message,
            )
            .await
            .map_err(stale_manifest)?;
        info!(count = slides.len(), orphans = orphans.len(), commit = %receipt.commit, "manifest saved");

        let mut outcome = SaveOutcome {
            version: receipt.commit,
            count: slides.len(),
            removed_count: orphans.len(),
            deleted_file_count: 0,
            orphans,
            skipped: Vec::new(),
            failed_deletions: Vec::new(),
        };

        // Phase 2
        if request.delete_orphans {
            self.delete_orphans(&mut outcome).await;
        }
        Ok(outcome)
    }

    async fn delete_orphans(&self, outcome: &mut SaveOutcome) {
        for path in &outcome.orphans {
            if !self.is_deletable(path) {
                debug!(%path, "orphan is outside the image directory, skipping");
                outcome.skipped.push(path.clone());
                continue;
            }

            let hash = match self.store.current_hash(path).await {
                Ok(Some(hash)) => hash,
                Ok(None) => {
                    debug!(%path, "orphan already gone");
                    outcome.skipped.push(path.clone());
                    continue;
                }
                Err(e) => {
                    warn!(%path, error = %e, "failed to read orphan before delete");
                    outcome.failed_deletions.push(FailedDeletion {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let message = format!("chore(slides): remove orphan {}", file_name(path));
            match self.store.delete(path, &hash, &message).await {
                Ok(_) => outcome.deleted_file_count += 1,
                Err(e) => {
                    warn!(%path, error = %e, "failed to delete orphan");
                    outcome.failed_deletions.push(FailedDeletion {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !outcome.failed_deletions.is_empty() {
            warn!(
                failed = outcome.failed_deletions.len(),
                deleted = outcome.deleted_file_count,
                "orphan cleanup incomplete"
            );
        }
    }

    /// Direct children of the image directory only, never the manifest itself
    fn is_deletable(&self, path: &str) -> bool {
        !path.contains("://")
            && !path.split('/').any(|segment| segment == "..")
            && self.settings.is_image_path(path)
    }
}

/// Check a replacement list: non-empty unique `src`, positive durations.
fn validate_slides(slides: Vec<SlideRecord>) -> SlideResult<Vec<SlideRecord>> {
    let mut seen = HashSet::new();
    slides
        .into_iter()
        .enumerate()
        .map(|(index, mut slide)| {
            if slide.src.trim().is_empty() {
                return Err(SlideError::invalid_input(format!("slide {index} has an empty src")));
            }
            if !seen.insert(slide.src.clone()) {
                return Err(SlideError::invalid_input(format!(
                    "duplicate src {}",
                    slide.src
                ))
                .with_data(serde_json::json!({ "src": slide.src })));
            }
            if let Some(duration) = slide.duration {
                if !(duration.is_finite() && duration > 0.0) {
                    return Err(SlideError::invalid_input(format!(
                        "slide {index} has a non-positive duration"
                    )));
                }
            }
            slide.alt = slide
                .alt
                .take()
                .map(|alt| alt.trim().to_string())
                .filter(|alt| !alt.is_empty());
            Ok(slide)
        })
        .collect()
}

/// A stale manifest hash is a concurrent edit, whatever the store calls it.
fn stale_manifest(err: slides_store::StoreError) -> SlideError {
    if err.is_conflict() {
        SlideError::concurrent_modification("manifest was modified concurrently")
            .with_source(anyhow::Error::new(err))
    } else {
        SlideError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlidesConfig;

    #[test]
    fn settings_from_snapshot() {
        let mut config = SlidesConfig::with_defaults();
        config.set(keys::IMAGE_DIR, "/media/slides/");
        config.set(keys::STRICT_NAMES, "true");
        config.set(keys::DEFAULT_DURATION, "-1");
        let settings = SyncSettings::from_snapshot(&config.snapshot());

        assert_eq!(settings.image_dir, "media/slides");
        assert_eq!(settings.naming, NamingPolicy::Strict);
        assert_eq!(settings.default_duration, DEFAULT_DURATION);
        assert_eq!(settings.max_attempts, 999);
    }

    #[test]
    fn image_path_membership() {
        let settings = SyncSettings::default();
        assert!(settings.is_image_path("slides/a.png"));
        assert!(!settings.is_image_path("slides/sub/a.png"));
        assert!(!settings.is_image_path("other/a.png"));
        assert!(!settings.is_image_path("slides/"));
        assert!(!settings.is_image_path("slides/manifest.json"));
        assert!(!settings.is_image_path("slides/.."));
    }

    #[test]
    fn validation_rejects_bad_lists() {
        let dup = vec![SlideRecord::new("a"), SlideRecord::new("a")];
        assert!(validate_slides(dup).is_err());

        let empty = vec![SlideRecord::new(" ")];
        assert!(validate_slides(empty).is_err());

        let negative = vec![SlideRecord::new("a").with_duration(-2.0)];
        assert!(validate_slides(negative).is_err());

        let mut blank_alt = SlideRecord::new("a");
        blank_alt.alt = Some("   ".into());
        let ok = validate_slides(vec![blank_alt]).unwrap();
        assert_eq!(ok[0].alt, None);
    }
}
