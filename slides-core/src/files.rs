use std::sync::Arc;

use serde::Serialize;
use slides_store::{file_name, join_path, CommitId, ContentStore, DirEntry, ReadOutcome};
use tracing::{info, instrument};

use crate::bail_slide;
use crate::errors::{SlideError, SlideResult};
use crate::listing::natural_cmp;
use crate::naming::UniqueNameResolver;
use crate::sanitize::{extension_of, is_allowed_image};
use crate::sync::{ManifestSynchronizer, SyncSettings};

#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub old: String,
    pub new: String,
    /// Slides in the rebuilt manifest
    pub count: usize,
    pub version: CommitId,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveOutcome {
    pub removed: String,
    pub count: usize,
    pub version: CommitId,
}

/// Direct operations on image files. Each one ends with a manifest rebuild.
pub struct FileOperations {
    store: Arc<dyn ContentStore>,
    settings: SyncSettings,
    resolver: UniqueNameResolver,
    sync: ManifestSynchronizer,
}

impl FileOperations {
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

    fn require_image_path(&self, path: &str) -> SlideResult<()> {
        if path.trim().is_empty() {
            bail_slide!(invalid_input, "missing path");
        }
        if !self.settings.is_image_path(path) {
            return Err(SlideError::invalid_input(format!(
                "{path} is not inside {}",
                self.settings.image_dir
            ))
            .with_data(serde_json::json!({ "path": path })));
        }
        Ok(())
    }

    /// Image files of the image directory, natural order
    #[instrument(skip(self), fields(dir = %self.settings.image_dir))]
    pub async fn list_images(&self) -> SlideResult<Vec<DirEntry>> {
        let mut images: Vec<DirEntry> = self
            .store
            .list(&self.settings.image_dir)
            .await?
            .into_iter()
            .filter(|entry| entry.is_file() && is_allowed_image(&entry.name))
            .collect();
        images.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        Ok(images)
    }

    /// Copy to a sanitized, unused name, delete the original, rebuild.
    #[instrument(skip(self))]
    pub async fn rename(&self, old_path: &str, new_name: &str) -> SlideResult<RenameOutcome> {
        self.require_image_path(old_path)?;

        let original = match self.store.read(old_path).await? {
            ReadOutcome::Found(file) => file,
            ReadOutcome::NotFound => {
                return Err(SlideError::not_found(format!("{old_path} does not exist"))
                    .with_data(serde_json::json!({ "path": old_path })))
            }
        };

        let mut name = self.settings.naming.apply(new_name);
        if name.is_empty() {
            bail_slide!(invalid_input, "missing new name");
        }
        if extension_of(&name).is_empty() {
            name.push_str(&extension_of(old_path));
        }
        if !is_allowed_image(&name) {
            bail_slide!(invalid_input, "{} does not have an allowed image extension", name);
        }

        let desired = join_path(&self.settings.image_dir, &name);
        if desired == old_path {
            bail_slide!(invalid_input, "new name equals the current name");
        }
        let target = self.resolver.resolve(&desired).await?;

        let message = format!(
            "chore(slides): rename {} -> {}",
            file_name(old_path),
            file_name(&target)
        );
        self.store
            .write(&target, original.content, None, &message)
            .await?;
        self.store
            .delete(old_path, &original.hash, &message)
            .await?;
        info!(old = old_path, new = %target, "renamed image");

        let rebuilt = self.sync.rebuild().await?;
        Ok(RenameOutcome {
            old: old_path.to_string(),
            new: target,
            count: rebuilt.count,
            version: rebuilt.version,
        })
    }

    /// Delete one image and rebuild.
    #[instrument(skip(self))]
    pub async fn remove(&self, path: &str) -> SlideResult<RemoveOutcome> {
        self.require_image_path(path)?;

        let hash = self
            .store
            .current_hash(path)
            .await?
            .ok_or_else(|| {
                SlideError::not_found(format!("{path} does not exist"))
                    .with_data(serde_json::json!({ "path": path }))
            })?;

        let message = format!("chore(slides): remove {}", file_name(path));
        self.store.delete(path, &hash, &message).await?;
        info!(path, "removed image");

        let rebuilt = self.sync.rebuild().await?;
        Ok(RemoveOutcome {
            removed: path.to_string(),
            count: rebuilt.count,
            version: rebuilt.version,
        })
    }
}
