use std::sync::Arc;

use slides_store::{ContentStore, DirEntry};

use crate::errors::SlideResult;
use crate::files::{FileOperations, RemoveOutcome, RenameOutcome};
use crate::ingest::{IncomingImage, IngestOutcome, UploadIngestor};
use crate::sync::{
    ManifestSnapshot, ManifestSynchronizer, RebuildOutcome, SaveOutcome, SaveRequest,
    SyncSettings,
};

/// Entry point bundling a store handle with the engine settings.
///
/// Holds no mutable state: every call re-reads what it needs from the store,
/// so one manager can be shared across concurrent requests.
///
/// ```rust
/// use std::sync::Arc;
/// use slides_core::{SlideManager, SyncSettings};
/// use slides_store::MemoryStore;
///
/// # #[tokio::main]
/// # async fn main() -> slides_core::SlideResult<()> {
/// let store = Arc::new(MemoryStore::new().with_file("slides/b.png", "b").with_file("slides/a.png", "a"));
/// let manager = SlideManager::new(store, SyncSettings::default());
///
/// let rebuilt = manager.rebuild().await?;
/// assert_eq!(rebuilt.count, 2);
///
/// let snapshot = manager.manifest().await?;
/// assert_eq!(snapshot.slides[0].src, "slides/a.png");
/// # Ok(())
/// # }
/// ```
pub struct SlideManager {
    settings: SyncSettings,
    sync: ManifestSynchronizer,
    ingestor: UploadIngestor,
    files: FileOperations,
}

impl SlideManager {
    pub fn new(store: Arc<dyn ContentStore>, settings: SyncSettings) -> Self {
        Self {
            sync: ManifestSynchronizer::new(store.clone(), settings.clone()),
            ingestor: UploadIngestor::new(store.clone(), settings.clone()),
            files: FileOperations::new(store, settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub async fn list_images(&self) -> SlideResult<Vec<DirEntry>> {
        self.files.list_images().await
    }

    pub async fn manifest(&self) -> SlideResult<ManifestSnapshot> {
        self.sync.read_manifest().await
    }

    pub async fn upload(&self, images: Vec<IncomingImage>) -> SlideResult<IngestOutcome> {
        self.ingestor.ingest(images).await
    }

    pub async fn rename(&self, old_path: &str, new_name: &str) -> SlideResult<RenameOutcome> {
        self.files.rename(old_path, new_name).await
    }

    pub async fn remove(&self, path: &str) -> SlideResult<RemoveOutcome> {
        self.files.remove(path).await
    }

    pub async fn save(&self, request: SaveRequest) -> SlideResult<SaveOutcome> {
        self.sync.save(request).await
    }

    pub async fn rebuild(&self) -> SlideResult<RebuildOutcome> {
        self.sync.rebuild().await
    }
}
