pub mod app;

use std::sync::Arc;

use anyhow::Result;
use slides_axum::SlidesApp;
use slides_core::{SlideManager, SlidesConfig, SyncSettings};
use slides_store::{ContentStore, GitHubStore};

/// Application backed by the GitHub repository named in the environment
pub fn build() -> Result<SlidesApp> {
    let config = SlidesConfig::from_env();
    let repo = app::repo_config(&config.snapshot())?;
    let store = GitHubStore::new(repo)?;

    Ok(build_with_store(Arc::new(store), &config))
}

/// Application over any content store
pub fn build_with_store(store: Arc<dyn ContentStore>, config: &SlidesConfig) -> SlidesApp {
    let snapshot = config.snapshot();
    let settings = SyncSettings::from_snapshot(&snapshot);
    tracing::info!(
        backend = store.backend(),
        image_dir = %settings.image_dir,
        manifest = %settings.manifest_path,
        "slides manager configured"
    );

    SlidesApp::new(SlideManager::new(store, settings))
        .with_multipart(app::multipart_config(&snapshot))
        .service("/health", || async { "ok" })
}
