//! slides-core: the manifest synchronization engine.
//!
//! Keeps a slideshow manifest and the directory of images it points at in
//! step, on top of any [`slides_store::ContentStore`]. Transport-agnostic: the
//! axum crate maps these operations onto HTTP.

pub mod config;
pub mod errors;
pub mod files;
pub mod ingest;
pub mod listing;
pub mod manager;
pub mod manifest;
pub mod naming;
pub mod sanitize;
pub mod sync;

pub use config::{SlidesConfig, SlidesConfigSnapshot};
pub use errors::{ErrorKind, SlideError, SlideResult};
pub use files::{FileOperations, RemoveOutcome, RenameOutcome};
pub use ingest::{IncomingImage, IngestOutcome, RejectedImage, UploadIngestor, UploadedImage};
pub use listing::natural_cmp;
pub use manager::SlideManager;
pub use manifest::{RawManifest, SlideRecord};
pub use naming::{split_extension, UniqueNameResolver};
pub use sanitize::{extension_of, is_allowed_image, sanitize_name, sanitize_strict, NamingPolicy};
pub use sync::{
    FailedDeletion, ManifestSnapshot, ManifestSynchronizer, RebuildOutcome, SaveOutcome,
    SaveRequest, SyncSettings,
};
