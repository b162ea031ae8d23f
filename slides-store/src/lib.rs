//! # slides-store: versioned content storage for the slides manager
//!
//! `slides-store` exposes a path-addressed file store where every object carries a
//! content hash. Writes and deletes present the hash the caller last saw, so two
//! editors racing on the same file cannot silently overwrite each other.
//!
//! ## Backends
//!
//! - [`GitHubStore`]: a branch of a GitHub repository, through the contents API
//! - [`MemoryStore`]: in-process map with the same concurrency rules, for tests and local runs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  slides-core    │  ← manifest sync, uploads, renames
//! ├─────────────────┤
//! │  ContentStore   │  ← read / list / write / delete with hashes
//! ├─────────────────┤
//! │  HttpTransport  │  ← one HTTP exchange, no retry
//! └─────────────────┘
//! ```
//!
//! ```rust
//! use slides_store::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> StoreResult<()> {
//! let store = MemoryStore::new();
//! let receipt = store
//!     .write("slides/manifest.json", "[]".into(), None, "create manifest")
//!     .await?;
//! assert!(receipt.hash.is_some());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod github;
pub mod http;
mod memory;
pub mod store;
mod types;

pub use config::RepoConfig;
pub use error::{StoreError, StoreResult};
pub use github::GitHubStore;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use memory::MemoryStore;
pub use store::ContentStore;
pub use types::{
    file_name, join_path, parent_dir, CommitId, ContentHash, DirEntry, EntryKind, ReadOutcome,
    StoredFile, WriteReceipt,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CommitId, ContentHash, ContentStore, DirEntry, GitHubStore, MemoryStore, ReadOutcome,
        RepoConfig, StoreError, StoreResult, StoredFile, WriteReceipt,
    };
}
