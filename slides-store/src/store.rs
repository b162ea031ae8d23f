use async_trait::async_trait;
use bytes::Bytes;

use crate::{CommitId, ContentHash, DirEntry, ReadOutcome, StoreResult, WriteReceipt};

/// Versioned, path-addressed content store - must be implemented by all backends.
///
/// Writes and deletes are optimistic: the caller presents the hash it last saw and
/// the store rejects the operation with [`crate::StoreError::Conflict`] if the
/// object changed since.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read a file. Absence is reported as [`ReadOutcome::NotFound`], never as an error.
    async fn read(&self, path: &str) -> StoreResult<ReadOutcome>;

    /// List the direct children of a directory. A missing directory lists as empty.
    async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>>;

    /// Create (`expected = None`) or replace (`expected = Some(current)`) a file
    async fn write(
        &self,
        path: &str,
        content: Bytes,
        expected: Option<&ContentHash>,
        message: &str,
    ) -> StoreResult<WriteReceipt>;

    /// Delete a file whose current hash is `expected`
    async fn delete(
        &self,
        path: &str,
        expected: &ContentHash,
        message: &str,
    ) -> StoreResult<CommitId>;

    /// Current hash of a path, or None when absent
    async fn current_hash(&self, path: &str) -> StoreResult<Option<ContentHash>> {
        Ok(self.read(path).await?.into_found().map(|file| file.hash))
    }

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
