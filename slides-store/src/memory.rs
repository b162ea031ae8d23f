use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::{
    file_name, join_path, CommitId, ContentHash, ContentStore, DirEntry, EntryKind, ReadOutcome,
    StoreError, StoreResult, StoredFile, WriteReceipt,
};

#[derive(Debug, Clone)]
struct MemoryObject {
    content: Bytes,
    hash: ContentHash,
}

/// In-process content store with the same optimistic-concurrency rules as the
/// GitHub backend. Every write assigns a fresh random hash.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    failing_deletes: RwLock<HashSet<String>>,
    racing_writes: RwLock<HashSet<String>>,
    commits: RwLock<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a commit
    pub fn with_file(self, path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.insert(path, content);
        self
    }

    /// Insert or overwrite a file, bypassing hash checks
    pub fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>) -> ContentHash {
        let hash = ContentHash::random();
        self.objects.write().insert(
            path.into(),
            MemoryObject {
                content: content.into(),
                hash: hash.clone(),
            },
        );
        hash
    }

    /// Make every later delete of `path` fail with an upstream error
    pub fn fail_on_delete(&self, path: impl Into<String>) {
        self.failing_deletes.write().insert(path.into());
    }

    /// Let another writer commit `path` just before the next write to it lands,
    /// so the hash that write carries is stale
    pub fn race_next_write(&self, path: impl Into<String>) {
        self.racing_writes.write().insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().contains_key(path)
    }

    /// Raw content of a file, if present
    pub fn content(&self, path: &str) -> Option<Bytes> {
        self.objects.read().get(path).map(|o| o.content.clone())
    }

    /// All stored paths in lexical order
    pub fn paths(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Commit messages recorded so far, oldest first
    pub fn commit_messages(&self) -> Vec<String> {
        self.commits.read().clone()
    }

    fn record_commit(&self, message: &str) -> CommitId {
        self.commits.write().push(message.to_string());
        CommitId::random()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read(&self, path: &str) -> StoreResult<ReadOutcome> {
        let objects = self.objects.read();
        Ok(match objects.get(path) {
            Some(object) => ReadOutcome::Found(StoredFile {
                path: path.to_string(),
                content: object.content.clone(),
                hash: object.hash.clone(),
            }),
            None => ReadOutcome::NotFound,
        })
    }

    async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>> {
        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let objects = self.objects.read();
        let mut files = Vec::new();
        let mut subdirs = BTreeSet::new();

        for (path, object) in objects.range(prefix.clone()..) {
            let Some(rest) = path.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    subdirs.insert(child.to_string());
                }
                None => files.push(DirEntry {
                    path: path.clone(),
                    name: file_name(path).to_string(),
                    hash: object.hash.clone(),
                    size: object.content.len() as u64,
                    kind: EntryKind::File,
                    download_url: None,
                }),
            }
        }

        files.extend(subdirs.into_iter().map(|name| {
            let path = join_path(dir, &name);
            DirEntry {
                hash: ContentHash::from_string(format!("tree:{path}")),
                path,
                name,
                size: 0,
                kind: EntryKind::Dir,
                download_url: None,
            }
        }));

        Ok(files)
    }

    async fn write(
        &self,
        path: &str,
        content: Bytes,
        expected: Option<&ContentHash>,
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        let hash = {
            let mut objects = self.objects.write();
            if self.racing_writes.write().remove(path) {
                debug!(path, "concurrent writer got there first");
                let content = objects
                    .get(path)
                    .map(|o| o.content.clone())
                    .unwrap_or_default();
                objects.insert(
                    path.to_string(),
                    MemoryObject {
                        content,
                        hash: ContentHash::random(),
                    },
                );
            }
            match (objects.get(path), expected) {
                (Some(_), None) => {
                    return Err(StoreError::conflict(path, "file exists and no hash was supplied"));
                }
                (None, Some(_)) => {
                    return Err(StoreError::conflict(path, "file does not exist"));
                }
                (Some(current), Some(expected)) if &current.hash != expected => {
                    return Err(StoreError::conflict(
                        path,
                        format!("does not match {expected}"),
                    ));
                }
                _ => {}
            }

            let hash = ContentHash::random();
            objects.insert(
                path.to_string(),
                MemoryObject {
                    content,
                    hash: hash.clone(),
                },
            );
            hash
        };

        debug!(path, %hash, "memory write");
        Ok(WriteReceipt {
            commit: self.record_commit(message),
            hash: Some(hash),
        })
    }

    async fn delete(
        &self,
        path: &str,
        expected: &ContentHash,
        message: &str,
    ) -> StoreResult<CommitId> {
        if self.failing_deletes.read().contains(path) {
            return Err(StoreError::upstream(500, format!("injected delete failure for {path}")));
        }

        {
            let mut objects = self.objects.write();
            match objects.get(path) {
                None => return Err(StoreError::not_found(path)),
                Some(current) if &current.hash != expected => {
                    return Err(StoreError::conflict(
                        path,
                        format!("does not match {expected}"),
                    ));
                }
                Some(_) => {
                    objects.remove(path);
                }
            }
        }

        debug!(path, "memory delete");
        Ok(self.record_commit(message))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
