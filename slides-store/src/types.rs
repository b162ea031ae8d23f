use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content hash ("sha") assigned by the store on every write.
///
/// Every replace or delete must present the current hash of the object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Generate a new random hash (used by stores that do not hash content)
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from existing string
    pub fn from_string(hash: String) -> Self {
        Self(hash)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the commit produced by a write or delete
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    /// Generate a new random commit id
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file read from the store
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: String,
    pub content: Bytes,
    pub hash: ContentHash,
}

/// Tagged result of a read: absence is an expected outcome, not an error
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Found(StoredFile),
    NotFound,
}

impl ReadOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert into an Option, dropping the tag
    pub fn into_found(self) -> Option<StoredFile> {
        match self {
            Self::Found(file) => Some(file),
            Self::NotFound => None,
        }
    }
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub path: String,
    pub name: String,
    #[serde(rename = "sha")]
    pub hash: ContentHash,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Result of a successful write
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    pub commit: CommitId,
    /// Hash of the newly written object, when the store reports it
    pub hash: Option<ContentHash>,
}

/// Final path segment of a store path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a directory and a name with exactly one separator
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Parent directory of a store path ("" for top-level paths)
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(join_path("slides/", "a.png"), "slides/a.png");
        assert_eq!(join_path("", "a.png"), "a.png");
        assert_eq!(file_name("slides/sub/a.png"), "a.png");
        assert_eq!(file_name("a.png"), "a.png");
        assert_eq!(parent_dir("slides/a.png"), "slides");
        assert_eq!(parent_dir("a.png"), "");
    }

    #[test]
    fn dir_entry_serializes_with_api_field_names() {
        let entry = DirEntry {
            path: "slides/a.png".into(),
            name: "a.png".into(),
            hash: ContentHash::from_string("abc".into()),
            size: 3,
            kind: EntryKind::File,
            download_url: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sha"], "abc");
        assert_eq!(json["type"], "file");
        assert!(json.get("download_url").is_none());
    }
}
