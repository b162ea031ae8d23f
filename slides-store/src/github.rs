//! GitHub repository-contents backend
//!
//! Maps [`ContentStore`] onto `GET/PUT/DELETE /repos/{owner}/{repo}/contents/{path}`.
//! Content travels base64-encoded; the file `sha` is the optimistic-concurrency token.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::{
    CommitId, ContentHash, ContentStore, DirEntry, EntryKind, ReadOutcome, RepoConfig, StoreError,
    StoreResult, StoredFile, WriteReceipt,
};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Content store backed by a GitHub repository branch
pub struct GitHubStore {
    transport: Arc<dyn HttpTransport>,
    config: RepoConfig,
}

#[derive(Debug, Deserialize)]
struct ContentsFile {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    content: Option<ShaRef>,
    commit: ShaRef,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

impl GitHubStore {
    /// Create a store using the reqwest transport
    pub fn new(config: RepoConfig) -> StoreResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout, &config.user_agent)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a store over a custom transport
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: RepoConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Contents URL for a path, each segment percent-encoded
    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.config.contents_url(), encoded.join("/"))
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(&self.config.token)
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", self.config.user_agent.clone())
    }

    fn get_request(&self, path: &str) -> HttpRequest {
        let url = format!(
            "{}?ref={}",
            self.contents_url(path),
            urlencoding::encode(&self.config.branch)
        );
        self.request(HttpMethod::Get, url)
    }

    /// Map a non-success response to a store error
    fn failure(path: &str, response: &HttpResponse, absent_is_not_found: bool) -> StoreError {
        let text = response.text();
        match response.status {
            404 if absent_is_not_found => StoreError::not_found(path),
            409 => StoreError::conflict(path, text),
            422 if text.contains("sha") => StoreError::conflict(path, text),
            status => StoreError::upstream(status, text),
        }
    }

    fn decode_base64(path: &str, encoded: &str) -> StoreResult<Bytes> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map(Bytes::from)
            .map_err(|e| StoreError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Files over the inline size limit come back with `encoding: "none"`
    async fn download_raw(&self, path: &str, url: &str) -> StoreResult<Bytes> {
        debug!(path, "fetching raw content");
        let response = self
            .transport
            .execute(self.request(HttpMethod::Get, url.to_string()))
            .await?;
        if !response.is_success() {
            return Err(Self::failure(path, &response, true));
        }
        Ok(response.body)
    }

    fn convert_entry(entry: ContentsEntry) -> DirEntry {
        let kind = match entry.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            _ => EntryKind::Other,
        };
        DirEntry {
            path: entry.path,
            name: entry.name,
            hash: ContentHash::from_string(entry.sha),
            size: entry.size,
            kind,
            download_url: entry.download_url,
        }
    }
}

#[async_trait]
impl ContentStore for GitHubStore {
    #[instrument(skip(self), fields(repo = %self.config.repo))]
    async fn read(&self, path: &str) -> StoreResult<ReadOutcome> {
        let response = self.transport.execute(self.get_request(path)).await?;
        if response.status == 404 {
            debug!(path, "not found");
            return Ok(ReadOutcome::NotFound);
        }
        if !response.is_success() {
            return Err(Self::failure(path, &response, true));
        }

        let value: serde_json::Value = serde_json::from_slice(&response.body)?;
        if value.is_array() {
            return Err(StoreError::invalid(format!("{path} is a directory")));
        }
        let file: ContentsFile = serde_json::from_value(value)?;
        if file.kind != "file" {
            return Err(StoreError::invalid(format!("{path} is not a file ({})", file.kind)));
        }

        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            (Some("base64"), Some(encoded)) => Self::decode_base64(&file.path, encoded)?,
            _ => match file.download_url.as_deref() {
                Some(url) => self.download_raw(&file.path, url).await?,
                None => Bytes::new(),
            },
        };

        Ok(ReadOutcome::Found(StoredFile {
            path: file.path,
            content,
            hash: ContentHash::from_string(file.sha),
        }))
    }

    #[instrument(skip(self), fields(repo = %self.config.repo))]
    async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>> {
        let response = self.transport.execute(self.get_request(dir)).await?;
        if response.status == 404 {
            debug!(dir, "directory missing, listing as empty");
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(Self::failure(dir, &response, true));
        }

        let value: serde_json::Value = serde_json::from_slice(&response.body)?;
        if !value.is_array() {
            return Err(StoreError::invalid(format!("{dir} is not a directory")));
        }
        let entries: Vec<ContentsEntry> = serde_json::from_value(value)?;
        Ok(entries.into_iter().map(Self::convert_entry).collect())
    }

    #[instrument(skip(self, content, message), fields(repo = %self.config.repo, bytes = content.len()))]
    async fn write(
        &self,
        path: &str,
        content: Bytes,
        expected: Option<&ContentHash>,
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        let body = PutBody {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(&content),
            branch: &self.config.branch,
            sha: expected.map(ContentHash::as_str),
        };
        let request = self
            .request(HttpMethod::Put, self.contents_url(path))
            .json(&body)?;

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(Self::failure(path, &response, false));
        }

        let parsed: WriteResponse = serde_json::from_slice(&response.body)?;
        info!(path, commit = %parsed.commit.sha, "wrote file");

        Ok(WriteReceipt {
            commit: CommitId::from_string(parsed.commit.sha),
            hash: parsed.content.map(|c| ContentHash::from_string(c.sha)),
        })
    }

    #[instrument(skip(self, message), fields(repo = %self.config.repo))]
    async fn delete(
        &self,
        path: &str,
        expected: &ContentHash,
        message: &str,
    ) -> StoreResult<CommitId> {
        let body = DeleteBody {
            message,
            sha: expected.as_str(),
            branch: &self.config.branch,
        };
        let request = self
            .request(HttpMethod::Delete, self.contents_url(path))
            .json(&body)?;

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(Self::failure(path, &response, true));
        }

        let parsed: WriteResponse = serde_json::from_slice(&response.body)?;
        info!(path, commit = %parsed.commit.sha, "deleted file");

        Ok(CommitId::from_string(parsed.commit.sha))
    }

    fn backend(&self) -> &'static str {
        "github"
    }
}
