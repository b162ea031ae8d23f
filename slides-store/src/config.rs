use std::time::Duration;

use crate::{StoreError, StoreResult};

/// Connection settings for a GitHub-style repository contents API
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// API root, without trailing slash
    pub api_base: String,

    pub owner: String,

    pub repo: String,

    /// Branch every read and write targets
    pub branch: String,

    /// Bearer token held by the server
    pub token: String,

    pub user_agent: String,

    /// Per-request timeout applied by the transport
    pub timeout: Duration,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: String::new(),
            user_agent: "slides-admin".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RepoConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set owner and repository name
    pub fn with_repo<O: Into<String>, R: Into<String>>(mut self, owner: O, repo: R) -> Self {
        self.owner = owner.into();
        self.repo = repo.into();
        self
    }

    /// Set target branch
    pub fn with_branch<S: Into<String>>(mut self, branch: S) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set bearer token
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = token.into();
        self
    }

    /// Set API root (GitHub Enterprise, test servers)
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that everything needed to reach the repository is present
    pub fn validate(&self) -> StoreResult<()> {
        if self.token.trim().is_empty() {
            return Err(StoreError::invalid("missing repository token"));
        }
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(StoreError::invalid("missing repository owner or name"));
        }
        if self.branch.trim().is_empty() {
            return Err(StoreError::invalid("missing repository branch"));
        }
        Ok(())
    }

    /// `{api_base}/repos/{owner}/{repo}/contents`
    pub fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents",
            self.api_base,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo)
        )
    }
}
