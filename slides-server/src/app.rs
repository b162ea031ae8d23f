use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use slides_axum::middlewares::MultipartConfig;
use slides_core::config::keys;
use slides_core::SlidesConfigSnapshot;
use slides_store::RepoConfig;

const MB: usize = 1024 * 1024;

struct UploadDefaults;

impl UploadDefaults {
    const MAX_FILE_SIZE_MB: usize = 25;
    const MAX_TOTAL_SIZE_MB: usize = 100;
}

fn value_or<T>(snapshot: &SlidesConfigSnapshot, key: &str, default: T) -> T
where
    T: FromStr,
{
    snapshot
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Repository connection from `store.*` keys
pub fn repo_config(snapshot: &SlidesConfigSnapshot) -> Result<RepoConfig> {
    let mut config = RepoConfig::new()
        .with_repo(
            snapshot.get_string(keys::STORE_OWNER).unwrap_or_default(),
            snapshot.get_string(keys::STORE_REPO).unwrap_or_default(),
        )
        .with_token(snapshot.get_string(keys::STORE_TOKEN).unwrap_or_default())
        .with_timeout(Duration::from_secs(30));

    if let Some(branch) = snapshot.get_string(keys::STORE_BRANCH) {
        config = config.with_branch(branch);
    }
    if let Some(api_base) = snapshot.get_string(keys::STORE_API_BASE) {
        config = config.with_api_base(api_base);
    }

    config
        .validate()
        .context("GITHUB_TOKEN, GH_OWNER and GH_REPO must be set")?;
    Ok(config)
}

/// Upload limits from `upload.*` keys
pub fn multipart_config(snapshot: &SlidesConfigSnapshot) -> MultipartConfig {
    let max_file_mb = value_or(snapshot, keys::UPLOAD_MAX_FILE_MB, UploadDefaults::MAX_FILE_SIZE_MB);
    let max_total_mb = value_or(snapshot, keys::UPLOAD_MAX_TOTAL_MB, UploadDefaults::MAX_TOTAL_SIZE_MB);

    MultipartConfig::new()
        .max_file_size(max_file_mb.saturating_mul(MB))
        .max_total_size(max_total_mb.saturating_mul(MB))
}

/// `host:port` from `http.*` keys
pub fn listen_addr(snapshot: &SlidesConfigSnapshot) -> String {
    let host = snapshot
        .get_string(keys::HTTP_HOST)
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port: u16 = value_or(snapshot, keys::HTTP_PORT, 3030);
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use slides_core::SlidesConfig;

    #[test]
    fn repo_config_requires_credentials() {
        let snapshot = SlidesConfig::with_defaults().snapshot();
        assert!(repo_config(&snapshot).is_err());

        let snapshot = SlidesConfig::from_vars([
            ("GITHUB_TOKEN", "t"),
            ("GH_OWNER", "tngon462"),
            ("GH_REPO", "slide"),
            ("GH_BRANCH", "gh-pages"),
        ])
        .snapshot();
        let config = repo_config(&snapshot).unwrap();
        assert_eq!(config.branch, "gh-pages");
        assert_eq!(
            config.contents_url(),
            "https://api.github.com/repos/tngon462/slide/contents"
        );
    }

    #[test]
    fn limits_and_address_fall_back_to_defaults() {
        let mut config = SlidesConfig::with_defaults();
        config.set(keys::UPLOAD_MAX_FILE_MB, "lots");
        config.set(keys::HTTP_PORT, "8080");
        let snapshot = config.snapshot();

        assert_eq!(multipart_config(&snapshot).max_file_size, Some(25 * MB));
        assert_eq!(listen_addr(&snapshot), "0.0.0.0:8080");
    }

    #[test]
    fn oversized_limits_saturate() {
        let mut config = SlidesConfig::with_defaults();
        config.set(keys::UPLOAD_MAX_FILE_MB, usize::MAX.to_string());
        config.set(keys::UPLOAD_MAX_TOTAL_MB, usize::MAX.to_string());
        let limits = multipart_config(&config.snapshot());

        assert_eq!(limits.max_file_size, Some(usize::MAX));
        assert_eq!(limits.max_total_size, usize::MAX);
        assert_eq!(limits.json_body_limit(), usize::MAX);
    }
}
