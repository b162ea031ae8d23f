//! # Configuration
//!
//! A plain string key/value store, in the spirit of `app.set()` / `app.get()`.
//! Components never read the environment themselves: the server loads
//! [`SlidesConfig::from_env`] once, takes a [`SlidesConfigSnapshot`] and builds
//! the typed settings records from it.
//!
//! ```rust
//! use slides_core::config::{keys, SlidesConfig};
//!
//! let mut config = SlidesConfig::with_defaults();
//! config.set(keys::IMAGE_DIR, "media/slides");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get(keys::IMAGE_DIR), Some("media/slides"));
//! assert_eq!(snapshot.get_f64(keys::DEFAULT_DURATION), Some(8.0));
//! ```

use std::collections::HashMap;

/// Configuration keys understood by the workspace.
pub mod keys {
    pub const STORE_TOKEN: &str = "store.token";
    pub const STORE_OWNER: &str = "store.owner";
    pub const STORE_REPO: &str = "store.repo";
    pub const STORE_BRANCH: &str = "store.branch";
    pub const STORE_API_BASE: &str = "store.api_base";

    pub const IMAGE_DIR: &str = "slides.image_dir";
    pub const MANIFEST_PATH: &str = "slides.manifest_path";
    pub const DEFAULT_DURATION: &str = "slides.default_duration";

    pub const MAX_NAME_ATTEMPTS: &str = "naming.max_attempts";
    pub const STRICT_NAMES: &str = "naming.strict";

    pub const HTTP_HOST: &str = "http.host";
    pub const HTTP_PORT: &str = "http.port";

    pub const UPLOAD_MAX_FILE_MB: &str = "upload.max_file_mb";
    pub const UPLOAD_MAX_TOTAL_MB: &str = "upload.max_total_mb";
}

/// Environment variable to key mapping used by [`SlidesConfig::from_env`].
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("GITHUB_TOKEN", keys::STORE_TOKEN),
    ("GH_OWNER", keys::STORE_OWNER),
    ("GH_REPO", keys::STORE_REPO),
    ("GH_BRANCH", keys::STORE_BRANCH),
    ("GH_API_BASE", keys::STORE_API_BASE),
    ("IMAGE_DIR", keys::IMAGE_DIR),
    ("MANIFEST_PATH", keys::MANIFEST_PATH),
    ("SLIDES_DEFAULT_DURATION", keys::DEFAULT_DURATION),
    ("SLIDES_MAX_NAME_ATTEMPTS", keys::MAX_NAME_ATTEMPTS),
    ("SLIDES_STRICT_NAMES", keys::STRICT_NAMES),
    ("HTTP_HOST", keys::HTTP_HOST),
    ("HTTP_PORT", keys::HTTP_PORT),
    ("SLIDES_MAX_FILE_SIZE_MB", keys::UPLOAD_MAX_FILE_MB),
    ("SLIDES_MAX_TOTAL_SIZE_MB", keys::UPLOAD_MAX_TOTAL_MB),
];

#[derive(Debug, Default, Clone)]
pub struct SlidesConfig {
    values: HashMap<String, String>,
}

impl SlidesConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Config store preloaded with the default values.
    pub fn with_defaults() -> Self {
        let mut config = Self::new();
        config.set(keys::STORE_BRANCH, "main");
        config.set(keys::STORE_API_BASE, "https://api.github.com");
        config.set(keys::IMAGE_DIR, "slides");
        config.set(keys::MANIFEST_PATH, "slides/manifest.json");
        config.set(keys::DEFAULT_DURATION, "8");
        config.set(keys::MAX_NAME_ATTEMPTS, "999");
        config.set(keys::STRICT_NAMES, "false");
        config.set(keys::HTTP_HOST, "0.0.0.0");
        config.set(keys::HTTP_PORT, "3030");
        config.set(keys::UPLOAD_MAX_FILE_MB, "25");
        config.set(keys::UPLOAD_MAX_TOTAL_MB, "100");
        config
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Defaults overlaid with the given variables; blank values are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::with_defaults();
        for (name, value) in vars {
            let Some((_, key)) = ENV_KEYS.iter().find(|(env, _)| *env == name.as_ref()) else {
                continue;
            };
            let value = value.into();
            if !value.trim().is_empty() {
                config.set(*key, value.trim());
            }
        }
        config
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> SlidesConfigSnapshot {
        SlidesConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable view handed to constructors.
#[derive(Debug, Clone, Default)]
pub struct SlidesConfigSnapshot {
    map: HashMap<String, String>,
}

impl SlidesConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse::<f64>().ok())
    }

    /// Accepts `true/false`, `1/0`, `yes/no`, `on/off`
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let config = SlidesConfig::from_vars([
            ("GITHUB_TOKEN", "ghp_secret"),
            ("GH_OWNER", "tngon462"),
            ("GH_REPO", "slide"),
            ("IMAGE_DIR", "media"),
            ("SLIDES_STRICT_NAMES", "1"),
            ("GH_BRANCH", "  "),
            ("UNRELATED", "x"),
        ]);
        let snapshot = config.snapshot();

        assert_eq!(snapshot.get(keys::STORE_TOKEN), Some("ghp_secret"));
        assert_eq!(snapshot.get(keys::IMAGE_DIR), Some("media"));
        assert_eq!(snapshot.get(keys::STORE_BRANCH), Some("main"));
        assert_eq!(snapshot.get_bool(keys::STRICT_NAMES), Some(true));
        assert_eq!(snapshot.get_usize(keys::MAX_NAME_ATTEMPTS), Some(999));
        assert!(!config.has("UNRELATED"));
    }

    #[test]
    fn typed_getters_reject_garbage() {
        let mut config = SlidesConfig::new();
        config.set(keys::DEFAULT_DURATION, "soon");
        config.set(keys::STRICT_NAMES, "maybe");
        let snapshot = config.snapshot();

        assert_eq!(snapshot.get_f64(keys::DEFAULT_DURATION), None);
        assert_eq!(snapshot.get_bool(keys::STRICT_NAMES), None);
        assert_eq!(snapshot.get_usize(keys::HTTP_PORT), None);
    }
}
