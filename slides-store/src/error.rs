use thiserror::Error;

/// Result type for content store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a content store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// The caller's content hash no longer matches the stored object
    #[error("Stale content hash for {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode content for {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a transport error from any error type
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a stale-hash conflict error
    pub fn conflict<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Conflict {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an upstream error from a status code and response text
    pub fn upstream<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_display_includes_status() {
        let err = StoreError::upstream(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Upstream error (status 502): Bad Gateway");
    }

    #[test]
    fn predicates_match_variants() {
        assert!(StoreError::not_found("slides/a.png").is_not_found());
        assert!(StoreError::conflict("slides/manifest.json", "sha mismatch").is_conflict());
        assert!(!StoreError::invalid("nope").is_conflict());
    }
}
