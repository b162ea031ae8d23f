use std::sync::Arc;

use slides_store::{file_name, ContentStore, ReadOutcome};
use tracing::{debug, instrument};

use crate::errors::{SlideError, SlideResult};

pub const DEFAULT_MAX_ATTEMPTS: usize = 999;

/// Split a path into `(base, ext)` where `ext` is the trailing `.` + ASCII
/// alphanumerics of the final segment, case kept. `ext` may be empty.
///
/// ```rust
/// use slides_core::naming::split_extension;
///
/// assert_eq!(split_extension("slides/Photo.PNG"), ("slides/Photo", ".PNG"));
/// assert_eq!(split_extension("slides/v1.2/noext"), ("slides/v1.2/noext", ""));
/// ```
pub fn split_extension(path: &str) -> (&str, &str) {
    let name = file_name(path);
    let tail_len = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric())
        .count();
    if tail_len == 0 || tail_len == name.len() {
        return (path, "");
    }
    let dot = path.len() - tail_len - 1;
    if path.as_bytes()[dot] == b'.' {
        path.split_at(dot)
    } else {
        (path, "")
    }
}

/// Finds a free path in the store by probing `base-1ext`, `base-2ext`, ...
///
/// Only reads; the caller writes with create-only semantics, so a name taken
/// between probe and write surfaces as a conflict rather than an overwrite.
pub struct UniqueNameResolver {
    store: Arc<dyn ContentStore>,
    max_attempts: usize,
}

impl UniqueNameResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    async fn is_free(&self, path: &str) -> SlideResult<bool> {
        Ok(matches!(self.store.read(path).await?, ReadOutcome::NotFound))
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, desired: &str) -> SlideResult<String> {
        if self.is_free(desired).await? {
            return Ok(desired.to_string());
        }

        let (base, ext) = split_extension(desired);
        for i in 1..=self.max_attempts {
            let candidate = format!("{base}-{i}{ext}");
            debug!(%candidate, "probing");
            if self.is_free(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(SlideError::name_exhausted(format!(
            "no free name for {desired} after {} attempts",
            self.max_attempts
        ))
        .with_data(serde_json::json!({ "path": desired })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_extension_case() {
        assert_eq!(split_extension("slides/a.PNG"), ("slides/a", ".PNG"));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("slides/README"), ("slides/README", ""));
        assert_eq!(split_extension("slides/.png"), ("slides/", ".png"));
        assert_eq!(split_extension("slides/x.we-bp"), ("slides/x.we-bp", ""));
    }
}
