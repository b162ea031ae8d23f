//! # Errors
//!
//! Structured, Feathers-style errors for the slides engine.
//! - every failure carries a kind with a status code and class name
//! - can be carried through `anyhow::Error` up to the HTTP layer
//! - transport-agnostic (the axum crate decides how to serialize)

use std::fmt;

use anyhow::Error as AnyError;
use slides_store::StoreError;

/// Result type of every engine operation.
pub type SlideResult<T> = std::result::Result<T, SlideError>;

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,               // 404
    InvalidInput,           // 400
    ConcurrentModification, // 409
    NameExhausted,          // 409
    UpstreamFailure,        // 502
    GeneralError,           // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput => 400,
            ErrorKind::ConcurrentModification => 409,
            ErrorKind::NameExhausted => 409,
            ErrorKind::UpstreamFailure => 502,
            ErrorKind::GeneralError => 500,
        }
    }

    /// Error `name` as sent to clients
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidInput => "BadRequest",
            ErrorKind::ConcurrentModification => "Conflict",
            ErrorKind::NameExhausted => "NameExhausted",
            ErrorKind::UpstreamFailure => "BadGateway",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::InvalidInput => "bad-request",
            ErrorKind::ConcurrentModification => "conflict",
            ErrorKind::NameExhausted => "name-exhausted",
            ErrorKind::UpstreamFailure => "bad-gateway",
            ErrorKind::GeneralError => "general-error",
        }
    }
}

/// A structured engine error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct SlideError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub source: Option<AnyError>,
}

impl SlideError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `SlideError` anywhere in an `anyhow` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&SlideError> {
        err.chain().find_map(|cause| cause.downcast_ref::<SlideError>())
    }

    /// Turn any error into a SlideError:
    /// - already a SlideError: kept as is
    /// - a StoreError: mapped by category
    /// - anything else: GeneralError
    pub fn normalize(err: AnyError) -> SlideError {
        let err = match err.downcast::<SlideError>() {
            Ok(slide) => return slide,
            Err(other) => other,
        };
        match err.downcast::<StoreError>() {
            Ok(store) => SlideError::from(store),
            Err(other) => {
                SlideError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy without the inner `source`, safe to hand to clients.
    pub fn sanitize_for_client(&self) -> SlideError {
        SlideError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    /// `{ name, message, code, className, data? }`
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }

    // ---- Constructors ----

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, msg)
    }
    pub fn concurrent_modification(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConcurrentModification, msg)
    }
    pub fn name_exhausted(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameExhausted, msg)
    }
    pub fn upstream_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamFailure, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl fmt::Display for SlideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for SlideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<StoreError> for SlideError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Conflict { .. } => ErrorKind::ConcurrentModification,
            StoreError::Invalid { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::UpstreamFailure,
        };
        let data = match &err {
            StoreError::NotFound { path } | StoreError::Conflict { path, .. } => {
                Some(serde_json::json!({ "path": path }))
            }
            StoreError::Upstream { status, .. } => Some(serde_json::json!({ "status": status })),
            _ => None,
        };

        let mut slide = SlideError::new(kind, err.to_string()).with_source(AnyError::new(err));
        slide.data = data;
        slide
    }
}

/// Return early with a `SlideError` built from one of its constructors.
#[macro_export]
macro_rules! bail_slide {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::SlideError::$ctor($msg).into())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::SlideError::$ctor(format!($fmt, $($arg)*)).into())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_by_category() {
        let cases = [
            (StoreError::not_found("slides/a.png"), ErrorKind::NotFound),
            (StoreError::conflict("m.json", "stale"), ErrorKind::ConcurrentModification),
            (StoreError::invalid("bad"), ErrorKind::InvalidInput),
            (StoreError::upstream(500, "boom"), ErrorKind::UpstreamFailure),
            (
                StoreError::Decode {
                    path: "x".into(),
                    message: "bad base64".into(),
                },
                ErrorKind::UpstreamFailure,
            ),
        ];

        for (store, kind) in cases {
            assert_eq!(SlideError::from(store).kind, kind);
        }
    }

    #[test]
    fn to_json_has_client_fields() {
        let err = SlideError::concurrent_modification("manifest changed")
            .with_data(serde_json::json!({ "path": "slides/manifest.json" }));
        let json = err.to_json();

        assert_eq!(json["name"], "Conflict");
        assert_eq!(json["code"], 409);
        assert_eq!(json["className"], "conflict");
        assert_eq!(json["message"], "manifest changed");
        assert_eq!(json["data"]["path"], "slides/manifest.json");
    }

    #[test]
    fn normalize_recovers_kinds_through_anyhow() {
        let slide = SlideError::name_exhausted("no free name").into_anyhow();
        assert_eq!(SlideError::normalize(slide).kind, ErrorKind::NameExhausted);

        let store = AnyError::new(StoreError::not_found("slides/x.png"));
        assert_eq!(SlideError::normalize(store).kind, ErrorKind::NotFound);

        let other = anyhow::anyhow!("something odd");
        let normalized = SlideError::normalize(other);
        assert_eq!(normalized.kind, ErrorKind::GeneralError);
        assert!(normalized.sanitize_for_client().source.is_none());
    }

    #[test]
    fn from_anyhow_searches_the_chain() {
        let err = SlideError::invalid_input("empty batch")
            .into_anyhow()
            .context("while handling upload");
        let found = SlideError::from_anyhow(&err).unwrap();
        assert_eq!(found.kind, ErrorKind::InvalidInput);
    }

    fn bails(flag: bool) -> SlideResult<()> {
        if flag {
            bail_slide!(invalid_input, "flag {} rejected", flag);
        }
        Ok(())
    }

    #[test]
    fn bail_macro_returns_constructed_error() {
        assert!(bails(false).is_ok());
        let err = bails(true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert_eq!(err.message, "flag true rejected");
    }
}
