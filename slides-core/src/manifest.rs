//! Manifest schema normalizer.
//!
//! Stored manifests come in three shapes: an array of path strings, an array
//! of slide objects (mixed arrays are accepted element-wise) and an object
//! wrapping the array under `slides`. Everything in the engine works on the
//! canonical `Vec<SlideRecord>` produced here.

use std::collections::HashSet;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{SlideError, SlideResult};

/// One displayed slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Store path of the image, unique within a manifest
    pub src: String,

    /// Display seconds, positive when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// Fields this engine does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlideRecord {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            duration: None,
            alt: None,
            extra: Map::new(),
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attach alt text; blank text is ignored
    pub fn with_alt(mut self, alt: impl AsRef<str>) -> Self {
        self.alt = clean_alt(alt.as_ref());
        self
    }
}

/// Shape of a manifest document as found in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawManifest<'a> {
    /// Top-level array
    Bare(&'a [Value]),
    /// `{ "slides": [...] }`
    Wrapped(&'a [Value]),
    Unrecognized,
}

impl<'a> RawManifest<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => RawManifest::Bare(items),
            Value::Object(map) => match map.get("slides") {
                Some(Value::Array(items)) => RawManifest::Wrapped(items),
                _ => RawManifest::Unrecognized,
            },
            _ => RawManifest::Unrecognized,
        }
    }

    pub fn items(&self) -> &'a [Value] {
        match self {
            RawManifest::Bare(items) | RawManifest::Wrapped(items) => items,
            RawManifest::Unrecognized => &[],
        }
    }
}

/// A positive finite number, or a string holding one.
pub fn coerce_duration(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n > 0.0).then_some(n)
}

fn clean_alt(alt: &str) -> Option<String> {
    let trimmed = alt.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn record_from_value(value: &Value) -> Option<SlideRecord> {
    match value {
        Value::String(src) if !src.is_empty() => Some(SlideRecord::new(src.clone())),
        Value::Object(map) => {
            let src = match map.get("src") {
                Some(Value::String(src)) if !src.is_empty() => src.clone(),
                _ => return None,
            };
            let duration = map.get("duration").and_then(coerce_duration);
            let alt = match map.get("alt") {
                Some(Value::String(alt)) => clean_alt(alt),
                _ => None,
            };
            let extra = map
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "src" | "duration" | "alt"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Some(SlideRecord {
                src,
                duration,
                alt,
                extra,
            })
        }
        _ => None,
    }
}

/// Canonical slide list of any manifest shape. Never fails: entries without a
/// usable `src` are dropped and duplicate `src` values keep the first one.
pub fn normalize(value: &Value) -> Vec<SlideRecord> {
    let mut seen = HashSet::new();
    RawManifest::classify(value)
        .items()
        .iter()
        .filter_map(record_from_value)
        .filter(|record| seen.insert(record.src.clone()))
        .collect()
}

/// [`normalize`] over raw manifest bytes; invalid JSON normalizes to `[]`.
pub fn normalize_bytes(raw: &[u8]) -> Vec<SlideRecord> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(value) => normalize(&value),
        Err(e) => {
            warn!(error = %e, "manifest is not valid JSON, treating as empty");
            Vec::new()
        }
    }
}

/// Parse slides submitted by a client. Unlike [`normalize`] nothing is
/// silently dropped: a malformed entry fails the whole list.
pub fn parse_items(value: &Value) -> SlideResult<Vec<SlideRecord>> {
    let Value::Array(items) = value else {
        return Err(SlideError::invalid_input("items must be an array"));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(src) => Ok(SlideRecord::new(src.clone())),
            Value::Object(map) => {
                let src = match map.get("src") {
                    Some(Value::String(src)) => src.clone(),
                    _ => {
                        return Err(SlideError::invalid_input(format!(
                            "item {index} has no string src"
                        )))
                    }
                };
                let duration = match map.get("duration") {
                    None | Some(Value::Null) => None,
                    Some(raw) => Some(coerce_duration(raw).ok_or_else(|| {
                        SlideError::invalid_input(format!(
                            "item {index} has an invalid duration"
                        ))
                    })?),
                };
                let alt = match map.get("alt") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(alt)) => clean_alt(alt),
                    Some(_) => {
                        return Err(SlideError::invalid_input(format!(
                            "item {index} has a non-string alt"
                        )))
                    }
                };
                let extra = map
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "src" | "duration" | "alt"))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Ok(SlideRecord {
                    src,
                    duration,
                    alt,
                    extra,
                })
            }
            _ => Err(SlideError::invalid_input(format!(
                "item {index} must be a string or an object"
            ))),
        })
        .collect()
}

/// Canonical array-of-objects form.
pub fn to_json(slides: &[SlideRecord]) -> Value {
    Value::Array(
        slides
            .iter()
            .map(|slide| serde_json::to_value(slide).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Pretty-printed array of slide objects.
pub fn encode_records(slides: &[SlideRecord]) -> SlideResult<Bytes> {
    encode_pretty(&to_json(slides))
}

/// Pretty-printed array of path strings.
pub fn encode_paths<S: AsRef<str>>(paths: &[S]) -> SlideResult<Bytes> {
    let value = Value::Array(
        paths
            .iter()
            .map(|p| Value::String(p.as_ref().to_string()))
            .collect(),
    );
    encode_pretty(&value)
}

fn encode_pretty(value: &Value) -> SlideResult<Bytes> {
    serde_json::to_vec_pretty(value)
        .map(Bytes::from)
        .map_err(|e| SlideError::general_error(format!("failed to encode manifest: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_shapes() {
        assert!(matches!(RawManifest::classify(&json!([])), RawManifest::Bare(_)));
        assert!(matches!(
            RawManifest::classify(&json!({ "slides": ["a"] })),
            RawManifest::Wrapped(_)
        ));
        assert_eq!(RawManifest::classify(&json!({ "slides": 3 })), RawManifest::Unrecognized);
        assert_eq!(RawManifest::classify(&json!("x")), RawManifest::Unrecognized);
    }

    #[test]
    fn normalizes_every_shape_to_records() {
        let strings = normalize(&json!(["slides/a.png", "slides/b.png"]));
        assert_eq!(
            strings,
            vec![SlideRecord::new("slides/a.png"), SlideRecord::new("slides/b.png")]
        );

        let wrapped = normalize(&json!({ "slides": [{ "src": "slides/a.png", "duration": 5 }] }));
        assert_eq!(wrapped, vec![SlideRecord::new("slides/a.png").with_duration(5.0)]);

        let mixed = normalize(&json!(["slides/a.png", { "src": "slides/b.png", "alt": "B" }]));
        assert_eq!(mixed[1].alt.as_deref(), Some("B"));

        assert!(normalize(&json!(42)).is_empty());
        assert!(normalize_bytes(b"{not json").is_empty());
    }

    #[test]
    fn coerces_fields_and_keeps_unknown_ones() {
        let slides = normalize(&json!([
            { "src": "slides/a.png", "duration": "12", "alt": "  ", "transition": "fade" },
            { "src": "slides/b.png", "duration": -3 },
            { "src": "", "duration": 4 },
            { "duration": 4 },
            7,
            { "src": "slides/a.png", "duration": 99 },
        ]));

        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].duration, Some(12.0));
        assert_eq!(slides[0].alt, None);
        assert_eq!(slides[0].extra.get("transition"), Some(&json!("fade")));
        assert_eq!(slides[1].duration, None);
    }

    #[test]
    fn canonical_form_round_trips() {
        let mut extra = Map::new();
        extra.insert("caption".into(), json!({ "vi": "Ảnh" }));
        let slides = vec![
            SlideRecord::new("slides/a.png").with_duration(8.0).with_alt("A"),
            SlideRecord {
                extra,
                ..SlideRecord::new("slides/b.png")
            },
        ];

        assert_eq!(normalize(&to_json(&slides)), slides);
    }

    #[test]
    fn encoders_pretty_print() {
        let paths = encode_paths(&["slides/a.png"]).unwrap();
        assert_eq!(&paths[..], b"[\n  \"slides/a.png\"\n]");

        let records = encode_records(&[SlideRecord::new("slides/a.png").with_duration(8.0)]).unwrap();
        let text = std::str::from_utf8(&records).unwrap();
        assert!(text.contains("\n    \"src\": \"slides/a.png\""));
        assert!(text.contains("\"duration\": 8.0"));
    }

    #[test]
    fn parse_items_is_strict() {
        let ok = parse_items(&json!(["slides/a.png", { "src": "slides/b.png", "duration": "3" }]))
            .unwrap();
        assert_eq!(ok[1].duration, Some(3.0));

        assert!(parse_items(&json!({ "slides": [] })).is_err());
        assert!(parse_items(&json!([{ "duration": 3 }])).is_err());
        assert!(parse_items(&json!([{ "src": "a.png", "duration": 0 }])).is_err());
        assert!(parse_items(&json!([{ "src": "a.png", "alt": 5 }])).is_err());
        assert!(parse_items(&json!([true])).is_err());
    }
}
