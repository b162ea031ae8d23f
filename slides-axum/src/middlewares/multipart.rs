use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde_json::{json, Map, Value};
use slides_core::SlideError;
use std::collections::{BTreeMap, HashSet};
use tower::{Layer, Service};
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for multipart to JSON conversion
#[derive(Clone, Debug)]
pub struct MultipartConfig {
    /// Maximum file size in bytes (None = unlimited)
    pub max_file_size: Option<usize>,
    /// Maximum total request size in bytes
    pub max_total_size: usize,
    /// Allowed content types for files (empty = all allowed)
    pub allowed_content_types: HashSet<String>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: Some(25 * 1024 * 1024),
            max_total_size: 100 * 1024 * 1024,
            allowed_content_types: HashSet::new(),
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum file size in bytes
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = Some(size);
        self
    }

    /// Set maximum total request size in bytes
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    /// Add allowed content type for files
    pub fn allow_content_type(mut self, content_type: &str) -> Self {
        self.allowed_content_types.insert(content_type.to_string());
        self
    }

    /// Body limit for the JSON produced from a request of `max_total_size`
    pub fn json_body_limit(&self) -> usize {
        (self.max_total_size / 3)
            .saturating_mul(4)
            .saturating_add(64 * 1024)
    }
}

/// Middleware that converts multipart/form-data requests to JSON.
///
/// Files become `{ filename, content_type, size, data }` objects with base64
/// `data`. A field named `images[]` is collected under `images`; repeated or
/// `[]`-suffixed fields always produce arrays.
#[derive(Clone, Default)]
pub struct MultipartToJson {
    config: MultipartConfig,
}

impl MultipartToJson {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MultipartConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for MultipartToJson {
    type Service = MultipartToJsonService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MultipartToJsonService {
            inner,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MultipartToJsonService<S> {
    inner: S,
    config: MultipartConfig,
}

impl<S> Service<Request<Body>> for MultipartToJsonService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let is_multipart = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("multipart/form-data"));

            if !is_multipart {
                return inner.call(req).await;
            }

            match convert_multipart_to_json(req, &config).await {
                Ok(json_req) => inner.call(json_req).await,
                Err(e) => {
                    debug!(error = %e, "multipart conversion failed");
                    let err = SlideError::invalid_input(format!(
                        "Failed to parse multipart data: {e}"
                    ));
                    Ok((StatusCode::BAD_REQUEST, Json(err.to_json())).into_response())
                }
            }
        })
    }
}

#[derive(Default)]
struct Collected {
    force_array: bool,
    values: Vec<Value>,
}

async fn convert_multipart_to_json(
    req: Request<Body>,
    config: &MultipartConfig,
) -> Result<Request<Body>, BoxError> {
    let (mut parts, body) = req.into_parts();

    let boundary = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or("Missing boundary in multipart content-type")?;

    let body_bytes = axum::body::to_bytes(body, config.max_total_size)
        .await
        .map_err(|e| format!("Failed to read request body: {e}"))?;

    let mut multipart = multer::Multipart::new(
        futures::stream::once(async { Ok::<bytes::Bytes, multer::Error>(body_bytes) }),
        boundary,
    );
    let mut fields: BTreeMap<String, Collected> = BTreeMap::new();

    while let Some(field) = multipart.next_field().await? {
        let raw_name = field.name().unwrap_or("unknown").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let filename = field.file_name().map(|f| f.to_string());

        // Auto-detect: has filename or content-type suggests file
        let is_file_field = filename.is_some()
            || content_type
                .as_ref()
                .is_some_and(|ct| !ct.starts_with("text/"));

        let value = if is_file_field {
            if !config.allowed_content_types.is_empty() {
                let ct = content_type.as_deref().unwrap_or("application/octet-stream");
                if !config.allowed_content_types.contains(ct) {
                    return Err(format!("Content type '{ct}' not allowed for '{raw_name}'").into());
                }
            }

            let data = field.bytes().await?;
            if let Some(max_size) = config.max_file_size {
                if data.len() > max_size {
                    return Err(format!(
                        "File '{}' exceeds maximum size of {max_size} bytes",
                        filename.as_deref().unwrap_or(&raw_name)
                    )
                    .into());
                }
            }
            debug!(field = %raw_name, size = data.len(), "file field");

            json!({
                "filename": filename,
                "content_type": content_type,
                "size": data.len(),
                "data": base64::engine::general_purpose::STANDARD.encode(&data),
            })
        } else {
            Value::String(field.text().await?)
        };

        let force_array = raw_name.ends_with("[]");
        let key = raw_name.trim_end_matches("[]").to_string();
        let entry = fields.entry(key).or_default();
        entry.force_array |= force_array;
        entry.values.push(value);
    }

    let mut json_map = Map::new();
    for (key, mut collected) in fields {
        let value = if collected.values.len() == 1 && !collected.force_array {
            collected.values.remove(0)
        } else {
            Value::Array(collected.values)
        };
        json_map.insert(key, value);
    }

    let json_bytes = serde_json::to_vec(&Value::Object(json_map))?;

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(json_bytes.len()));

    Ok(Request::from_parts(parts, Body::from(json_bytes)))
}
