use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use slides_core::SlideError;

#[derive(Debug)]
pub struct SlidesAxumError(pub anyhow::Error);

impl From<anyhow::Error> for SlidesAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<SlideError> for SlidesAxumError {
    fn from(e: SlideError) -> Self {
        Self(e.into_anyhow())
    }
}

fn respond(err: &SlideError) -> Response {
    let safe = err.sanitize_for_client();
    let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, "request rejected");
    }
    (status, Json(safe.to_json())).into_response()
}

impl IntoResponse for SlidesAxumError {
    fn into_response(self) -> Response {
        // A SlideError anywhere in the chain keeps its kind and data
        if let Some(slide) = SlideError::from_anyhow(&self.0) {
            return respond(slide);
        }

        // Store errors map by category, anything else is a GeneralError
        respond(&SlideError::normalize(self.0))
    }
}
