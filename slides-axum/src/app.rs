use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::routing::get;
use axum::Router;
use slides_core::SlideManager;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::middlewares::{MultipartConfig, MultipartToJson, UuidRequestId};
use crate::rest;
use crate::SlidesAxumState;

/// The slides HTTP application: REST routes plus the middleware stack.
///
/// Routes are collected in `router`; [`SlidesApp::into_router`] wraps them in
/// request ids, tracing, body limits and multipart conversion.
pub struct SlidesApp {
    pub manager: Arc<SlideManager>,
    pub router: Router<()>,
    multipart: MultipartConfig,
}

impl Clone for SlidesApp {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            router: self.router.clone(),
            multipart: self.multipart.clone(),
        }
    }
}

impl SlidesApp {
    pub fn new(manager: SlideManager) -> Self {
        let state = SlidesAxumState::new(manager);
        Self {
            manager: Arc::clone(&state.manager),
            router: rest::slides_router(state),
            multipart: MultipartConfig::default(),
        }
    }

    pub fn with_multipart(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// Mount a GET handler at `path`
    pub fn service<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    pub fn into_router(self) -> Router<()> {
        let body_limit = self.multipart.json_body_limit();
        self.router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(MultipartToJson::with_config(self.multipart))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
