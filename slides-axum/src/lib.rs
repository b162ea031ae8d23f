//! slides-axum: Axum adapter for the slides manager.
//!
//! Maps [`slides_core::SlideManager`] operations onto `/files` and `/manifest`
//! routes, turns engine errors into JSON error bodies and converts multipart
//! uploads into the JSON upload shape.

pub mod app;
mod error;
pub mod middlewares;
pub mod rest;
pub mod state;

pub use app::SlidesApp;
pub use error::SlidesAxumError;
pub use state::SlidesAxumState;

pub use axum;
