//! Prediction service orchestration and the HTTP surface around it.

pub mod http;
pub mod service;

pub use http::{cors_layer, router};
pub use service::{PredictionService, TOP_K};
