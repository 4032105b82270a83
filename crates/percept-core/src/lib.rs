//! Core types for the Percept image-classification service: model families,
//! the error taxonomy, and the wire-level prediction schema.

pub mod error;
pub mod family;
pub mod prediction;

pub use error::PredictError;
pub use family::ModelFamily;
pub use prediction::{Prediction, PredictionResponse};
