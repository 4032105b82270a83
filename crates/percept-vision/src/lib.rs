//! The request-to-prediction pipeline: image decoding and normalization,
//! ONNX Runtime classifiers, and the per-family model registry.

pub mod classifier;
pub mod preprocess;
pub mod registry;

pub use classifier::{Classifier, Device};
pub use preprocess::{PreprocessedImage, preprocess};
pub use registry::ModelRegistry;
