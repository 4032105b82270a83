//! Error taxonomy for the prediction pipeline.
//!
//! Every failure below the HTTP boundary is one of these variants; the HTTP
//! layer maps each variant to a status code. No retries happen anywhere in
//! the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    /// The uploaded bytes are not a decodable image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// A model resource is missing or incompatible (class file, ONNX graph,
    /// or a head/vocabulary dimension mismatch).
    #[error("model configuration error: {0}")]
    Configuration(String),

    /// A tensor with the wrong shape reached inference.
    #[error("invalid input tensor shape: expected {expected:?}, got {actual:?}")]
    InputShape {
        expected: [usize; 4],
        actual: [usize; 4],
    },

    /// The forward pass itself failed inside the ONNX runtime.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The request's declared content type does not indicate an image.
    #[error("invalid file type: {0}")]
    InvalidInput(String),

    /// The requested family is not one of the supported values.
    #[error("unknown model family: {0}")]
    UnknownFamily(String),
}
