//! Prediction service: validate input, preprocess, fetch the classifier,
//! infer, shape the response.
//!
//! The content-type gate short-circuits before any decode work. Decoding
//! and inference are synchronous CPU/accelerator-bound steps and run on the
//! blocking pool so they never stall the async runtime.

use percept_core::{ModelFamily, PredictError, PredictionResponse};
use percept_vision::{ModelRegistry, preprocess};

/// Number of ranked predictions returned per request.
pub const TOP_K: usize = 5;

/// Orchestrates the request-to-prediction pipeline over an injected
/// [`ModelRegistry`].
pub struct PredictionService {
    registry: ModelRegistry,
}

impl PredictionService {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// Run the full pipeline for one uploaded file.
    ///
    /// `content_type` is the type declared by the upload, checked before any
    /// bytes are inspected. Either fully succeeds or fails with a single
    /// [`PredictError`]; partial results are never returned.
    pub async fn predict(
        &self,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        family: ModelFamily,
    ) -> Result<PredictionResponse, PredictError> {
        match content_type {
            Some(ct) if ct.starts_with("image/") => {}
            other => {
                return Err(PredictError::InvalidInput(format!(
                    "expected an image upload, got content type {:?}",
                    other.unwrap_or("<none>")
                )));
            }
        }

        let image = tokio::task::spawn_blocking(move || preprocess(&bytes, family))
            .await
            .map_err(|e| PredictError::Inference(format!("preprocess task failed: {e}")))??;

        let classifier = self.registry.get(family).await?;

        let predictions = tokio::task::spawn_blocking(move || classifier.infer(&image, TOP_K))
            .await
            .map_err(|e| PredictError::Inference(format!("inference task failed: {e}")))??;

        Ok(PredictionResponse {
            model_type: family.as_str().to_string(),
            predictions,
        })
    }
}
