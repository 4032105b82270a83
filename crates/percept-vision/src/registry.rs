//! Per-family model registry: lazy get-or-create with at-most-one load.
//!
//! The registry is owned by server state and injected into the prediction
//! service. The cache lock is held across construction, so two first
//! requests for the same family never load the model twice. Failed loads
//! are not cached; the next request retries, which keeps a transiently
//! broken models directory from wedging the process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use percept_core::{ModelFamily, PredictError};
use tokio::sync::Mutex;
use tracing::warn;

use crate::classifier::Classifier;

/// Lazily-initialized store of one [`Classifier`] per family.
pub struct ModelRegistry {
    models_dir: PathBuf,
    cache: Mutex<HashMap<ModelFamily, Arc<Classifier>>>,
}

impl ModelRegistry {
    /// Create an empty registry reading model resources from `models_dir`.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Directory the registry loads model resources from.
    pub fn models_dir(&self) -> &std::path::Path {
        &self.models_dir
    }

    /// Fetch the classifier for `family`, loading it on first use.
    ///
    /// Construction runs on the blocking pool; the cache lock stays held
    /// until it finishes, guaranteeing at most one load per family.
    pub async fn get(&self, family: ModelFamily) -> Result<Arc<Classifier>, PredictError> {
        let mut cache = self.cache.lock().await;
        if let Some(classifier) = cache.get(&family) {
            return Ok(classifier.clone());
        }

        let dir = self.models_dir.clone();
        let loaded = tokio::task::spawn_blocking(move || Classifier::load(&dir, family))
            .await
            .map_err(|e| PredictError::Configuration(format!("model load task failed: {e}")))?;

        match loaded {
            Ok(classifier) => {
                let classifier = Arc::new(classifier);
                cache.insert(family, classifier.clone());
                Ok(classifier)
            }
            Err(e) => {
                warn!(family = %family, error = %e, "model load failed");
                Err(e)
            }
        }
    }
}
