//! ONNX Runtime classifier: one loaded network plus its label vocabulary.
//!
//! Each family's exported graph (ResNet-152 or ViT-B/16 with a
//! Linear→ReLU→Dropout→Linear head) lives in `<family>.onnx` next to a JSON
//! label array. The classifier runs the forward pass, applies softmax over
//! the class dimension, and returns the top-K labels by probability.

use std::path::Path;
use std::sync::Mutex;

use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use ort::session::Session;
use ort::value::Tensor;
use percept_core::{ModelFamily, PredictError, Prediction};
use tracing::info;

use crate::preprocess::PreprocessedImage;

/// Expected input tensor shape, both families.
const INPUT_SHAPE: [usize; 4] = [1, 3, 224, 224];

/// Compute device chosen once at load time, fixed for the instance lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }
}

/// A loaded classifier for one model family.
///
/// Immutable after construction; the session sits behind a mutex because
/// ONNX Runtime's `run` needs exclusive access, but no other state is
/// touched during inference.
#[derive(Debug)]
pub struct Classifier {
    family: ModelFamily,
    labels: Vec<String>,
    input_name: String,
    session: Mutex<Session>,
    device: Device,
}

impl Classifier {
    /// Load the family's label vocabulary and ONNX graph from `models_dir`.
    ///
    /// Fails with [`PredictError::Configuration`] when either resource is
    /// missing or malformed, or when the graph's declared output dimension
    /// contradicts the vocabulary length.
    pub fn load(models_dir: &Path, family: ModelFamily) -> Result<Self, PredictError> {
        let class_path = models_dir.join(family.class_file());
        let weight_path = models_dir.join(family.weight_file());

        if !class_path.exists() {
            return Err(PredictError::Configuration(format!(
                "class file not found: {}",
                class_path.display()
            )));
        }
        if !weight_path.exists() {
            return Err(PredictError::Configuration(format!(
                "model file not found: {}",
                weight_path.display()
            )));
        }

        let raw = std::fs::read_to_string(&class_path).map_err(|e| {
            PredictError::Configuration(format!("read {}: {e}", class_path.display()))
        })?;
        let labels: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            PredictError::Configuration(format!("parse {}: {e}", class_path.display()))
        })?;
        if labels.is_empty() {
            return Err(PredictError::Configuration(format!(
                "empty class vocabulary in {}",
                class_path.display()
            )));
        }

        let mut builder = Session::builder()
            .map_err(|e| PredictError::Configuration(format!("create session builder: {e}")))?;

        // Probe the accelerator once; the choice is fixed for the lifetime
        // of this instance.
        let cuda = CUDAExecutionProvider::default();
        let device = if cuda.is_available().unwrap_or(false) {
            builder = builder
                .with_execution_providers([cuda.build()])
                .map_err(|e| {
                    PredictError::Configuration(format!("register CUDA provider: {e}"))
                })?;
            Device::Cuda
        } else {
            Device::Cpu
        };

        let session = builder.commit_from_file(&weight_path).map_err(|e| {
            PredictError::Configuration(format!("load {}: {e}", weight_path.display()))
        })?;

        // The head's output dimension must match the vocabulary length.
        // A mismatched export surfaces here rather than at request time.
        if let Some(dim) = declared_output_dim(&session)
            && dim != labels.len()
        {
            return Err(PredictError::Configuration(format!(
                "model head has {dim} outputs but vocabulary {} has {} classes",
                class_path.display(),
                labels.len()
            )));
        }

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| {
                PredictError::Configuration(format!(
                    "model {} declares no inputs",
                    weight_path.display()
                ))
            })?;

        info!(
            family = %family,
            device = device.as_str(),
            classes = labels.len(),
            model = %weight_path.display(),
            "loaded classifier"
        );

        Ok(Self {
            family,
            labels,
            input_name,
            session: Mutex::new(session),
            device,
        })
    }

    /// The family this classifier serves.
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Compute device chosen at load time.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Number of classes in the vocabulary.
    pub fn class_count(&self) -> usize {
        self.labels.len()
    }

    /// Run inference and return up to `top_k` ranked predictions.
    ///
    /// Never returns more entries than there are classes. The tensor shape
    /// is validated before the session is touched; a malformed tensor fails
    /// fast with [`PredictError::InputShape`]. Tie-break order between equal
    /// probabilities is unspecified.
    pub fn infer(
        &self,
        image: &PreprocessedImage,
        top_k: usize,
    ) -> Result<Vec<Prediction>, PredictError> {
        validate_input_shape(image)?;

        let shape = INPUT_SHAPE.map(|d| d as i64);
        let tensor = Tensor::from_array((shape, image.data.clone().into_boxed_slice()))
            .map_err(|e| PredictError::Inference(format!("build input tensor: {e}")))?;

        // Recover from a poisoned lock; the session holds no partial state
        // across run calls.
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| PredictError::Inference(format!("forward pass: {e}")))?;

        let (out_shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictError::Inference(format!("extract output: {e}")))?;

        let dims: &[i64] = out_shape;
        if dims.len() != 2 || dims[0] != 1 || dims[1] as usize != self.labels.len() {
            return Err(PredictError::Inference(format!(
                "unexpected output shape {dims:?}, expected [1, {}]",
                self.labels.len()
            )));
        }

        let probabilities = softmax(logits);
        Ok(rank_predictions(&probabilities, &self.labels, top_k))
    }
}

/// Reject tensors that are not `(1, 3, 224, 224)` before the session is
/// touched.
fn validate_input_shape(image: &PreprocessedImage) -> Result<(), PredictError> {
    if image.shape != INPUT_SHAPE || image.data.len() != INPUT_SHAPE.iter().product::<usize>() {
        return Err(PredictError::InputShape {
            expected: INPUT_SHAPE,
            actual: image.shape,
        });
    }
    Ok(())
}

/// Read the declared output dimension from the graph's first output, if the
/// export carries a static shape.
fn declared_output_dim(session: &Session) -> Option<usize> {
    match session.outputs().first()?.dtype() {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

/// Numerically-stable softmax over raw logits.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Select the `min(top_k, labels.len())` highest-probability entries,
/// descending.
fn rank_predictions(probabilities: &[f32], labels: &[String], top_k: usize) -> Vec<Prediction> {
    let effective_k = top_k.min(labels.len());

    let mut indices: Vec<usize> = (0..probabilities.len()).collect();
    indices.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(effective_k);

    indices
        .into_iter()
        .map(|i| Prediction {
            class_name: labels[i].clone(),
            confidence: probabilities[i],
        })
        .collect()
}
