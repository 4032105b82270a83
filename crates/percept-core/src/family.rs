//! The two supported model families and their static resource mapping.
//!
//! A family selects everything that varies between the two classifiers:
//! preprocessing parameters, the ONNX graph to load, and the label
//! vocabulary file. Parsing happens exactly once at the HTTP boundary;
//! past that point the enum carries all the information.

use std::fmt;
use std::str::FromStr;

use crate::error::PredictError;

/// A supported classifier architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// ResNet-152 convolutional network.
    ResNet152,
    /// ViT-B/16 vision transformer (patch size 16, 224×224 input).
    Vit,
}

impl ModelFamily {
    /// All supported families, in endpoint-listing order.
    pub const ALL: [ModelFamily; 2] = [ModelFamily::ResNet152, ModelFamily::Vit];

    /// Wire name used in URLs and the `model_type` response field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResNet152 => "resnet152",
            Self::Vit => "vit",
        }
    }

    /// File name of the exported ONNX graph, relative to the models directory.
    pub fn weight_file(&self) -> &'static str {
        match self {
            Self::ResNet152 => "resnet152.onnx",
            Self::Vit => "vit.onnx",
        }
    }

    /// File name of the label vocabulary (a JSON string array), relative to
    /// the models directory.
    pub fn class_file(&self) -> &'static str {
        match self {
            Self::ResNet152 => "resnet152_classes.json",
            Self::Vit => "vit_classes.json",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = PredictError;

    /// Parse a wire name. Fails on anything other than the two supported
    /// families, before any resource I/O is attempted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resnet152" => Ok(Self::ResNet152),
            "vit" => Ok(Self::Vit),
            other => Err(PredictError::UnknownFamily(other.to_string())),
        }
    }
}
