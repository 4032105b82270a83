//! Wire-level prediction schema shared by the service and its clients.

use serde::{Deserialize, Serialize};

/// A single ranked prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub class_name: String,
    /// Softmax probability in [0, 1].
    pub confidence: f32,
}

/// Response body for `POST /predict/{family}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Wire name of the family that produced the predictions.
    pub model_type: String,
    /// Up to top-K entries, descending by confidence.
    pub predictions: Vec<Prediction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_json_roundtrip() {
        let pred = Prediction {
            class_name: "tabby cat".into(),
            confidence: 0.95,
        };
        let json = serde_json::to_string(&pred).unwrap();
        let parsed: Prediction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.class_name, "tabby cat");
        assert_eq!(parsed.confidence, 0.95);
    }

    #[test]
    fn response_json_shape() {
        let resp = PredictionResponse {
            model_type: "resnet152".into(),
            predictions: vec![
                Prediction {
                    class_name: "cat".into(),
                    confidence: 0.95,
                },
                Prediction {
                    class_name: "dog".into(),
                    confidence: 0.03,
                },
            ],
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["model_type"], "resnet152");
        assert_eq!(value["predictions"][0]["class_name"], "cat");
        assert_eq!(value["predictions"][1]["confidence"], 0.03);
    }

    #[test]
    fn response_parses_from_wire_format() {
        let json = r#"{
            "model_type": "vit",
            "predictions": [
                {"class_name": "bird", "confidence": 0.8}
            ]
        }"#;
        let parsed: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.model_type, "vit");
        assert_eq!(parsed.predictions.len(), 1);
    }
}
