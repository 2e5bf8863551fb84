use serde::{Deserialize, Serialize};

use crate::inference::Prediction;

pub const PREDICTION_FAILED: &str = "Prediction failed";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PredictRequest {
    pub text: String,
}

/// Body of a `/predict` reply. A reply carries either the prediction or
/// an error, never both.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PredictResponse {
    Success {
        input: String,
        label: String,
        score: f32,
    },
    Failure {
        error: String,
    },
}

impl PredictResponse {
    pub fn success(input: String, prediction: Prediction) -> Self {
        PredictResponse::Success {
            input,
            label: prediction.label,
            score: prediction.score,
        }
    }

    pub fn failure() -> Self {
        PredictResponse::Failure {
            error: PREDICTION_FAILED.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictResponse::Success { .. })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        HealthResponse {
            status: "Ok".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelInfo {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_flat() {
        let response = PredictResponse::success(
            "I love coding!".to_string(),
            Prediction {
                label: "POSITIVE".to_string(),
                score: 0.5,
            },
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"input": "I love coding!", "label": "POSITIVE", "score": 0.5})
        );
    }

    #[test]
    fn failure_carries_only_error() {
        let value = serde_json::to_value(PredictResponse::failure()).unwrap();
        assert_eq!(value, json!({"error": "Prediction failed"}));
    }

    #[test]
    fn health_payload() {
        assert_eq!(
            serde_json::to_value(HealthResponse::ok()).unwrap(),
            json!({"status": "Ok"})
        );
    }

    #[test]
    fn model_info_omits_missing_fields() {
        let info = ModelInfo {
            backend: "parity".to_string(),
            model_id: None,
            revision: None,
            labels: vec!["NEGATIVE".to_string(), "POSITIVE".to_string()],
        };
        assert_eq!(
            serde_json::to_value(info).unwrap(),
            json!({"backend": "parity", "labels": ["NEGATIVE", "POSITIVE"]})
        );
    }
}
