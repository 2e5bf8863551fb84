use super::{Prediction, TextClassifier};
use crate::error::Result;
use crate::models::ModelInfo;

pub const POSITIVE: &str = "POSITIVE";
pub const NEGATIVE: &str = "NEGATIVE";

/// Dummy classifier: even character count is positive, odd is negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParityClassifier;

impl TextClassifier for ParityClassifier {
    fn classify(&self, text: &str) -> Result<Prediction> {
        let label = if text.chars().count() % 2 == 0 {
            POSITIVE
        } else {
            NEGATIVE
        };
        Ok(Prediction {
            label: label.to_string(),
            score: 1.0,
        })
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            backend: "parity".to_string(),
            model_id: None,
            revision: None,
            labels: vec![NEGATIVE.to_string(), POSITIVE.to_string()],
        }
    }
}
