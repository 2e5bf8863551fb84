pub mod loader;
pub mod onnx;
pub mod parity;

use std::sync::Arc;

use log::info;

use crate::config::{ClassifierKind, Config};
use crate::error::Result;
use crate::models::ModelInfo;

pub use loader::ModelFiles;
pub use onnx::SentimentModel;
pub use parity::ParityClassifier;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// A pretrained text classifier: text in, top label and its confidence out.
///
/// Implementations are loaded once before serving and only read afterwards,
/// so a single instance is shared by every worker.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Prediction>;

    fn info(&self) -> ModelInfo;
}

pub type SharedClassifier = Arc<dyn TextClassifier>;

/// Constructs the classifier selected by `config`. For the ONNX backend this
/// resolves (and possibly downloads) the model files, so call it before
/// binding the server.
pub fn build_classifier(config: &Config) -> Result<SharedClassifier> {
    match config.classifier {
        ClassifierKind::Parity => {
            info!("Using parity classifier");
            Ok(Arc::new(ParityClassifier))
        }
        ClassifierKind::Onnx => {
            let files = ModelFiles::resolve(&config.model)?;
            let model = SentimentModel::load(&files, &config.model)?;
            info!(
                "ONNX model loaded: {}@{} ({} labels)",
                config.model.model_id,
                config.model.revision,
                model.labels().len()
            );
            Ok(Arc::new(model))
        }
    }
}
