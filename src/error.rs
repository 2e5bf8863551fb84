use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    // Model loading
    #[error("Model download failed: {0}")]
    Download(String),

    #[error("Invalid model format: {0}")]
    ModelFormat(String),

    #[error("Model metadata missing: {0}")]
    ModelMetadata(String),

    // Per-request
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

impl From<hf_hub::api::sync::ApiError> for ClassifierError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        ClassifierError::Download(value.to_string())
    }
}
