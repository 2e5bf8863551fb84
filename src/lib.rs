pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod routes;

pub use config::{ClassifierKind, Config};
pub use error::ClassifierError;
pub use inference::{build_classifier, Prediction, SharedClassifier, TextClassifier};
