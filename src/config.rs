//! Runtime configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

pub const DEFAULT_MODEL_ID: &str = "distilbert-base-uncased-finetuned-sst-2-english";
pub const DEFAULT_MODEL_REVISION: &str = "714eb0f";
pub const DEFAULT_ONNX_FILE: &str = "onnx/model.onnx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Onnx,
    Parity,
}

impl FromStr for ClassifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "parity" => Ok(Self::Parity),
            other => Err(anyhow!("unknown classifier '{}' (expected onnx or parity)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_id: String,
    pub revision: String,
    pub model_dir: Option<PathBuf>,
    pub onnx_file: String,
    /// Overrides the model's own position limit from `config.json`.
    pub max_sequence_length: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: DEFAULT_MODEL_REVISION.to_string(),
            model_dir: None,
            onnx_file: DEFAULT_ONNX_FILE.to_string(),
            max_sequence_length: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub classifier: ClassifierKind,
    pub model: ModelConfig,
    pub json_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            classifier: ClassifierKind::Onnx,
            model: ModelConfig::default(),
            json_limit: 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys fall back to
    /// the defaults; set but unparseable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(workers) = parse_var::<usize, _>(&lookup, "WORKERS")? {
            if workers == 0 {
                bail!("WORKERS must be at least 1");
            }
            config.workers = workers;
        }
        if let Some(kind) = parse_var(&lookup, "CLASSIFIER")? {
            config.classifier = kind;
        }
        if let Some(model_id) = lookup("MODEL_ID") {
            config.model.model_id = model_id;
        }
        if let Some(revision) = lookup("MODEL_REVISION") {
            config.model.revision = revision;
        }
        if let Some(dir) = lookup("MODEL_DIR").filter(|d| !d.is_empty()) {
            config.model.model_dir = Some(PathBuf::from(dir));
        }
        if let Some(onnx_file) = lookup("ONNX_FILE") {
            config.model.onnx_file = onnx_file;
        }
        if let Some(len) = parse_var::<usize, _>(&lookup, "MAX_SEQUENCE_LENGTH")? {
            if len < 2 {
                bail!("MAX_SEQUENCE_LENGTH must leave room for special tokens (got {})", len);
            }
            config.model.max_sequence_length = Some(len);
        }
        if let Some(limit) = parse_var(&lookup, "JSON_LIMIT")? {
            config.json_limit = limit;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.classifier, ClassifierKind::Onnx);
        assert_eq!(config.model.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.model.revision, DEFAULT_MODEL_REVISION);
        assert_eq!(config.model.model_dir, None);
        assert_eq!(config.model.max_sequence_length, None);
        assert!(config.workers >= 1);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("WORKERS", "3"),
            ("CLASSIFIER", "Parity"),
            ("MODEL_DIR", "/models/sst2"),
            ("MAX_SEQUENCE_LENGTH", "64"),
        ])
        .unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.workers, 3);
        assert_eq!(config.classifier, ClassifierKind::Parity);
        assert_eq!(config.model.model_dir, Some(PathBuf::from("/models/sst2")));
        assert_eq!(config.model.max_sequence_length, Some(64));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("WORKERS", "0")]).is_err());
        assert!(config_from(&[("CLASSIFIER", "llm")]).is_err());
        assert!(config_from(&[("MAX_SEQUENCE_LENGTH", "1")]).is_err());
    }

    #[test]
    fn test_empty_model_dir_is_ignored() {
        let config = config_from(&[("MODEL_DIR", "")]).unwrap();
        assert_eq!(config.model.model_dir, None);
    }
}
