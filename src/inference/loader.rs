//! Resolution of the files a sentiment model needs on disk.
//!
//! Files come either from a local directory (`MODEL_DIR`) laid out like a
//! Hugging Face repository, or from the Hub at a pinned revision. Hub
//! downloads land in the shared hf-hub cache, so restarts reuse them.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use log::{info, warn};

use crate::config::ModelConfig;
use crate::error::{ClassifierError, Result};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub onnx: PathBuf,
}

impl ModelFiles {
    pub fn resolve(model: &ModelConfig) -> Result<Self> {
        match &model.model_dir {
            Some(dir) => Self::from_dir(dir, &model.onnx_file),
            None => Self::from_hub(model),
        }
    }

    pub fn from_dir(dir: &Path, onnx_file: &str) -> Result<Self> {
        let files = ModelFiles {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            onnx: dir.join(onnx_file),
        };
        for path in [&files.config, &files.tokenizer, &files.onnx] {
            if !path.is_file() {
                return Err(ClassifierError::ModelFormat(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }
        info!("Using local model files from {}", dir.display());
        Ok(files)
    }

    fn from_hub(model: &ModelConfig) -> Result<Self> {
        info!(
            "Fetching {}@{} from the Hugging Face Hub",
            model.model_id, model.revision
        );
        let api = ApiBuilder::new().with_progress(false).build()?;
        let repo = api.repo(Repo::with_revision(
            model.model_id.clone(),
            RepoType::Model,
            model.revision.clone(),
        ));

        Ok(ModelFiles {
            config: fetch(&repo, CONFIG_FILE)?,
            tokenizer: fetch(&repo, TOKENIZER_FILE)?,
            onnx: fetch(&repo, &model.onnx_file)?,
        })
    }
}

// Concurrent processes sharing the cache can briefly contend for its lock.
fn fetch(repo: &ApiRepo, filename: &str) -> Result<PathBuf> {
    let mut attempt = 0;
    loop {
        match repo.get(filename) {
            Ok(path) => return Ok(path),
            Err(e) => {
                let message = e.to_string();
                attempt += 1;
                if message.contains("Lock acquisition failed") && attempt < MAX_RETRIES {
                    let wait = Duration::from_millis(100 * (1 << attempt));
                    warn!("Cache lock busy for {}, retrying in {:?}", filename, wait);
                    thread::sleep(wait);
                    continue;
                }
                return Err(ClassifierError::Download(format!("{}: {}", filename, message)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sentiment-service-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("onnx")).unwrap();
        dir
    }

    #[test]
    fn local_dir_with_all_files_resolves() {
        let dir = scratch_dir("complete");
        for file in [CONFIG_FILE, TOKENIZER_FILE, "onnx/model.onnx"] {
            fs::write(dir.join(file), b"{}").unwrap();
        }

        let files = ModelFiles::from_dir(&dir, "onnx/model.onnx").unwrap();
        assert_eq!(files.onnx, dir.join("onnx/model.onnx"));
        assert_eq!(files.tokenizer, dir.join(TOKENIZER_FILE));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn local_dir_missing_graph_is_rejected() {
        let dir = scratch_dir("missing");
        fs::write(dir.join(CONFIG_FILE), b"{}").unwrap();
        fs::write(dir.join(TOKENIZER_FILE), b"{}").unwrap();

        let err = ModelFiles::from_dir(&dir, "onnx/model.onnx").unwrap_err();
        assert!(matches!(err, ClassifierError::ModelFormat(_)));
        assert!(err.to_string().contains("model.onnx"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
