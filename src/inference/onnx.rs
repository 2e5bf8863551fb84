use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use serde::Deserialize;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};
use tract_onnx::prelude::*;

use super::loader::ModelFiles;
use super::{Prediction, TextClassifier};
use crate::config::ModelConfig;
use crate::error::{ClassifierError, Result};
use crate::models::ModelInfo;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Position limit assumed when `config.json` does not declare one.
const DEFAULT_MAX_POSITIONS: usize = 512;

/// Transformer sequence classifier exported to ONNX.
///
/// Inputs are padded to the model's position limit so the graph can be
/// optimized once for a concrete shape. Text is never truncated: an input
/// longer than the limit fails, as it would in the model itself.
pub struct SentimentModel {
    model: Plan,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    inputs: Vec<GraphInput>,
    sequence_length: usize,
    model_id: String,
    revision: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphInput {
    InputIds,
    AttentionMask,
    TokenTypeIds,
}

#[derive(Deserialize)]
struct RawModelConfig {
    id2label: Option<HashMap<String, String>>,
    max_position_embeddings: Option<usize>,
}

impl SentimentModel {
    pub fn load(files: &ModelFiles, model: &ModelConfig) -> Result<Self> {
        let raw: RawModelConfig =
            serde_json::from_str(&std::fs::read_to_string(&files.config)?)?;
        let id2label = raw
            .id2label
            .ok_or_else(|| ClassifierError::ModelMetadata("config.json has no id2label".to_string()))?;
        let labels = labels_from_map(id2label)?;
        let n = sequence_length(model.max_sequence_length, raw.max_position_embeddings)?;
        let tokenizer = load_tokenizer(&files.tokenizer, n)?;

        let mut graph = tract_onnx::onnx()
            .model_for_path(&files.onnx)
            .map_err(format_error)?;

        let names: Vec<String> = graph
            .input_outlets()
            .map_err(format_error)?
            .iter()
            .map(|outlet| graph.node(outlet.node).name.clone())
            .collect();
        let inputs = graph_inputs(&names)?;

        for index in 0..inputs.len() {
            graph = graph
                .with_input_fact(index, InferenceFact::dt_shape(i64::datum_type(), tvec!(1, n)))
                .map_err(format_error)?;
        }

        let model_plan = graph
            .into_optimized()
            .map_err(format_error)?
            .into_runnable()
            .map_err(format_error)?;

        Ok(Self {
            model: model_plan,
            tokenizer,
            labels,
            inputs,
            sequence_length: n,
            model_id: model.model_id.clone(),
            revision: model.revision.clone(),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::Tokenization(e.to_string()))?;
        check_length(encoding.len(), self.sequence_length)?;

        let mut inputs: TVec<TValue> = TVec::new();
        for input in &self.inputs {
            let values = match input {
                GraphInput::InputIds => encoding.get_ids(),
                GraphInput::AttentionMask => encoding.get_attention_mask(),
                GraphInput::TokenTypeIds => encoding.get_type_ids(),
            };
            inputs.push(self.row(values)?.into());
        }

        let outputs = self.model.run(inputs).map_err(inference_error)?;
        let output = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model produced no output".to_string()))?;
        let logits: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(inference_error)?
            .iter()
            .copied()
            .collect();
        Ok(logits)
    }

    fn row(&self, values: &[u32]) -> Result<Tensor> {
        let values: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.sequence_length), values)
            .map_err(inference_error)?;
        Ok(Tensor::from(array))
    }
}

impl TextClassifier for SentimentModel {
    fn classify(&self, text: &str) -> Result<Prediction> {
        let logits = self.logits(text)?;
        check_logits(&logits, &self.labels)?;
        top_prediction(&logits, &self.labels)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            backend: "onnx".to_string(),
            model_id: Some(self.model_id.clone()),
            revision: Some(self.revision.clone()),
            labels: self.labels.clone(),
        }
    }
}

fn format_error(e: impl Display) -> ClassifierError {
    ClassifierError::ModelFormat(format!("{:#}", e))
}

fn inference_error(e: impl Display) -> ClassifierError {
    ClassifierError::Inference(format!("{:#}", e))
}

fn load_tokenizer(path: &Path, length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
        ClassifierError::Tokenization(format!("Failed to load tokenizer: {}", e))
    })?;

    // tokenizer.json may ship its own truncation; long inputs must stay whole.
    tokenizer
        .with_truncation(None)
        .map_err(|e| ClassifierError::Tokenization(e.to_string()))?;

    let pad_token = "[PAD]".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(length),
        pad_id,
        pad_token,
        ..Default::default()
    }));
    Ok(tokenizer)
}

/// Padded input length: the configured override, else the model's own limit.
fn sequence_length(configured: Option<usize>, model_limit: Option<usize>) -> Result<usize> {
    let limit = model_limit.unwrap_or(DEFAULT_MAX_POSITIONS);
    match configured {
        Some(n) if n > limit => Err(ClassifierError::ModelFormat(format!(
            "MAX_SEQUENCE_LENGTH {} exceeds the model's {} positions",
            n, limit
        ))),
        Some(n) => Ok(n),
        None => Ok(limit),
    }
}

fn check_length(tokens: usize, limit: usize) -> Result<()> {
    if tokens > limit {
        return Err(ClassifierError::Tokenization(format!(
            "input is {} tokens, model accepts at most {}",
            tokens, limit
        )));
    }
    Ok(())
}

/// Maps graph input names to the encoding fields fed to them.
fn graph_inputs<S: AsRef<str>>(names: &[S]) -> Result<Vec<GraphInput>> {
    let mut inputs = Vec::with_capacity(names.len());
    for name in names {
        let input = match name.as_ref() {
            "input_ids" => GraphInput::InputIds,
            "attention_mask" => GraphInput::AttentionMask,
            "token_type_ids" => GraphInput::TokenTypeIds,
            other => {
                return Err(ClassifierError::ModelFormat(format!(
                    "unexpected graph input '{}'",
                    other
                )))
            }
        };
        if inputs.contains(&input) {
            return Err(ClassifierError::ModelFormat(format!(
                "duplicate graph input '{}'",
                name.as_ref()
            )));
        }
        inputs.push(input);
    }

    for required in [GraphInput::InputIds, GraphInput::AttentionMask] {
        if !inputs.contains(&required) {
            return Err(ClassifierError::ModelFormat(format!(
                "graph has no {:?} input",
                required
            )));
        }
    }
    Ok(inputs)
}

/// Orders `id2label` entries by class index. Indices must be exactly `0..n`.
fn labels_from_map(id2label: HashMap<String, String>) -> Result<Vec<String>> {
    let mut indexed = id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|id| (id, label))
                .map_err(|_| ClassifierError::ModelMetadata(format!("invalid label id '{}'", id)))
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(id, _)| *id);

    if indexed.is_empty() || indexed.iter().enumerate().any(|(i, (id, _))| i != *id) {
        return Err(ClassifierError::ModelMetadata(
            "id2label must cover ids 0..n".to_string(),
        ));
    }
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

fn check_logits(logits: &[f32], labels: &[String]) -> Result<()> {
    if logits.len() != labels.len() {
        return Err(ClassifierError::Inference(format!(
            "model returned {} logits for {} labels",
            logits.len(),
            labels.len()
        )));
    }
    Ok(())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn top_prediction(logits: &[f32], labels: &[String]) -> Result<Prediction> {
    let probabilities = softmax(logits);
    let (index, score) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
            Some((_, top)) if top >= p => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| ClassifierError::Inference("empty logits".to_string()))?;

    if !score.is_finite() {
        return Err(ClassifierError::Inference(format!(
            "non-finite score from logits {:?}",
            logits
        )));
    }
    Ok(Prediction {
        label: labels[index].clone(),
        score,
    })
}
