use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use thesis_core::traits::Embedder;
use thesis_core::{Error, Result};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::run_blocking;
use crate::tokenize::tokenize_on_device;

fn candle_err(e: candle_core::Error) -> Error {
    Error::external("candle", e)
}

/// Local sentence embedder on an XLM-RoBERTa backbone (e.g. BGE-M3,
/// multilingual MiniLM) with masked mean pooling.
///
/// Inference runs on tokio's blocking pool, so a caller's timeout can expire
/// while a batch is still being computed.
pub struct XlmRobertaEmbedder {
    inner: Arc<Inference>,
}

struct Inference {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
    id: String,
}

impl XlmRobertaEmbedder {
    pub fn new(model_dir: Option<&str>, max_len: usize) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir)?;
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Configuration(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display())))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", config_path.display())))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config)
            .map_err(|e| Error::Configuration(format!("bad model config: {e}")))?;
        let header: serde_json::Value = serde_json::from_str(&raw_config)
            .map_err(|e| Error::Configuration(format!("bad model config: {e}")))?;
        let dim = header["hidden_size"].as_u64().unwrap_or(1024) as usize;
        let pad_id = header["pad_token_id"].as_u64().unwrap_or(1) as u32;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(candle_err)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(candle_err)?;

        let stem = model_dir.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let id = format!("local:{stem}:d{dim}");
        info!(embedder = %id, "embedding model loaded");
        Ok(Self { inner: Arc::new(Inference { model, tokenizer, device, dim, max_len, pad_id, id }) })
    }
}

impl Inference {
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device).map_err(candle_err)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(candle_err)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(candle_err)?;
        let v: Vec<f32> = pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(candle_err)?;
        if v.len() != self.dim {
            return Err(Error::external(&self.id, format!("dim mismatch: got {} expected {}", v.len(), self.dim)));
        }
        let elapsed = start.elapsed().as_millis();
        if elapsed > 100 { warn!(ms = elapsed, "slow embedding"); } else { debug!(ms = elapsed, "embedded text"); }
        Ok(v)
    }
}

#[async_trait]
impl Embedder for XlmRobertaEmbedder {
    fn embedder_id(&self) -> &str { &self.inner.id }
    fn dim(&self) -> usize { self.inner.dim }
    fn max_len(&self) -> usize { self.inner.max_len }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        run_blocking(&self.inner.id, move || texts.iter().map(|t| inner.embed_one(t)).collect()).await
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = thesis_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        warn!(dir = %p.display(), "configured model dir does not exist");
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { debug!(var, dir = %p.display(), "using model dir from env"); return Ok(p); }
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { return Ok(p.to_path_buf()); }
    }
    Err(Error::Configuration("could not locate embedding model directory; set embedding.model_dir or APP_MODEL_DIR".into()))
}
