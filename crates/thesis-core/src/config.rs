//! Layered configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed with `__` in the environment, e.g.
//! `APP_PIPELINE__TOP_K=8`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load with config files resolved under `dir` for a given environment name.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an already assembled figment (tests, embedding in other tools).
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::Configuration(format!("invalid settings: {e}")))
    }

    fn validate(&self) -> Result<()> {
        let s = self.settings()?;
        if s.pipeline.batch_size < 2 {
            return Err(Error::Configuration(format!(
                "pipeline.batch_size must be at least 2 (got {})",
                s.pipeline.batch_size
            )));
        }
        if s.pipeline.max_concurrency == 0 {
            return Err(Error::Configuration("pipeline.max_concurrency must be positive".into()));
        }
        if s.pipeline.timeout_secs == 0 {
            return Err(Error::Configuration("pipeline.timeout_secs must be positive".into()));
        }
        if s.embedding.batch_size == 0 {
            return Err(Error::Configuration("embedding.batch_size must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub segment: SegmentSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub raw_txt_dir: String,
    pub corpus_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { raw_txt_dir: "data/articles".into(), corpus_dir: "data/corpus".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentSettings {
    pub min_length: usize,
    pub clean: bool,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self { min_length: 25, clean: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Local,
    Http,
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpApi {
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_dir: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub api: HttpApi,
    pub max_len: usize,
    pub batch_size: usize,
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Local,
            model_dir: None,
            model: "text-embedding-3-small".into(),
            base_url: None,
            api: HttpApi::OpenAi,
            max_len: 256,
            batch_size: 32,
            dim: 384,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub backend: GenerationBackend,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub reformulate_max_tokens: usize,
    pub synthesis_max_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::OpenAi,
            model: "gpt-4o-mini".into(),
            base_url: None,
            temperature: 0.7,
            top_p: 0.9,
            reformulate_max_tokens: 200,
            synthesis_max_tokens: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { top_k: 5, batch_size: 50, max_concurrency: 4, timeout_secs: 60 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
