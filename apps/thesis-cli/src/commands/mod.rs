pub mod ask;
pub mod evaluate;
pub mod ingest;
pub mod status;
pub mod synthesize;

pub use ask::handle_ask;
pub use evaluate::handle_evaluate;
pub use ingest::handle_ingest;
pub use status::handle_status;
pub use synthesize::handle_synthesize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use thesis_core::config::{resolve_with_base, Config, Settings};
use thesis_rag::Services;
use thesis_vector::{load_corpus, Corpus};
use tracing::warn;

use ingest::build_corpus;

#[derive(Parser)]
#[command(name = "thesis")]
#[command(about = "Retrieve, reformulate and synthesise passages from a personal thesis corpus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config.toml (defaults to the current directory)
    #[arg(short, long, value_name = "DIR", global = true)]
    pub config: Option<PathBuf>,

    /// Rebuild the corpus from data.raw_txt_dir when the saved snapshot is unusable
    #[arg(long, global = true, default_value_t = false)]
    pub rebuild: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Segment, embed and index a directory of .txt documents
    Ingest {
        /// Source directory (defaults to data.raw_txt_dir)
        dir: Option<PathBuf>,
        /// Only ingest the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Retrieve passages for a question, reformulate and synthesise them
    Ask {
        question: String,
        /// Thesis subject used to contextualise the query
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
        /// Skip per-passage reformulation
        #[arg(long, default_value_t = false)]
        no_reformulate: bool,
    },
    /// Write a synthesis of the retrieved passages to a text file
    Synthesize {
        question: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long, default_value = "output/summary.txt")]
        out: PathBuf,
        #[arg(long, default_value = "Thesis Synthesis")]
        title: String,
        #[arg(long, default_value = "Thesis Assistant")]
        author: String,
    },
    /// Score retrieval against a JSON file of labelled questions
    Evaluate {
        /// JSON array of {"question", "relevant": [positions]}
        #[arg(long, value_name = "FILE")]
        truth: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the saved corpus snapshot
    Status,
}

/// Loaded settings plus the directory relative paths resolve against.
pub struct Context {
    pub settings: Settings,
    pub base_dir: PathBuf,
    pub rebuild: bool,
}

impl Context {
    pub fn load(config_dir: Option<&Path>, rebuild: bool) -> Result<Self> {
        let base_dir = config_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let config = Config::load_from(&base_dir, &env_name).context("loading configuration")?;
        let settings = config.settings()?;
        Ok(Self { settings, base_dir, rebuild })
    }

    pub fn raw_dir(&self) -> PathBuf {
        resolve_with_base(&self.base_dir, &self.settings.data.raw_txt_dir)
    }

    pub fn corpus_dir(&self) -> PathBuf {
        resolve_with_base(&self.base_dir, &self.settings.data.corpus_dir)
    }

    pub fn top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.settings.pipeline.top_k)
    }
}

/// Load the corpus snapshot and build services whose embedder matches it.
///
/// With `--rebuild`, a snapshot that is missing, damaged or embedded with a
/// different model is rebuilt from the raw documents instead.
pub async fn open_pipeline(ctx: &Context) -> Result<(Corpus, Arc<Services>)> {
    let dir = ctx.corpus_dir();
    let services = Services::from_settings(&ctx.settings)?;
    let embedder_id = services.embedder().embedder_id().to_string();

    let loaded = match load_corpus(&dir).await {
        Ok(corpus) if corpus.meta.embedder_id != embedder_id => Err(anyhow!(
            "corpus was embedded with '{}' but the configured embedder is '{embedder_id}'",
            corpus.meta.embedder_id
        )),
        Ok(corpus) => Ok(corpus),
        Err(e) => Err(anyhow::Error::new(e).context(format!("loading corpus from {}", dir.display()))),
    };
    let corpus = match loaded {
        Ok(corpus) => corpus,
        Err(e) if ctx.rebuild => {
            let raw = ctx.raw_dir();
            warn!(error = %format!("{e:#}"), source = %raw.display(), "corpus snapshot unusable; rebuilding");
            build_corpus(ctx, &raw, None, services.shared_embedder())
                .await
                .with_context(|| format!("rebuilding corpus from {}", raw.display()))?
        }
        Err(e) => return Err(e.context("run `thesis ingest` or pass --rebuild")),
    };
    Ok((corpus, services))
}
