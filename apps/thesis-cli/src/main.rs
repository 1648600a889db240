mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{handle_ask, handle_evaluate, handle_ingest, handle_status, handle_synthesize, Cli, Commands, Context};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.config.as_deref(), cli.rebuild)?;

    match cli.command {
        Commands::Ingest { dir, limit } => handle_ingest(&ctx, dir, limit).await?,
        Commands::Ask { question, subject, top_k, no_reformulate } => {
            handle_ask(&ctx, &question, subject.as_deref(), top_k, no_reformulate).await?
        }
        Commands::Synthesize { question, subject, top_k, out, title, author } => {
            handle_synthesize(&ctx, &question, subject.as_deref(), top_k, out, &title, &author).await?
        }
        Commands::Evaluate { truth, top_k } => handle_evaluate(&ctx, &truth, top_k).await?,
        Commands::Status => handle_status(&ctx).await?,
    }

    Ok(())
}
