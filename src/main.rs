//! kgmemory - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use kgmemory::{
    cli::{Args, Commands},
    llm::{ollama::DEFAULT_OLLAMA_URL, OllamaChatClient},
    Config, Filters, GraphMemory, RelationTriple,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    if matches!(args.command, Commands::Config { init: true }) {
        return init_config(&args);
    }

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;

    match &args.command {
        Commands::Config { .. } => {
            show_config(&args, &config).await?;
        }
        Commands::Add { text, user } => {
            let memory = GraphMemory::new(config).await?;
            let added = memory.add(text, &Filters::for_user(user)).await?;

            if added.is_empty() {
                println!("{}", "No new facts added".yellow());
            } else {
                println!("{}", format!("Added {} fact(s):", added.len()).green());
                print_relations(&added);
            }
        }
        Commands::Search { query, user, limit } => {
            let memory = GraphMemory::new(config).await?;
            let results = memory.search(query, &Filters::for_user(user), *limit).await?;

            if results.is_empty() {
                println!("{}", "No matching facts".yellow());
            } else {
                print_relations(&results);
            }
        }
        Commands::List { user, limit } => {
            let memory = GraphMemory::new(config).await?;
            let relations = memory.get_all(&Filters::for_user(user), *limit).await?;

            if relations.is_empty() {
                println!("{}", format!("No facts stored for {}", user).yellow());
            } else {
                print_relations(&relations);
            }
        }
        Commands::Purge { user } => {
            let memory = GraphMemory::new(config).await?;
            memory.delete_all(&Filters::for_user(user)).await?;
            println!("{}", format!("Deleted every fact of {}", user).green());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flags
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.verbosity().filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Write the built-in defaults to the config path unless a file is already there
fn init_config(args: &Args) -> Result<()> {
    let path = args
        .config
        .clone()
        .or_else(Config::default_path)
        .context("No config path: pass --config")?;

    if path.exists() {
        println!("{}", format!("{} already exists", path.display()).yellow());
        return Ok(());
    }

    Config::default().save(&path)?;
    println!("{}", format!("Wrote {}", path.display()).green());
    Ok(())
}

fn print_relations(relations: &[RelationTriple]) {
    for r in relations {
        println!(
            "  {} {} {}",
            r.source.cyan(),
            format!("-{}->", r.relationship).bold(),
            r.target.cyan()
        );
    }
}

async fn show_config(args: &Args, config: &Config) -> Result<()> {
    let location = args
        .config
        .clone()
        .or_else(Config::default_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<built-in defaults>".to_string());

    println!("{}", "kgmemory Configuration".bold());
    println!("  Source: {}", location);
    println!();
    println!("Graph store:");
    println!("  Provider: {}", config.graph_store.provider);
    println!("  URL:      {}", config.graph_store.url);
    println!("LLM:");
    println!("  Provider: {}", config.effective_llm_provider());
    println!("  Model:    {}", config.llm.model);
    if config.effective_llm_provider() == "ollama" {
        let client = OllamaChatClient::with_config(
            config.llm.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
            &config.llm.model,
            config.llm.temperature,
            Duration::from_secs(5),
        )?;
        let status = if client.health_check().await? {
            "reachable".green()
        } else {
            "unreachable".red()
        };
        println!("  Server:   {} ({})", client.base_url(), status);
    }
    println!("Embedder:");
    println!("  Provider: {}", config.embedder.provider);
    println!("  Model:    {}", config.embedder.model);
    println!();

    let mut redacted = config.clone();
    if redacted.graph_store.password.is_some() {
        redacted.graph_store.password = Some("********".to_string());
    }
    if redacted.llm.api_key.is_some() {
        redacted.llm.api_key = Some("********".to_string());
    }
    if redacted.embedder.api_key.is_some() {
        redacted.embedder.api_key = Some("********".to_string());
    }
    println!("{}", redacted.to_toml()?);

    Ok(())
}
