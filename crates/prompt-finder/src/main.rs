mod cache;
mod classifier;
mod config;
mod error;
mod ingest;
mod model;
mod normalizer;
mod pipeline;
mod render;
mod server;
mod store;
#[cfg(test)]
mod test_support;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cache::PromptCache;
use classifier::AudienceClassifier;
use config::Config;
use normalizer::QueryNormalizer;
use pipeline::PromptPipeline;
use server::PromptFinderServer;
use store::PromptStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recommend ready-made instruction prompts", long_about = None)]
struct Cli {
    /// CSV file of prompts to ingest before running the command
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recommend a prompt for a single query
    Query { text: String },
    /// Read queries from stdin until "exit", "quit" or end of input (default)
    Interactive,
    /// Print statistics about the stored prompts
    Stats,
    /// Serve the MCP tools on stdio, or on TCP when MCP_TCP_LISTEN_ADDR is set
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries rendered prompts or MCP JSON-RPC.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Interactive);

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        store_path = %config.store_path,
        table = %config.table_name,
        embedding_model = %config.embedding_model,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    // 2. Connect to Redis (optional; searches run uncached without it)
    let redis_cache = prompt_common::redis::RedisCache::new(config.redis_url.as_deref());
    if !redis_cache.is_enabled() {
        info!("REDIS_URL not set, running without search cache");
    } else if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unreachable, searches run uncached until it comes back");
    }
    let cache = Arc::new(PromptCache::new(
        redis_cache,
        &config.table_name,
        &config.store_path,
        &config.embedding_model.to_string(),
    ));

    // 3. Initialize embedding model and query tokenizer
    info!("initializing embedding model (may download on first run)");
    let embedder = Arc::new(prompt_common::embedding::Embedder::new(config.embedding_model).await?);
    info!(
        model = %embedder.kind(),
        dimensions = embedder.kind().dimensions(),
        "embedding model ready"
    );
    info!(source = %config.tokenizer, "loading query tokenizer");
    let tokenizer = prompt_common::tokenizer::load_tokenizer(config.tokenizer.clone()).await?;

    // 4. Open the prompt store
    let vectordb = Arc::new(prompt_common::vectordb::VectorDb::connect(&config.store_path).await?);
    let store = Arc::new(PromptStore::new(
        embedder,
        vectordb,
        cache,
        config.table_name.clone(),
    ));
    match store.is_populated().await {
        Ok(true) => info!(store_path = %config.store_path, "loaded existing prompt store"),
        Ok(false) => info!(store_path = %config.store_path, "created new prompt store"),
        Err(e) => warn!(
            error = %e,
            store_path = %config.store_path,
            "could not read prompt store, continuing; searches may come back empty"
        ),
    }

    // 5. Optional ingestion; a bad file is reported and the command still runs
    if let Some(csv_path) = &cli.csv {
        match ingest::load_prompts_csv(csv_path) {
            Ok(records) => match store.add(&records).await {
                Ok(added) => info!(added, csv = %csv_path.display(), "ingestion finished"),
                Err(e) => error!(error = %e, csv = %csv_path.display(), "storing prompts failed"),
            },
            Err(e) => error!(error = %e, csv = %csv_path.display(), "ingestion aborted"),
        }
    }

    let pipeline = Arc::new(PromptPipeline::new(
        store.clone(),
        QueryNormalizer::new(tokenizer),
        AudienceClassifier::new(),
    ));

    match command {
        Command::Serve => serve(PromptFinderServer::new(pipeline, store)).await?,
        Command::Stats => print_stats(&store).await,
        Command::Query { text } => {
            print_stats(&store).await;
            let result = pipeline.generate_prompt_for_query(&text).await;
            println!("{}", render::render_result(&result));
        }
        Command::Interactive => {
            print_stats(&store).await;
            interactive(&pipeline).await?;
        }
    }

    Ok(())
}

async fn print_stats(store: &PromptStore) {
    println!("{}\n", render::render_stats(&store.stats().await));
}

async fn interactive(pipeline: &PromptPipeline) -> anyhow::Result<()> {
    println!("Enter a request and a matching prompt will be suggested.");
    println!("Type 'exit' or 'quit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYour request: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let result = pipeline.generate_prompt_for_query(&line).await;
        println!("\n{}", render::render_result(&result));
    }

    println!("Bye.");
    Ok(())
}

async fn serve(server: PromptFinderServer) -> anyhow::Result<()> {
    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
