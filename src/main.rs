//! Outline Indexer CLI
//!
//! Builds section trees from LLM-extracted tables of contents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use outline_indexer::{
    config::Config,
    document::{Document, Page},
    indexer::TreeIndexer,
    llm::GenerationClient,
    persistence::{load_tree, save_tree, tree_size},
};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outline Indexer - page-bounded section trees from LLM table-of-contents output
#[derive(Parser)]
#[command(name = "outline-indexer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a tree from a model's table-of-contents response
    Build {
        /// File holding the raw model output (JSON, possibly fenced)
        response: PathBuf,

        /// Source text document, pages separated by form feeds
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Page count when no document is given
        #[arg(short, long, conflicts_with = "document")]
        pages: Option<usize>,

        /// Output path for the tree file (.json or .bin)
        #[arg(short, long, default_value = "data/tree_index.json")]
        output: PathBuf,
    },

    /// Display the tree structure of a saved tree
    Show {
        /// Path to the tree file
        #[arg(default_value = "data/tree_index.json")]
        index: PathBuf,

        /// Output as JSON instead of formatted tree
        #[arg(long)]
        json: bool,
    },

    /// Show information about a saved tree
    Info {
        /// Path to the tree file
        #[arg(default_value = "data/tree_index.json")]
        index: PathBuf,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            response,
            document,
            pages,
            output,
        } => cmd_build(response, document, pages, output).await,
        Commands::Show { index, json } => cmd_show(index, json),
        Commands::Info { index } => cmd_info(index),
        Commands::Test => cmd_test().await,
    }
}

fn load_document(response: &Path, document: Option<PathBuf>, pages: Option<usize>) -> Result<Document> {
    if let Some(path) = document {
        return Document::from_text_file(&path).context("Failed to load document");
    }

    let pages = pages.context("Either --document or --pages is required")?;
    let name = response
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    Ok(Document::new(
        name,
        (1..=pages).map(|n| Page::new(n, String::new())).collect(),
    ))
}

async fn cmd_build(
    response_path: PathBuf,
    document: Option<PathBuf>,
    pages: Option<usize>,
    output: PathBuf,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let response = std::fs::read_to_string(&response_path)
        .with_context(|| format!("Failed to read '{}'", response_path.display()))?;
    let document = load_document(&response_path, document, pages)?;

    println!(
        "Document: {} ({} pages, ~{} tokens)",
        document.name,
        document.page_count(),
        document.total_tokens()
    );

    let options = config.pipeline.clone();
    let indexer = if options.if_add_node_summary || options.if_add_doc_description {
        config.validate().context("Invalid configuration")?;
        println!("Using model: {}", config.llm.model);
        let client = GenerationClient::from_config(&config.llm)
            .context("Failed to create LLM client")?;
        TreeIndexer::with_client(client, &config.llm.model, options)
    } else {
        TreeIndexer::new(options)
    };

    let start = Instant::now();
    let tree = indexer.index(&document, &response).await;
    let build_duration = start.elapsed();

    println!("\nTree Built:");
    println!("  Sections:    {}", tree.node_count());
    println!("  Max depth:   {}", tree.max_depth());
    println!("  Build time:  {:.2?}", build_duration);

    save_tree(&tree, &output).context("Failed to save tree")?;

    let size = tree_size(&output)?;
    println!("\nTree saved to: {}", output.display());
    println!("  File size: {:.1} KB", size as f64 / 1024.0);

    Ok(())
}

fn cmd_show(index_path: PathBuf, json: bool) -> Result<()> {
    let tree = load_tree(&index_path).context("Failed to load tree")?;

    if json {
        let json_str = tree.to_json().context("Failed to serialize tree")?;
        println!("{}", json_str);
    } else {
        println!("{}", tree.format());
    }

    Ok(())
}

fn cmd_info(index_path: PathBuf) -> Result<()> {
    let tree = load_tree(&index_path).context("Failed to load tree")?;
    let size = tree_size(&index_path)?;

    println!("Tree Information");
    println!("{}", "─".repeat(40));
    println!("  Document:     {}", tree.name);
    println!("  Total pages:  {}", tree.total_pages);
    println!("  Sections:     {}", tree.node_count());
    println!("  Max depth:    {}", tree.max_depth());
    println!("  File size:    {:.1} KB", size as f64 / 1024.0);
    println!("  Tree path:    {}", index_path.display());

    if let Some(desc) = &tree.description {
        println!("  Description:  {}", desc);
    }

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;
    let key_prefix: String = config.llm.api_key.chars().take(8).collect();

    println!("Configuration:");
    println!("  Provider:  {}", config.llm.provider);
    println!("  API Base:  {}", config.llm.effective_api_base());
    println!("  Model:     {}", config.llm.model);
    println!("  API Key:   {}...", key_prefix);
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = GenerationClient::from_config(&config.llm).context("Failed to create LLM client")?;

    println!("Sending test request...");
    match client.test_connection(&config.llm.model).await {
        Ok(()) => println!("Connection successful!"),
        Err(e) => println!("Connection failed: {}", e),
    }

    Ok(())
}
