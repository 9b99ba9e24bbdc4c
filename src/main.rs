use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use documind::config::{load_config, Config};
use documind::engine::RetrievalEngine;
use documind::extract::extract_file;
use documind::models::DocumentMeta;
use documind::themes::group_themes;

#[derive(Parser)]
#[command(
    name = "documind",
    about = "Document ingestion and semantic retrieval engine",
    version
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "./config/documind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the collection and write a starter config if absent
    Init,
    /// Extract, chunk, embed, and store one document
    Ingest {
        /// Source file (.pdf, .txt, or .md)
        file: PathBuf,
        /// Document id; derived from timestamp and filename when omitted
        #[arg(long)]
        document_id: Option<String>,
    },
    /// Search the collection
    Search {
        /// The query text
        query: String,
        /// Maximum results to return
        #[arg(long, default_value_t = 3)]
        limit: usize,
        /// Emit results and themes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show collection statistics
    Stats,
    /// Show a few stored chunks
    Peek {
        #[arg(long, default_value_t = 3)]
        n: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli.config)?;

    match cli.command {
        Commands::Init => init(&cli.config, &config).await,
        Commands::Ingest { file, document_id } => ingest(&config, &file, document_id).await,
        Commands::Search { query, limit, json } => search(&config, &query, limit, json).await,
        Commands::Stats => stats(&config).await,
        Commands::Peek { n } => peek(&config, n).await,
    }
}

/// Load the config file, or fall back to defaults when the default path
/// does not exist. An explicit path that is missing is still an error.
fn resolve_config(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else if *path == PathBuf::from("./config/documind.toml") {
        Ok(Config::default())
    } else {
        anyhow::bail!("Config file not found: {}", path.display())
    }
}

async fn init(config_path: &PathBuf, config: &Config) -> Result<()> {
    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, STARTER_CONFIG)?;
        println!("Wrote starter config to {}", config_path.display());
    }

    let engine = RetrievalEngine::open(config).await?;
    let stats = engine.stats().await?;
    println!(
        "Collection '{}' ready ({} model, {} dims, {} chunks)",
        stats.collection_name, stats.embedding_model, stats.dims, stats.total_chunks
    );
    engine.close().await;
    Ok(())
}

async fn ingest(config: &Config, file: &PathBuf, document_id: Option<String>) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file path")?
        .to_string();

    let document_id = document_id.unwrap_or_else(|| derive_document_id(&filename));

    let text = extract_file(file).with_context(|| format!("Failed to extract {}", file.display()))?;

    let engine = RetrievalEngine::open(config).await?;
    let meta = DocumentMeta::new(&document_id, &filename);
    let stored = engine.ingest(&text, &meta).await?;
    engine.close().await;

    if stored == 0 {
        println!("No chunks stored for '{}' (text too short or empty)", filename);
    } else {
        println!("Ingested '{}' as {} ({} chunks)", filename, document_id, stored);
    }
    Ok(())
}

async fn search(config: &Config, query: &str, limit: usize, json: bool) -> Result<()> {
    let engine = RetrievalEngine::open(config).await?;
    let results = engine.search(query, limit).await?;
    engine.close().await;

    let themes = group_themes(&results, &config.themes);

    if json {
        let payload = serde_json::json!({
            "results": results,
            "themes": themes,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{} p.{}] score {:.3}",
            i + 1,
            result.metadata.filename,
            result.page,
            result.relevance_score
        );
        println!("   {}", result.text);
    }

    if !themes.is_empty() {
        println!("\nThemes:");
        for theme in &themes {
            println!("  {} — {}", theme.name, theme.citations.join(", "));
        }
    }
    Ok(())
}

async fn stats(config: &Config) -> Result<()> {
    let engine = RetrievalEngine::open(config).await?;
    let stats = engine.stats().await?;
    engine.close().await;

    println!("Collection: {}", stats.collection_name);
    println!("Documents:  {}", stats.total_documents);
    println!("Chunks:     {}", stats.total_chunks);
    println!("Model:      {} ({} dims)", stats.embedding_model, stats.dims);
    Ok(())
}

async fn peek(config: &Config, n: usize) -> Result<()> {
    let engine = RetrievalEngine::open(config).await?;
    let entries = engine.peek(n).await?;
    engine.close().await;

    if entries.is_empty() {
        println!("Collection is empty.");
        return Ok(());
    }
    for entry in &entries {
        let preview: String = entry.text.chars().take(100).collect();
        println!("{} [{}]: {}", entry.chunk_id, entry.document_id, preview);
    }
    Ok(())
}

fn derive_document_id(filename: &str) -> String {
    format!("{}_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"), filename)
}

const STARTER_CONFIG: &str = r#"# documind configuration

[storage]
path = "./data/documind.sqlite"
collection = "documents"
upsert_batch_size = 10

[chunking]
max_chars = 1000
overlap_chars = 200
min_chars = 20

[embedding]
# Providers: hashing (offline), openai, ollama, local (feature local-embeddings)
provider = "hashing"
dims = 384

[retrieval]
candidate_multiplier = 4
max_per_document = 2
max_distance = 0.8
"#;
