use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default = "default_themes")]
    pub themes: Vec<ThemeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            themes: default_themes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            collection: default_collection(),
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/documind.sqlite")
}
fn default_collection() -> String {
    "documents".to_string()
}
fn default_upsert_batch_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    /// Minimum trimmed length for both raw input and surviving chunks.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}
fn default_overlap_chars() -> usize {
    200
}
fn default_min_chars() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_provider() -> String {
    "hashing".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_capacity() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidates fetched per requested result, so post-filtering can still
    /// reach the target count.
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Maximum accepted chunks per owning document in one result set.
    #[serde(default = "default_max_per_document")]
    pub max_per_document: usize,
    /// Cosine-distance relevance floor; candidates beyond it are dropped.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_multiplier: default_candidate_multiplier(),
            max_per_document: default_max_per_document(),
            max_distance: default_max_distance(),
        }
    }
}

fn default_candidate_multiplier() -> usize {
    4
}
fn default_max_per_document() -> usize {
    2
}
fn default_max_distance() -> f64 {
    0.8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThemeConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub keywords: Vec<String>,
}

/// The built-in themes used when the config file defines none.
pub fn default_themes() -> Vec<ThemeConfig> {
    fn theme(name: &str, keywords: &[&str]) -> ThemeConfig {
        ThemeConfig {
            name: name.to_string(),
            description: format!("Documents discussing {}.", name.to_lowercase()),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    vec![
        theme(
            "Regulatory Non-Compliance",
            &["non-compliance", "violation", "regulation", "SEBI", "LODR"],
        ),
        theme(
            "Penalty Justification",
            &["penalty", "fine", "sanction", "statutory"],
        ),
        theme("Legal Framework", &["act", "law", "clause", "section"]),
    ]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.max_chars");
    }
    if config.chunking.min_chars == 0 {
        anyhow::bail!("chunking.min_chars must be > 0");
    }

    if config.storage.upsert_batch_size == 0 {
        anyhow::bail!("storage.upsert_batch_size must be > 0");
    }

    if config.retrieval.candidate_multiplier == 0 {
        anyhow::bail!("retrieval.candidate_multiplier must be >= 1");
    }
    if config.retrieval.max_per_document == 0 {
        anyhow::bail!("retrieval.max_per_document must be >= 1");
    }
    // Cosine distance ranges over [0, 2]; 1.0 already means orthogonal.
    if !(0.0..=2.0).contains(&config.retrieval.max_distance) {
        anyhow::bail!("retrieval.max_distance must be in [0.0, 2.0]");
    }

    match config.embedding.provider.as_str() {
        "hashing" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hashing, openai, ollama, or local.",
            other
        ),
    }

    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    Ok(())
}
