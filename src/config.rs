use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    /// Corpus layout: `taxonomy` (city/category/type/building/<reports_dir>/*)
    /// or `flat` (document files directly under the root).
    #[serde(default = "default_layout")]
    pub layout: String,
    /// Name of the fixed reports subfolder under each building (taxonomy layout).
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    /// Filename patterns that count as documents.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_layout() -> String {
    "taxonomy".to_string()
}
fn default_reports_dir() -> String {
    "reports".to_string()
}
fn default_include_globs() -> Vec<String> {
    vec!["*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchemaConfig {
    /// Schema mode: `inspection` (fixed field table) or `sampled`
    /// (per-document random subset of the language's candidate pool).
    #[serde(default = "default_schema_mode")]
    pub mode: String,
    #[serde(default = "default_min_fields")]
    pub min_fields: usize,
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,
    /// Seed for sampled-mode field selection. Unset means a fresh
    /// entropy-seeded RNG per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            mode: default_schema_mode(),
            min_fields: default_min_fields(),
            max_fields: default_max_fields(),
            seed: None,
        }
    }
}

fn default_schema_mode() -> String {
    "inspection".to_string()
}
fn default_min_fields() -> usize {
    8
}
fn default_max_fields() -> usize {
    12
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Generative provider: `gemini`, `openai`, or `disabled`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on the document excerpt embedded in the prompt, in characters.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            excerpt_chars: default_excerpt_chars(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_excerpt_chars() -> usize {
    8000
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuggestionsConfig {
    #[serde(default = "default_suggestions_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_per_record")]
    pub max_per_record: usize,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            enabled: default_suggestions_enabled(),
            max_per_record: default_max_per_record(),
        }
    }
}

fn default_suggestions_enabled() -> bool {
    true
}
fn default_max_per_record() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_suggestions_dir")]
    pub suggestions_dir: PathBuf,
    /// Language-partitioned and binarized CSV views land here.
    #[serde(default = "default_partitioned_dir")]
    pub partitioned_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            data_dir: default_data_dir(),
            suggestions_dir: default_suggestions_dir(),
            partitioned_dir: default_partitioned_dir(),
        }
    }
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_suggestions_dir() -> PathBuf {
    PathBuf::from("suggestions")
}
fn default_partitioned_dir() -> PathBuf {
    PathBuf::from("output")
}

impl ExtractionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate corpus
    match config.corpus.layout.as_str() {
        "taxonomy" | "flat" => {}
        other => anyhow::bail!("Unknown corpus layout: '{}'. Must be taxonomy or flat.", other),
    }
    if config.corpus.include_globs.is_empty() {
        anyhow::bail!("corpus.include_globs must not be empty");
    }
    if config.corpus.reports_dir.is_empty() {
        anyhow::bail!("corpus.reports_dir must not be empty");
    }

    // Validate schema
    match config.schema.mode.as_str() {
        "inspection" | "sampled" => {}
        other => anyhow::bail!("Unknown schema mode: '{}'. Must be inspection or sampled.", other),
    }
    if config.schema.min_fields == 0 {
        anyhow::bail!("schema.min_fields must be >= 1");
    }
    if config.schema.min_fields > config.schema.max_fields {
        anyhow::bail!("schema.min_fields must be <= schema.max_fields");
    }

    // Validate extraction
    if config.extraction.excerpt_chars == 0 {
        anyhow::bail!("extraction.excerpt_chars must be > 0");
    }
    match config.extraction.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown extraction provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }
    if config.extraction.is_enabled() && config.extraction.model.is_empty() {
        anyhow::bail!(
            "extraction.model must be specified when provider is '{}'",
            config.extraction.provider
        );
    }

    Ok(config)
}
