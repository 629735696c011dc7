use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_qna_path")]
    pub qna_path: PathBuf,
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            qna_path: default_qna_path(),
            corpus_path: default_corpus_path(),
            log_path: default_log_path(),
        }
    }
}

fn default_qna_path() -> PathBuf {
    PathBuf::from("data/qna.json")
}
fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/corpus.json")
}
fn default_log_path() -> PathBuf {
    PathBuf::from("data/log.json")
}

/// Retention for the exchange log. `None` keeps every entry.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub max_entries: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    if cfg!(feature = "local-embeddings") {
        "local".to_string()
    } else {
        "disabled".to_string()
    }
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(from = "ProvidersFile")]
pub struct ProvidersConfig {
    pub primary: ProviderConfig,
    pub secondary: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
        }
    }
}

/// Connection settings for one hosted chat-completion provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Request timeout. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
}

/// `[providers]` as written in the file. Each key falls back to the
/// provider's own default, so a section may override a single field.
#[derive(Deserialize, Default)]
struct ProvidersFile {
    #[serde(default)]
    primary: ProviderOverrides,
    #[serde(default)]
    secondary: ProviderOverrides,
}

#[derive(Deserialize, Default)]
struct ProviderOverrides {
    base_url: Option<String>,
    model: Option<String>,
    /// `0` disables the timeout.
    timeout_secs: Option<u64>,
    api_key_env: Option<String>,
}

impl ProviderOverrides {
    fn apply(self, defaults: ProviderConfig) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            model: self.model.unwrap_or(defaults.model),
            timeout_secs: match self.timeout_secs {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => defaults.timeout_secs,
            },
            api_key_env: self.api_key_env.unwrap_or(defaults.api_key_env),
        }
    }
}

impl From<ProvidersFile> for ProvidersConfig {
    fn from(file: ProvidersFile) -> Self {
        Self {
            primary: file.primary.apply(default_primary()),
            secondary: file.secondary.apply(default_secondary()),
        }
    }
}

impl ProviderConfig {
    /// Reads the credential from the environment. Unset, empty and
    /// whitespace-only values all count as "not configured".
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

fn default_primary() -> ProviderConfig {
    ProviderConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
        timeout_secs: None,
        api_key_env: "OPENAI_API_KEY".to_string(),
    }
}

fn default_secondary() -> ProviderConfig {
    ProviderConfig {
        base_url: "https://api.groq.com/openai/v1".to_string(),
        model: "llama-3.1-8b-instant".to_string(),
        timeout_secs: Some(20),
        api_key_env: "GROQ_API_KEY".to_string(),
    }
}

/// Fixed texts used by the resolution pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    #[serde(default = "default_empty_reply")]
    pub empty_reply: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            fallback_reply: default_fallback_reply(),
            empty_reply: default_empty_reply(),
        }
    }
}

fn default_system_prompt() -> String {
    "Jawab hanya berdasarkan konteks database.".to_string()
}
fn default_fallback_reply() -> String {
    "Maaf, belum ada jawaban untuk pertanyaan itu.".to_string()
}
fn default_empty_reply() -> String {
    "Pesan kosong.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: PathBuf,
    #[serde(default = "default_backend_dir")]
    pub backend_dir: PathBuf,
    /// Document served at `GET /`, relative to `frontend_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// Live chat sessions kept in memory; the least recently used is
    /// evicted beyond this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            frontend_dir: default_frontend_dir(),
            backend_dir: default_backend_dir(),
            index_file: default_index_file(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_frontend_dir() -> PathBuf {
    PathBuf::from("../frontend")
}
fn default_backend_dir() -> PathBuf {
    PathBuf::from("../backend")
}
fn default_index_file() -> String {
    "data.html".to_string()
}
fn default_max_sessions() -> usize {
    crate::session::DEFAULT_MAX_SESSIONS
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Config {
    /// All defaults; used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise starts from [`Config::minimal`].
/// The environment overlay and validation apply either way.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }
    tracing::info!(path = %path.display(), "config file not found, using defaults");
    let mut config = Config::minimal();
    apply_env(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env(config: &mut Config) -> Result<()> {
    if let Ok(port) = std::env::var("PORT") {
        let port = port.trim();
        if !port.is_empty() {
            config.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
        }
    }
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if !(-1.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        anyhow::bail!("retrieval.similarity_threshold must be in [-1.0, 1.0]");
    }

    if config.server.max_sessions == 0 {
        anyhow::bail!("server.max_sessions must be > 0");
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    if matches!(config.embedding.provider.as_str(), "openai" | "ollama")
        && config.embedding.model.is_none()
    {
        anyhow::bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    Ok(())
}
