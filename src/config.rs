//! Engine configuration: a JSON config file plus `CLAIMSCOPE_*` environment
//! overrides, resolved once at startup into an immutable [`EngineConfig`]
//! that is passed explicitly to each component.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the persisted vector index inside the data directory.
pub const INDEX_FILE: &str = "vector.index";
/// File name of the persisted chunk store inside the data directory.
pub const CHUNKS_FILE: &str = "chunks.json";

/// Errors that can occur while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`EngineConfig`].
    #[error("failed to parse config: {source}")]
    Parse {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A setting failed validation.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    /// The API key is absent or still the placeholder value.
    #[error("API key is missing or not set")]
    MissingApiKey,
}

/// Immutable process configuration for the claim-analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bearer token for the embedding and generation services.
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model identifier sent on embedding requests.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Model identifier sent on stance and aggregation requests.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Window length, in characters, of each chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Character overlap between consecutive chunks of one document.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of nearest chunks retrieved per claim.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Directory holding the persisted index artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the source literature corpus.
    #[serde(default = "default_literature_dir")]
    pub literature_dir: PathBuf,
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    150
}

fn default_top_k() -> usize {
    15
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_literature_dir() -> PathBuf {
    PathBuf::from("literature")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            embedding_model: default_embedding_model(),
            generation_model: default_generation_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            data_dir: default_data_dir(),
            literature_dir: default_literature_dir(),
        }
    }
}

impl EngineConfig {
    /// Path of the vector index artifact.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Path of the chunk store artifact.
    pub fn chunks_path(&self) -> PathBuf {
        self.data_dir.join(CHUNKS_FILE)
    }

    /// Validates cross-field constraints.
    ///
    /// The chunking stride `chunk_size - chunk_overlap` must be positive,
    /// `top_k` must be non-zero, and an API key must be present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                message: "chunk_size must be greater than zero".to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid {
                message: format!(
                    "chunk_overlap ({}) must be smaller than chunk_size ({})",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid {
                message: "top_k must be greater than zero".to_string(),
            });
        }
        if self.api_key.trim().is_empty() || self.api_key == "YOUR_API_KEY" {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}

/// Builder resolving an [`EngineConfig`] from a file and the environment.
///
/// Sources are applied in order, later wins:
///
/// 1. compiled defaults
/// 2. JSON config file ([`with_file`](Self::with_file))
/// 3. `CLAIMSCOPE_*` environment variables ([`with_env`](Self::with_env))
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    base: EngineConfig,
    use_env: bool,
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: EngineConfig::default(),
            use_env: false,
        }
    }

    /// Loads settings from a JSON configuration file.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.base = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            source: Box::new(e),
        })?;
        Ok(self)
    }

    /// Enables `CLAIMSCOPE_*` environment variable overrides.
    ///
    /// Recognized: `CLAIMSCOPE_API_KEY`, `CLAIMSCOPE_API_BASE_URL`,
    /// `CLAIMSCOPE_EMBEDDING_MODEL`, `CLAIMSCOPE_GENERATION_MODEL`,
    /// `CLAIMSCOPE_CHUNK_SIZE`, `CLAIMSCOPE_CHUNK_OVERLAP`,
    /// `CLAIMSCOPE_TOP_K`, `CLAIMSCOPE_DATA_DIR`, `CLAIMSCOPE_LITERATURE_DIR`.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Resolves and validates the final configuration.
    pub fn build(mut self) -> Result<EngineConfig, ConfigError> {
        if self.use_env {
            dotenvy::dotenv().ok();
            self.apply_env()?;
        }
        self.base.validate()?;
        Ok(self.base)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(key) = std::env::var("CLAIMSCOPE_API_KEY") {
            self.base.api_key = key;
        }
        if let Ok(url) = std::env::var("CLAIMSCOPE_API_BASE_URL") {
            self.base.api_base_url = url;
        }
        if let Ok(model) = std::env::var("CLAIMSCOPE_EMBEDDING_MODEL") {
            self.base.embedding_model = model;
        }
        if let Ok(model) = std::env::var("CLAIMSCOPE_GENERATION_MODEL") {
            self.base.generation_model = model;
        }
        if let Ok(value) = std::env::var("CLAIMSCOPE_CHUNK_SIZE") {
            self.base.chunk_size = parse_env("CLAIMSCOPE_CHUNK_SIZE", &value)?;
        }
        if let Ok(value) = std::env::var("CLAIMSCOPE_CHUNK_OVERLAP") {
            self.base.chunk_overlap = parse_env("CLAIMSCOPE_CHUNK_OVERLAP", &value)?;
        }
        if let Ok(value) = std::env::var("CLAIMSCOPE_TOP_K") {
            self.base.top_k = parse_env("CLAIMSCOPE_TOP_K", &value)?;
        }
        if let Ok(dir) = std::env::var("CLAIMSCOPE_DATA_DIR") {
            self.base.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CLAIMSCOPE_LITERATURE_DIR") {
            self.base.literature_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

fn parse_env(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        message: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}
