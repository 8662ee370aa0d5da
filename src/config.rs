//! Configuration management for kgmemory
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.kgmemory/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{MemoryError, Result};

/// Graph backends with a store adapter
pub const GRAPH_PROVIDERS: &[&str] = &["neo4j", "falkordb", "memory"];

/// LLM providers with a chat client
pub const LLM_PROVIDERS: &[&str] = &["ollama", "openai", "openai_structured"];

/// LLM providers that receive strict tool schemas
pub const STRUCTURED_LLM_PROVIDERS: &[&str] = &["openai_structured"];

/// Embedding providers
pub const EMBEDDER_PROVIDERS: &[&str] = &["ollama", "openai", "hash"];

/// Complete configuration for the memory layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph_store: GraphStoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
}

/// Graph database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStoreConfig {
    pub provider: String,
    /// Neo4j HTTP endpoint or FalkorDB redis:// URL
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    /// Extra rule appended to the relation extraction prompt
    pub custom_prompt: Option<String>,
    /// Overrides the LLM provider name used by the graph layer
    pub llm: Option<LlmOverride>,
}

/// Provider override for the graph layer's LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmOverride {
    pub provider: String,
}

/// LLM connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Provider default when unset
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub provider: String,
    pub model: String,
    /// Provider default when unset
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Vector size for the hash embedder
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            provider: "neo4j".to_string(),
            url: "http://localhost:7474".to_string(),
            username: Some("neo4j".to_string()),
            password: None,
            database: "neo4j".to_string(),
            custom_prompt: None,
            llm: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: crate::llm::ollama::DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            base_url: None,
            api_key: None,
            dimensions: 768,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Configured key, else `OPENAI_API_KEY`
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

impl EmbedderConfig {
    /// Configured key, else `OPENAI_API_KEY`
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// `~/.kgmemory/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".kgmemory").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        check_provider("graph", &self.graph_store.provider, GRAPH_PROVIDERS)?;
        check_provider("llm", &self.llm.provider, LLM_PROVIDERS)?;
        check_provider("embedder", &self.embedder.provider, EMBEDDER_PROVIDERS)?;

        if let Some(over) = &self.graph_store.llm {
            check_provider("llm", &over.provider, LLM_PROVIDERS)?;
        }

        if self.graph_store.provider != "memory" && self.graph_store.url.trim().is_empty() {
            return Err(MemoryError::ConfigError(
                "graph_store.url must not be empty".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(MemoryError::ConfigError(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.embedder.provider != "hash" && self.embedder.model.trim().is_empty() {
            return Err(MemoryError::ConfigError(
                "embedder.model must not be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(MemoryError::ConfigError(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.embedder.timeout_secs == 0 {
            return Err(MemoryError::ConfigError(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.embedder.provider == "hash" && self.embedder.dimensions == 0 {
            return Err(MemoryError::ConfigError(
                "embedder.dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Provider name used for every LLM call of the graph layer
    pub fn effective_llm_provider(&self) -> &str {
        self.graph_store
            .llm
            .as_ref()
            .map(|o| o.provider.as_str())
            .unwrap_or(self.llm.provider.as_str())
    }

    /// Whether tool schemas are sent in strict form
    pub fn uses_structured_tools(&self) -> bool {
        STRUCTURED_LLM_PROVIDERS.contains(&self.effective_llm_provider())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to serialize config: {}", e)))
    }
}

fn check_provider(kind: &'static str, name: &str, supported: &[&str]) -> Result<()> {
    if supported.contains(&name) {
        Ok(())
    } else {
        Err(MemoryError::UnsupportedProvider {
            kind,
            name: name.to_string(),
        })
    }
}
