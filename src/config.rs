use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::EngineError;

/// Engine configuration snapshot
///
/// Values are read once per pipeline construction; updates take effect on
/// the next `execute`/prefetch cycle, never retroactively. Invalid values
/// are rejected by [`EngineConfig::validate`] rather than clamped, so a
/// misconfigured engine refuses to run instead of silently degrading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub rerank: RerankSettings,
    #[serde(default)]
    pub predictive: PredictiveConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Recall stage tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Candidates requested from the lexical index
    pub keyword_top_k: usize,
    /// Candidates requested from each vector backend
    pub semantic_top_k: usize,
    /// Maximum keywords extracted per query
    pub max_keywords: usize,
    /// Minimum keyword length in characters
    pub min_keyword_length: usize,
    /// Timeout for each recall source call, in milliseconds
    pub source_timeout_ms: u64,
}

/// Rerank stage tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankSettings {
    /// Enable the external rerank pass
    pub enabled: bool,
    /// Model name sent in the rerank request body
    pub model: String,
    /// Base URL of the rerank endpoint
    pub api_url: String,
    /// Bearer token for the rerank endpoint
    pub api_key: String,
    /// URL suffixes tried in order until one returns a usable response
    pub path_variants: Vec<String>,
    /// Skip reranking below this candidate count (0 disables the check)
    pub threshold: usize,
    /// Size of the final ranked list
    pub final_top_k: usize,
    /// Timeout for each rerank HTTP call, in milliseconds
    pub request_timeout_ms: u64,
}

/// Predictive prefetch tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictiveConfig {
    /// Enable the predictive prefetcher
    pub enabled: bool,
    /// Debounce window after the last input event, in milliseconds
    pub delay_ms: u64,
    /// Minimum in-progress input length (characters) to trigger a prediction
    pub min_input_length: usize,
    /// Number of recent chat messages combined with the in-progress input
    pub context_window_size: usize,
}

/// TTLs for the two single-slot caches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of the last real query's result, in milliseconds
    pub last_result_ttl_ms: u64,
    /// Lifetime of a prefetched result, in milliseconds
    pub prefetch_ttl_ms: u64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            keyword_top_k: 10,
            semantic_top_k: 10,
            max_keywords: 5,
            min_keyword_length: 2,
            source_timeout_ms: 5_000,
        }
    }
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model: String::new(),
            api_url: String::new(),
            api_key: String::new(),
            path_variants: vec![
                String::new(),
                "/v1/rerank".to_string(),
                "/rerank".to_string(),
            ],
            threshold: 0,
            final_top_k: 10,
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for PredictiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 800,
            min_input_length: 4,
            context_window_size: 4,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            last_result_ttl_ms: 5_000,
            prefetch_ttl_ms: 30_000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recall: RecallConfig::default(),
            rerank: RerankSettings::default(),
            predictive: PredictiveConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = EngineConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: EngineConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".chatrecall").join("config.toml"))
    }

    /// Reject invalid configuration instead of clamping it
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.rerank.final_top_k == 0 {
            return Err(EngineError::Config(
                "rerank.final_top_k must be at least 1".to_string(),
            ));
        }
        if self.recall.max_keywords == 0 {
            return Err(EngineError::Config(
                "recall.max_keywords must be at least 1".to_string(),
            ));
        }
        if self.recall.min_keyword_length == 0 {
            return Err(EngineError::Config(
                "recall.min_keyword_length must be at least 1".to_string(),
            ));
        }
        if self.recall.source_timeout_ms == 0 {
            return Err(EngineError::Config(
                "recall.source_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.rerank.request_timeout_ms == 0 {
            return Err(EngineError::Config(
                "rerank.request_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.rerank.enabled {
            if self.rerank.api_url.trim().is_empty() {
                return Err(EngineError::Config(
                    "rerank.api_url is required when reranking is enabled".to_string(),
                ));
            }
            if self.rerank.model.trim().is_empty() {
                return Err(EngineError::Config(
                    "rerank.model is required when reranking is enabled".to_string(),
                ));
            }
            if self.rerank.path_variants.is_empty() {
                return Err(EngineError::Config(
                    "rerank.path_variants must list at least one variant".to_string(),
                ));
            }
        }
        if self.predictive.enabled {
            if self.predictive.delay_ms == 0 {
                return Err(EngineError::Config(
                    "predictive.delay_ms must be at least 1".to_string(),
                ));
            }
            if self.predictive.context_window_size == 0 {
                return Err(EngineError::Config(
                    "predictive.context_window_size must be at least 1".to_string(),
                ));
            }
        }
        if self.cache.last_result_ttl_ms == 0 || self.cache.prefetch_ttl_ms == 0 {
            return Err(EngineError::Config(
                "cache TTLs must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }
}
