//! Configuration for the outline indexer.
//!
//! Supports both environment variables and a YAML config file.
//! Environment variables take precedence over config file values, and
//! config file values take precedence over the defaults. The config file
//! only accepts recognized keys: an unknown key is a hard error.

use crate::error::{OutlineError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

/// Text-generation vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// ZhipuAI GLM models (OpenAI-compatible endpoint).
    Zhipu,
    /// Google Gemini REST `generateContent`.
    Gemini,
}

impl Provider {
    /// Base URL used when `api_base` is not configured.
    pub fn default_api_base(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1/models",
        }
    }

    /// Map a model name to the one this vendor serves.
    ///
    /// OpenAI model names (`gpt-*`) become the vendor's default model; any
    /// other name is passed through untouched.
    pub fn resolve_model(&self, model: &str) -> String {
        match self {
            Provider::OpenAi => model.to_string(),
            Provider::Zhipu if model.starts_with("gpt-") => "glm-4-flash".to_string(),
            Provider::Gemini if model.starts_with("gpt-") => "gemini-1.5-flash".to_string(),
            _ => model.to_string(),
        }
    }
}

impl FromStr for Provider {
    type Err = OutlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "zhipu" | "zhipuai" => Ok(Provider::Zhipu),
            "gemini" => Ok(Provider::Gemini),
            other => Err(OutlineError::Config(format!("Unknown provider '{}'", other))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::Zhipu => "zhipu",
            Provider::Gemini => "gemini",
        };
        f.write_str(name)
    }
}

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which vendor backend to talk to.
    #[serde(default)]
    pub provider: Provider,

    /// Base URL for the API. Empty means the provider default.
    #[serde(default)]
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-2024-11-20", "glm-4-flash")
    pub model: String,

    /// Maximum tokens for response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_model() -> String {
    "gpt-4o-2024-11-20".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_base: String::new(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// The configured base URL, or the provider's default.
    pub fn effective_api_base(&self) -> &str {
        if self.api_base.is_empty() {
            self.provider.default_api_base()
        } else {
            &self.api_base
        }
    }
}

/// Which optional enrichment steps the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub if_add_node_id: bool,
    pub if_add_node_summary: bool,
    pub if_add_doc_description: bool,
    pub if_add_node_text: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            if_add_node_id: true,
            if_add_node_summary: true,
            if_add_doc_description: false,
            if_add_node_text: false,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Pipeline switches
    pub pipeline: PipelineOptions,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    pipeline: Option<PipelineFileSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmFileSection {
    provider: Option<Provider>,
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineFileSection {
    if_add_node_id: Option<bool>,
    if_add_node_summary: Option<bool>,
    if_add_doc_description: Option<bool>,
    if_add_node_text: Option<bool>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_PROVIDER, LLM_API_BASE, LLM_API_KEY, LLM_MODEL, LLM_MAX_TOKENS)
    /// 2. Config file (~/.config/outline-indexer/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no environment overrides).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OutlineError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML config text and merge it over the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config = Config::default();

        if content.trim().is_empty() {
            return Ok(config);
        }

        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| OutlineError::Config(format!("Failed to parse config file: {}", e)))?;

        if let Some(llm) = file_config.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = provider;
            }
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
        }

        if let Some(pipeline) = file_config.pipeline {
            let opts = &mut config.pipeline;
            if let Some(v) = pipeline.if_add_node_id {
                opts.if_add_node_id = v;
            }
            if let Some(v) = pipeline.if_add_node_summary {
                opts.if_add_node_summary = v;
            }
            if let Some(v) = pipeline.if_add_doc_description {
                opts.if_add_doc_description = v;
            }
            if let Some(v) = pipeline.if_add_node_text {
                opts.if_add_node_text = v;
            }
        }

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(provider) = env::var("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }

        if let Ok(api_base) = env::var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = tokens;
            }
        }

        Ok(())
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "outline-indexer")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_empty() {
            return Err(OutlineError::Config(format!(
                "API key for provider '{}' is required. Set LLM_API_KEY environment variable or add to config file.",
                self.llm.provider
            )));
        }

        if self.llm.model.is_empty() {
            return Err(OutlineError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, Provider::OpenAi);
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-2024-11-20");
        assert_eq!(config.llm.max_tokens, 4096);
        assert!(config.pipeline.if_add_node_id);
        assert!(config.pipeline.if_add_node_summary);
        assert!(!config.pipeline.if_add_doc_description);
        assert!(!config.pipeline.if_add_node_text);
    }

    #[test]
    fn test_validate_fails_without_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, OutlineError::Config(_)));
    }

    #[test]
    fn test_validate_requires_model() {
        let mut config = Config::default();
        config.llm.provider = Provider::Gemini;
        config.llm.api_key = "test-key".to_string();
        config.llm.model = "gemini-1.5-pro".to_string();
        assert!(config.validate().is_ok());

        config.llm.model.clear();
        assert!(matches!(config.validate(), Err(OutlineError::Config(_))));
    }

    #[test]
    fn test_yaml_merges_over_defaults() {
        let yaml = r#"
llm:
  provider: zhipu
  api_key: abc
pipeline:
  if_add_node_text: true
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.llm.provider, Provider::Zhipu);
        assert_eq!(config.llm.api_key, "abc");
        assert_eq!(config.llm.model, "gpt-4o-2024-11-20");
        assert!(config.pipeline.if_add_node_text);
        assert!(config.pipeline.if_add_node_summary);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let yaml = "llm:\n  api_key: abc\n  temprature: 0.5\n";
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, OutlineError::Config(_)));

        let yaml = "toc_check_pages: 20\n";
        assert!(Config::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let config = Config::from_yaml_str("   \n").unwrap();
        assert_eq!(config.pipeline, PipelineOptions::default());
    }

    #[test]
    fn test_provider_defaults_and_aliases() {
        assert_eq!("ZhipuAI".parse::<Provider>().unwrap(), Provider::Zhipu);
        assert!("claude".parse::<Provider>().is_err());

        assert_eq!(Provider::Zhipu.resolve_model("gpt-4o"), "glm-4-flash");
        assert_eq!(Provider::Zhipu.resolve_model("glm-4-plus"), "glm-4-plus");
        assert_eq!(Provider::Gemini.resolve_model("gpt-4o-mini"), "gemini-1.5-flash");
        assert_eq!(Provider::OpenAi.resolve_model("gpt-4o"), "gpt-4o");

        let llm = LlmConfig {
            provider: Provider::Gemini,
            ..Default::default()
        };
        assert_eq!(
            llm.effective_api_base(),
            "https://generativelanguage.googleapis.com/v1/models"
        );
    }
}
