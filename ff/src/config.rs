//! FeatureForge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main FeatureForge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); `--log-level` wins
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Directory searched for `<name>.pmt` prompt overrides
    #[serde(rename = "prompts-dir", skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Graph-wide limits and the initial transcript message
    pub graph: GraphConfig,

    /// Per-stage agent configuration
    pub agents: AgentsConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set and the step
    /// and tool-turn budgets are usable. Call this early in startup to fail fast.
    pub fn validate(&self) -> Result<()> {
        debug!(api_key_env = %self.llm.api_key_env, "Config::validate: called");
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }

        if self.graph.recursion_limit == 0 {
            return Err(eyre::eyre!("graph.recursion-limit must be greater than zero"));
        }

        if self.graph.max_tool_turns == 0 {
            return Err(eyre::eyre!("graph.max-tool-turns must be greater than zero"));
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// `--config` path → `./.featureforge.yml` →
    /// `<config_dir>/featureforge/featureforge.yml` → defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .featureforge.yml
        let local_config = PathBuf::from(".featureforge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/featureforge/featureforge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("featureforge").join("featureforge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The immutable slice of configuration the orchestrator runs with
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            graph: self.graph.clone(),
            agents: self.agents.clone(),
            max_tokens: self.llm.max_tokens,
            prompts_dir: self.prompts_dir.clone(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("anthropic" or "openai")
    pub provider: String,

    /// Default model identifier; stages may override it
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        debug!(api_key_env = %self.api_key_env, "LlmConfig::get_api_key: called");
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("API key environment variable {} is not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Graph-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// First human message placed in the transcript
    #[serde(rename = "initial-message")]
    pub initial_message: String,

    /// Global step budget: stage dispatches plus agent turns and tool calls
    #[serde(rename = "recursion-limit")]
    pub recursion_limit: u32,

    /// Consecutive re-entries allowed after a malformed capability output
    #[serde(rename = "max-decode-retries")]
    pub max_decode_retries: u32,

    /// Base delay before re-entering a stage after ERROR; doubles per failure
    #[serde(rename = "decode-retry-backoff-ms")]
    pub decode_retry_backoff_ms: u64,

    /// Upper bound on LLM turns inside one capability invocation
    #[serde(rename = "max-tool-turns")]
    pub max_tool_turns: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            initial_message: "Break the feature down into user stories, acceptance criteria and tasks.".to_string(),
            recursion_limit: 250,
            max_decode_retries: 3,
            decode_retry_backoff_ms: 500,
            max_tool_turns: 8,
        }
    }
}

/// Model selection for one stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name; the `llm.model` default is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Sampling temperature; provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Configuration for a generation stage (and the feature synthesis call)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: ModelConfig,

    /// Inline Handlebars template replacing the stage's system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Configuration for a verification stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// When false the verifier is never called and the artifact is accepted
    pub enabled: bool,

    /// REVIEW rounds allowed before the artifact is accepted as-is
    #[serde(rename = "max-verification-attempts")]
    pub max_verification_attempts: u32,

    pub model: ModelConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_verification_attempts: 2,
            model: ModelConfig::default(),
            prompt: None,
        }
    }
}

/// Per-stage agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    #[serde(rename = "user-story-creation")]
    pub user_story_creation: AgentConfig,

    #[serde(rename = "acceptance-criteria-creation")]
    pub acceptance_criteria_creation: AgentConfig,

    #[serde(rename = "tasks-creation")]
    pub tasks_creation: AgentConfig,

    #[serde(rename = "check-user-story-quality")]
    pub check_user_story_quality: CheckConfig,

    #[serde(rename = "check-acceptance-criteria-quality")]
    pub check_acceptance_criteria_quality: CheckConfig,

    #[serde(rename = "check-tasks-quality")]
    pub check_tasks_quality: CheckConfig,

    #[serde(rename = "feature-creation")]
    pub feature_creation: AgentConfig,
}

/// Immutable configuration handed to the orchestrator at build time
///
/// Each stage receives its own slice of this when the orchestrator is
/// constructed; nothing reads configuration after that.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub graph: GraphConfig,
    pub agents: AgentsConfig,
    /// Response token cap for every capability call
    pub max_tokens: u32,
    pub prompts_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.graph.max_decode_retries, 3);
        assert!(config.agents.check_tasks_quality.enabled);
        assert_eq!(config.agents.check_tasks_quality.max_verification_attempts, 2);
        assert!(config.agents.tasks_creation.prompt.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug
llm:
  provider: openai
  model: gpt-4o
  api-key-env: MY_API_KEY
  base-url: https://api.example.com
  max-tokens: 4096
  timeout-ms: 60000

graph:
  initial-message: "Plan the feature"
  recursion-limit: 80
  max-decode-retries: 5
  decode-retry-backoff-ms: 0

agents:
  user-story-creation:
    model:
      name: gpt-4o-mini
      temperature: 0.3
  check-tasks-quality:
    enabled: false
    max-verification-attempts: 1
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.graph.initial_message, "Plan the feature");
        assert_eq!(config.graph.recursion_limit, 80);
        assert_eq!(config.graph.max_decode_retries, 5);
        assert_eq!(config.graph.decode_retry_backoff_ms, 0);
        assert_eq!(config.graph.max_tool_turns, 8);
        assert_eq!(
            config.agents.user_story_creation.model.name.as_deref(),
            Some("gpt-4o-mini")
        );
        assert_eq!(config.agents.user_story_creation.model.temperature, Some(0.3));
        assert!(!config.agents.check_tasks_quality.enabled);
        assert_eq!(config.agents.check_tasks_quality.max_verification_attempts, 1);
        // untouched sections keep their defaults
        assert!(config.agents.check_user_story_quality.enabled);
    }

    #[test]
    fn test_pipeline_slice_carries_agents_and_graph() {
        let mut config = Config::default();
        config.agents.check_acceptance_criteria_quality.max_verification_attempts = 7;
        config.llm.max_tokens = 1234;

        let pipeline = config.pipeline();

        assert_eq!(pipeline.agents.check_acceptance_criteria_quality.max_verification_attempts, 7);
        assert_eq!(pipeline.max_tokens, 1234);
        assert_eq!(pipeline.graph.recursion_limit, config.graph.recursion_limit);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ff.yml");
        fs::write(&path, "graph:\n  recursion-limit: 42\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.graph.recursion_limit, 42);
    }

    #[test]
    fn test_load_explicit_path_missing_is_error() {
        let path = PathBuf::from("/nonexistent/featureforge.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_validate_missing_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "FF_NONEXISTENT_TEST_API_KEY".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("FF_NONEXISTENT_TEST_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_validate_rejects_zero_recursion_limit() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var("FF_VALIDATE_TEST_KEY", "test-key") };

        let mut config = Config::default();
        config.llm.api_key_env = "FF_VALIDATE_TEST_KEY".to_string();
        assert!(config.validate().is_ok());

        config.graph.recursion_limit = 0;
        assert!(config.validate().is_err());

        unsafe { std::env::remove_var("FF_VALIDATE_TEST_KEY") };
    }

    #[test]
    #[serial]
    fn test_validate_rejects_zero_tool_turns() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var("FF_VALIDATE_TEST_KEY", "test-key") };

        let mut config = Config::default();
        config.llm.api_key_env = "FF_VALIDATE_TEST_KEY".to_string();
        config.graph.max_tool_turns = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max-tool-turns"));

        unsafe { std::env::remove_var("FF_VALIDATE_TEST_KEY") };
    }
}
