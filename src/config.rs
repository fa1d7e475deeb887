use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::action::reference::ReferenceDialect;
use crate::agent_engine::state::ObsView;
use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::strategy::GroundingStrategy;
use crate::parser::response::ResponseDialect;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub grounding: GroundingConfig,
    #[serde(default)]
    pub episode: EpisodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    /// Provider used for any role without its own [llm.roles.*] entry.
    #[serde(default)]
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default)]
    pub display_name: Option<String>,
    /// OpenAI-compatible base URL, e.g. `http://10.1.1.3:8000/v1`.
    pub api_base: String,
    /// Default model for this provider (used when a role does not name one).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key (falls back to env var ARENA_<ID>_API_KEY first).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Maps agent roles to specific provider+model combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Multimodal planner that produces thought/decision/code responses.
    pub planner: Option<RoleEntry>,
    /// Vision model that turns an element description into a point.
    pub grounding: Option<RoleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [llm.providers.*].
    pub provider: String,
    /// Model name sent to the API. Empty means the provider default.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    /// Overrides the provider-level temperature for this role.
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub frequency_penalty: Option<f64>,
}

fn default_temperature() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Number of previous (user, assistant) turns replayed to the planner.
    #[serde(default = "default_n_prev")]
    pub n_prev: usize,
    #[serde(default)]
    pub obs_view: ObsView,
    #[serde(default)]
    pub response_dialect: ResponseDialect,
    /// Replaces the built-in planner system prompt when set.
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
}

fn default_n_prev() -> usize {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            n_prev: default_n_prev(),
            obs_view: ObsView::default(),
            response_dialect: ResponseDialect::default(),
            system_prompt_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// When false no grounding backend is built; only embedded hints resolve.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub strategy: GroundingStrategy,
    #[serde(default)]
    pub input_dialect: ReferenceDialect,
    /// Re-resolve embedded hint coordinates through the backend.
    #[serde(default = "default_true")]
    pub reground_hints: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: GroundingStrategy::default(),
            input_dialect: ReferenceDialect::default(),
            reground_hints: true,
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Seconds the environment waits after executing each action.
    #[serde(default = "default_sleep_after_execution")]
    pub sleep_after_execution: f64,
    #[serde(default = "default_env_timeout_secs")]
    pub env_timeout_secs: u64,
    #[serde(default = "default_env_max_retries")]
    pub env_max_retries: u32,
    /// Optional wall-clock budget for the stepping loop.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    #[serde(default = "default_none_observation_wait_secs")]
    pub none_observation_wait_secs: u64,
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,
}

fn default_max_steps() -> u32 {
    15
}

fn default_sleep_after_execution() -> f64 {
    3.0
}

fn default_env_timeout_secs() -> u64 {
    200
}

fn default_env_max_retries() -> u32 {
    3
}

fn default_none_observation_wait_secs() -> u64 {
    5
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            sleep_after_execution: default_sleep_after_execution(),
            env_timeout_secs: default_env_timeout_secs(),
            env_max_retries: default_env_max_retries(),
            time_limit_secs: None,
            none_observation_wait_secs: default_none_observation_wait_secs(),
            result_dir: default_result_dir(),
        }
    }
}

impl AppConfig {
    /// Reject values that would make the agent loop meaningless.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.agent.n_prev == 0 {
            return Err(ArenaError::Config("agent.n_prev must be at least 1".into()));
        }
        if self.grounding.max_attempts == 0 {
            return Err(ArenaError::Config(
                "grounding.max_attempts must be at least 1".into(),
            ));
        }
        if self.episode.max_steps == 0 {
            return Err(ArenaError::Config("episode.max_steps must be at least 1".into()));
        }
        if self.episode.env_max_retries == 0 {
            return Err(ArenaError::Config(
                "episode.env_max_retries must be at least 1".into(),
            ));
        }
        if !self.llm.active_provider.is_empty()
            && !self.llm.providers.contains_key(&self.llm.active_provider)
        {
            return Err(ArenaError::Config(format!(
                "active_provider '{}' is not a configured provider",
                self.llm.active_provider
            )));
        }
        let roles = [
            ("planner", self.llm.roles.planner.as_ref()),
            ("grounding", self.llm.roles.grounding.as_ref()),
        ];
        for (role, entry) in roles {
            if let Some(entry) = entry {
                if !self.llm.providers.contains_key(&entry.provider) {
                    return Err(ArenaError::Config(format!(
                        "role '{role}' references unknown provider '{}'",
                        entry.provider
                    )));
                }
            }
        }
        Ok(())
    }

    /// Planner system prompt: the configured file, or the built-in one.
    pub fn system_prompt(&self) -> ArenaResult<String> {
        match &self.agent.system_prompt_file {
            Some(path) => {
                let prompt = std::fs::read_to_string(path)?;
                tracing::debug!(path = %path.display(), "system prompt loaded from file");
                Ok(prompt)
            }
            None => Ok(crate::agent_engine::session::DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

fn resolve_config_path() -> ArenaResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("arena-agent").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(ArenaError::Config(
        "config.toml not found next to executable, in working directory or user config dir"
            .into(),
    ))
}

pub fn load_config() -> ArenaResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> ArenaResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    tracing::info!(
        path = %path.display(),
        providers = config.llm.providers.len(),
        n_prev = config.agent.n_prev,
        "config loaded"
    );
    Ok(config)
}
