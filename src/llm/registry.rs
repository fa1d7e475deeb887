use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, LlmConfig, RoleEntry};
use crate::errors::{ArenaError, ArenaResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// The two model roles the agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Planner,
    Grounding,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Planner => "planner",
            Role::Grounding => "grounding",
        }
    }
}

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn new(llm_config: LlmConfig) -> Self {
        Self {
            providers: HashMap::new(),
            llm_config,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    fn get(&self, name: &str) -> ArenaResult<Arc<dyn LlmProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ArenaError::Config(format!("Provider '{name}' not registered")))
    }

    fn role_entry(&self, role: Role) -> Option<&RoleEntry> {
        match role {
            Role::Planner => self.llm_config.roles.planner.as_ref(),
            Role::Grounding => self.llm_config.roles.grounding.as_ref(),
        }
    }

    /// Return the provider and call configuration for an agent role.
    ///
    /// Role resolution order:
    /// 1. `[llm.roles.<role>]` in config.toml
    /// 2. Fallback: `llm.active_provider` with its default model / temperature
    pub fn call_config_for_role(
        &self,
        role: Role,
    ) -> ArenaResult<(Arc<dyn LlmProvider>, CallConfig)> {
        if let Some(entry) = self.role_entry(role) {
            let provider = self.get(&entry.provider).map_err(|_| {
                ArenaError::Config(format!(
                    "Role '{}' references unknown provider '{}'",
                    role.as_str(),
                    entry.provider
                ))
            })?;
            let provider_entry = self.llm_config.providers.get(&entry.provider);
            let temperature = entry
                .temperature
                .or_else(|| provider_entry.map(|p| p.temperature))
                .unwrap_or(0.1);
            let model = if entry.model.is_empty() {
                provider_entry.map(|p| p.model.clone()).unwrap_or_default()
            } else {
                entry.model.clone()
            };
            tracing::debug!(
                role = role.as_str(),
                provider = %entry.provider,
                model = %model,
                stream = entry.stream,
                temperature = temperature,
                "resolved role config"
            );
            return Ok((
                provider,
                CallConfig {
                    model,
                    stream: entry.stream,
                    temperature,
                    max_tokens: entry.max_tokens,
                    frequency_penalty: entry.frequency_penalty,
                    extra_body: None,
                },
            ));
        }

        let active = &self.llm_config.active_provider;
        if active.is_empty() {
            return Err(ArenaError::Config(format!(
                "Role '{}' is not configured and no llm.active_provider is set",
                role.as_str()
            )));
        }
        let provider = self.get(active)?;
        let (model, temperature) = self
            .llm_config
            .providers
            .get(active)
            .map(|p| (p.model.clone(), p.temperature))
            .unwrap_or_else(|| (String::new(), 0.1));
        tracing::debug!(
            role = role.as_str(),
            provider = %active,
            model = %model,
            "role not configured, using active provider fallback"
        );
        Ok((
            provider,
            CallConfig {
                model,
                stream: false,
                temperature,
                max_tokens: None,
                frequency_penalty: None,
                extra_body: None,
            },
        ))
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `ARENA_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(config.llm.clone());
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(format!("ARENA_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            let provider =
                OpenAiCompatibleProvider::new(id.clone(), entry.api_base.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        tracing::info!(providers = registry.providers.len(), "provider registry built");
        registry
    }
}
