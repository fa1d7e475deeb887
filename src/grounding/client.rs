use std::time::Duration;

use crate::action::lexer::{spatial_calls, SpatialCall};
use crate::action::reference::{ElementReference, ReferenceDialect};
use crate::config::AppConfig;
use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::backend::GroundingBackend;
use crate::grounding::retry::RetryPolicy;
use crate::grounding::types::{GroundingResult, Point};
use crate::llm::registry::{ProviderRegistry, Role};

/// Result of grounding one action block. `error` is set when the pass was
/// abandoned and `text` is the unmodified input.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedAction {
    pub text: String,
    pub results: Vec<GroundingResult>,
    pub error: Option<String>,
}

impl GroundedAction {
    fn unchanged(text: &str, error: Option<String>) -> Self {
        Self {
            text: text.to_string(),
            results: Vec::new(),
            error,
        }
    }

    pub fn points(&self) -> Vec<Point> {
        self.results.iter().map(|r| r.point).collect()
    }
}

/// Rewrites symbolic move/drag calls into absolute-coordinate calls.
pub struct GroundingClient {
    backend: Option<GroundingBackend>,
    dialect: ReferenceDialect,
    reground_hints: bool,
}

impl GroundingClient {
    pub fn new(
        backend: Option<GroundingBackend>,
        dialect: ReferenceDialect,
        reground_hints: bool,
    ) -> Self {
        Self {
            backend,
            dialect,
            reground_hints,
        }
    }

    /// Without a usable grounding model the client still applies embedded hints.
    pub fn from_config(config: &AppConfig, registry: &ProviderRegistry) -> ArenaResult<Self> {
        let settings = &config.grounding;
        let backend = if !settings.enabled {
            tracing::info!("grounding disabled, embedded hints only");
            None
        } else {
            match registry.call_config_for_role(Role::Grounding) {
                Ok((provider, call)) => {
                    let retry = RetryPolicy::immediate(settings.max_attempts)
                        .with_base_delay(Duration::from_millis(settings.backoff_ms));
                    tracing::info!(
                        model = %call.model,
                        strategy = ?settings.strategy,
                        "grounding backend ready"
                    );
                    Some(GroundingBackend::new(provider, call, settings.strategy, retry)?)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "no grounding model available, embedded hints only");
                    None
                }
            }
        };
        Ok(Self::new(backend, settings.input_dialect, settings.reground_hints))
    }

    /// Ground every symbolic reference in `action`, strictly left to right.
    ///
    /// Never fails: any error abandons the whole pass and returns the input
    /// text with no points.
    pub async fn ground_action(&self, image_b64: &str, action: &str) -> GroundedAction {
        let calls = spatial_calls(action, self.dialect.uses_markers());
        if calls.is_empty() {
            return GroundedAction::unchanged(action, None);
        }

        match self.ground_calls(image_b64, action, &calls).await {
            Ok((text, results)) => GroundedAction {
                text,
                results,
                error: None,
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    action = %action,
                    "grounding failed, action left unchanged"
                );
                GroundedAction::unchanged(action, Some(e.to_string()))
            }
        }
    }

    async fn ground_calls(
        &self,
        image_b64: &str,
        action: &str,
        calls: &[SpatialCall<'_>],
    ) -> ArenaResult<(String, Vec<GroundingResult>)> {
        let mut out = String::with_capacity(action.len());
        let mut results = Vec::with_capacity(calls.len());
        let mut cursor = 0;

        for call in calls {
            let reference = ElementReference::extract(self.dialect, &call.argument);
            let point = self.resolve(image_b64, &reference).await?;

            out.push_str(&action[cursor..call.span.start]);
            out.push_str(&call.kind.grounded_call(point.x(), point.y()));
            cursor = call.span.end;

            results.push(GroundingResult {
                point,
                reference: reference.text,
            });
        }
        out.push_str(&action[cursor..]);
        Ok((out, results))
    }

    async fn resolve(&self, image_b64: &str, reference: &ElementReference) -> ArenaResult<Point> {
        match (&self.backend, reference.hint) {
            (Some(backend), _) if self.reground_hints || reference.hint.is_none() => {
                backend.ground_single_action(image_b64, &reference.text).await
            }
            (_, Some(hint)) => {
                tracing::debug!(reference = %reference.text, "using embedded hint");
                Ok(hint)
            }
            (_, None) => Err(ArenaError::Grounding(format!(
                "no grounding backend configured for \"{}\"",
                reference.text
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::grounding::retry::RetryPolicy;
    use crate::grounding::strategy::GroundingStrategy;
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::types::CallConfig;

    fn backend(provider: Arc<ScriptedProvider>) -> GroundingBackend {
        let call = CallConfig {
            model: "ui-tars".into(),
            stream: false,
            temperature: 0.1,
            max_tokens: None,
            frequency_penalty: None,
            extra_body: None,
        };
        GroundingBackend::new(provider, call, GroundingStrategy::UiTars, RetryPolicy::immediate(10))
            .unwrap()
    }

    fn plain_client(provider: Arc<ScriptedProvider>) -> GroundingClient {
        GroundingClient::new(Some(backend(provider)), ReferenceDialect::Plain, true)
    }

    #[tokio::test]
    async fn test_single_move_is_rewritten() {
        let provider = Arc::new(ScriptedProvider::new(vec!["(500,500)"]));
        let client = plain_client(provider.clone());
        let out = client
            .ground_action("QUJD", "computer.mouse.move(\"settings icon\")")
            .await;
        assert_eq!(out.text, "computer.mouse.move_abs(x=0.5, y=0.5)");
        assert_eq!(out.points(), vec![Point::from_permille(500, 500).unwrap()]);
        assert_eq!(out.results[0].reference, "settings icon");
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn test_non_spatial_action_is_untouched() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let client = plain_client(provider.clone());
        let action = "computer.mouse.single_click()\ncomputer.keyboard.hotkey(\"ctrl\", \"s\")\ncomputer.mouse.move_abs(x=0.1, y=0.9)\n";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(out.text, action);
        assert!(out.results.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_two_references_in_order() {
        let provider = Arc::new(ScriptedProvider::responder(|prompt| {
            if prompt.ends_with("file menu") {
                "(100,50)".to_string()
            } else {
                "(900,950)".to_string()
            }
        }));
        let client = plain_client(provider.clone());
        let action = "computer.mouse.move(\"file menu\")\ncomputer.mouse.single_click()\ncomputer.mouse.drag(\"trash bin\")\n";
        let out = client.ground_action("QUJD", action).await;

        assert_eq!(
            out.text,
            "computer.mouse.move_abs(x=0.1, y=0.05)\ncomputer.mouse.single_click()\ncomputer.mouse.drag(x=0.9, y=0.95)\n"
        );
        assert_eq!(
            out.points(),
            vec![
                Point::from_permille(100, 50).unwrap(),
                Point::from_permille(900, 950).unwrap()
            ]
        );
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].ends_with("file menu"));
        assert!(prompts[1].ends_with("trash bin"));
    }

    #[tokio::test]
    async fn test_repeated_reference_grounded_per_occurrence() {
        let provider = Arc::new(ScriptedProvider::new(vec!["(100,100)", "(200,200)"]));
        let client = plain_client(provider.clone());
        let action = "computer.mouse.move(\"row\")\ncomputer.mouse.move(\"row\")";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(
            out.text,
            "computer.mouse.move_abs(x=0.1, y=0.1)\ncomputer.mouse.move_abs(x=0.2, y=0.2)"
        );
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_backend_leaves_text_unchanged() {
        let provider = Arc::new(ScriptedProvider::responder(|_| "somewhere on the left".to_string()));
        let client = plain_client(provider.clone());
        let action = "computer.mouse.move(\"ok\")\ncomputer.mouse.single_click()";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(out.text, action);
        assert!(out.results.is_empty());
        assert!(out.error.unwrap().contains("after 10 attempts"));
        assert_eq!(provider.call_count(), 10);
    }

    #[tokio::test]
    async fn test_second_failure_discards_first_result() {
        let provider = Arc::new(ScriptedProvider::new(vec!["(1,2)", "ERR:connection reset"]));
        let client = plain_client(provider.clone());
        let action = "computer.mouse.move(\"a\")\ncomputer.mouse.move(\"b\")";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(out.text, action);
        assert!(out.results.is_empty());
    }

    #[tokio::test]
    async fn test_embedded_hint_is_regrounded_by_default() {
        let provider = Arc::new(ScriptedProvider::new(vec!["(700,300)"]));
        let client =
            GroundingClient::new(Some(backend(provider.clone())), ReferenceDialect::Embedded, true);
        let action = "computer.mouse.move(<|object_ref_start|>\"three dot settings menu\"<|object_ref_end|><|point_start|>(300,500)<|point_end|>)";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(out.text, "computer.mouse.move_abs(x=0.7, y=0.3)");
        assert!(provider.prompts()[0].ends_with("three dot settings menu"));
    }

    #[tokio::test]
    async fn test_embedded_hint_used_when_regrounding_disabled() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let grounder = Some(backend(provider.clone()));
        let client = GroundingClient::new(grounder, ReferenceDialect::Embedded, false);
        let action = "computer.mouse.drag(\"icon<|point_start|>(300,500)<|point_end|>\")";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(out.text, "computer.mouse.drag(x=0.3, y=0.5)");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_grounding_uses_hints_only() {
        let config: AppConfig = toml::from_str(
            r#"
[llm.providers.scripted]
api_base = "http://127.0.0.1:8001/v1"
model = "ui-tars"

[llm.roles.grounding]
provider = "scripted"

[grounding]
enabled = false
"#,
        )
        .unwrap();
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let mut registry = ProviderRegistry::new(config.llm.clone());
        registry.register(provider.clone());

        let client = GroundingClient::from_config(&config, &registry).unwrap();
        let out = client
            .ground_action("QUJD", "computer.mouse.move(<|point_start|>(100,200)<|point_end|>)")
            .await;
        assert_eq!(out.text, "computer.mouse.move_abs(x=0.1, y=0.2)");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_backend_without_hint_is_noop() {
        let client = GroundingClient::new(None, ReferenceDialect::Embedded, true);
        let action = "computer.mouse.move(\"ok\")";
        let out = client.ground_action("QUJD", action).await;
        assert_eq!(out.text, action);
        assert!(out.error.is_some());
    }
}
