use crate::grounding::client::{GroundedAction, GroundingClient};
use crate::grounding::types::GroundingResult;
use crate::parser::response::{ParsedAction, TerminalDecision};

/// A parsed action after element references have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAction {
    /// Passed through without grounding.
    Terminal(TerminalDecision),
    Grounded(GroundedAction),
    /// The response had nothing executable.
    NotFound,
}

impl ResolvedAction {
    /// Action strings for the environment, in execution order.
    pub fn actions(&self) -> Vec<String> {
        match self {
            ResolvedAction::Terminal(d) => vec![d.as_str().to_string()],
            ResolvedAction::Grounded(g) => vec![g.text.clone()],
            ResolvedAction::NotFound => Vec::new(),
        }
    }

    pub fn results(&self) -> &[GroundingResult] {
        match self {
            ResolvedAction::Grounded(g) => &g.results,
            _ => &[],
        }
    }

    pub fn grounding_error(&self) -> Option<&str> {
        match self {
            ResolvedAction::Grounded(g) => g.error.as_deref(),
            _ => None,
        }
    }
}

pub struct ActionResolver {
    grounding: GroundingClient,
}

impl ActionResolver {
    pub fn new(grounding: GroundingClient) -> Self {
        Self { grounding }
    }

    pub async fn resolve(&self, image_b64: &str, parsed: &ParsedAction) -> ResolvedAction {
        match parsed {
            ParsedAction::Terminal(decision) => {
                tracing::info!(
                    decision = decision.as_str(),
                    "terminal decision, grounding skipped"
                );
                ResolvedAction::Terminal(*decision)
            }
            ParsedAction::NotFound => {
                tracing::warn!("no action block in response");
                ResolvedAction::NotFound
            }
            ParsedAction::Code(code) => {
                ResolvedAction::Grounded(self.grounding.ground_action(image_b64, code).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::action::reference::ReferenceDialect;
    use crate::grounding::{GroundingBackend, GroundingStrategy, RetryPolicy};
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::types::CallConfig;

    fn resolver(provider: Arc<ScriptedProvider>) -> ActionResolver {
        let call = CallConfig {
            model: "ui-tars".into(),
            stream: false,
            temperature: 0.1,
            max_tokens: None,
            frequency_penalty: None,
            extra_body: None,
        };
        let retry = RetryPolicy::immediate(10);
        let backend =
            GroundingBackend::new(provider, call, GroundingStrategy::UiTars, retry).unwrap();
        ActionResolver::new(GroundingClient::new(Some(backend), ReferenceDialect::Plain, true))
    }

    #[tokio::test]
    async fn test_terminal_skips_grounding() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let r = resolver(provider.clone());
        let out = r
            .resolve("QUJD", &ParsedAction::Terminal(TerminalDecision::Wait))
            .await;
        assert_eq!(out.actions(), vec!["WAIT".to_string()]);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_not_found_emits_nothing() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let out = resolver(provider).resolve("QUJD", &ParsedAction::NotFound).await;
        assert!(out.actions().is_empty());
        assert!(out.results().is_empty());
    }

    #[tokio::test]
    async fn test_code_is_grounded() {
        let provider = Arc::new(ScriptedProvider::new(vec!["(0,1000)"]));
        let out = resolver(provider)
            .resolve(
                "QUJD",
                &ParsedAction::Code("computer.mouse.move(\"dock\")\ncomputer.mouse.single_click()\n".into()),
            )
            .await;
        assert_eq!(
            out.actions(),
            vec!["computer.mouse.move_abs(x=0.0, y=1.0)\ncomputer.mouse.single_click()\n".to_string()]
        );
        assert_eq!(out.results().len(), 1);
        assert!(out.grounding_error().is_none());
    }
}
