use std::sync::Arc;

use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::retry::{Attempt, RetryPolicy};
use crate::grounding::strategy::{CoordinateExtractor, GroundingStrategy, GROUNDING_MAX_TOKENS};
use crate::grounding::types::Point;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, ContentPart};

/// Vision model that turns one element description into a point.
pub struct GroundingBackend {
    provider: Arc<dyn LlmProvider>,
    call: CallConfig,
    strategy: GroundingStrategy,
    extractor: CoordinateExtractor,
    retry: RetryPolicy,
}

impl GroundingBackend {
    /// Role-level `max_tokens` / `frequency_penalty` win over the strategy defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        mut call: CallConfig,
        strategy: GroundingStrategy,
        retry: RetryPolicy,
    ) -> ArenaResult<Self> {
        call.stream = false;
        call.max_tokens.get_or_insert(GROUNDING_MAX_TOKENS);
        call.frequency_penalty.get_or_insert(strategy.frequency_penalty());
        Ok(Self {
            provider,
            call,
            strategy,
            extractor: strategy.extractor()?,
            retry,
        })
    }

    pub fn strategy(&self) -> GroundingStrategy {
        self.strategy
    }

    /// Resolve `reference` on the screenshot, re-asking the model until a reply
    /// carries a usable pair.
    pub async fn ground_single_action(
        &self,
        image_b64: &str,
        reference: &str,
    ) -> ArenaResult<Point> {
        let prompt = self.strategy.prompt(reference);
        let prompt = prompt.as_str();
        let point = self
            .retry
            .run("grounding", move |attempt| async move {
                self.query_once(image_b64, prompt, attempt).await
            })
            .await?;

        match point {
            Some(point) => {
                tracing::info!(
                    reference = %reference,
                    x = point.x(),
                    y = point.y(),
                    "element grounded"
                );
                Ok(point)
            }
            None => Err(ArenaError::GroundingExhausted {
                reference: reference.to_string(),
                attempts: self.retry.max_attempts,
            }),
        }
    }

    async fn query_once(
        &self,
        image_b64: &str,
        prompt: &str,
        attempt: u32,
    ) -> ArenaResult<Attempt<Point>> {
        let messages = vec![ChatMessage::user(vec![
            ContentPart::jpeg_base64(image_b64, None),
            ContentPart::text(prompt),
        ])];
        let reply = self.provider.chat(messages, &self.call).await?;
        tracing::debug!(attempt, reply = %reply.content, "grounder reply");

        Ok(match self.extractor.extract(&reply.content) {
            Some(point) => Attempt::Ready(point),
            None => Attempt::Retry(format!("no coordinate in reply: {}", reply.content)),
        })
    }
}
