use async_trait::async_trait;
use futures_util::StreamExt;

use crate::errors::{ArenaError, ArenaResult};
use crate::llm::provider::LlmProvider;
use crate::llm::sse_parser;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunkKind};

pub struct OpenAiCompatibleProvider {
    id: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            endpoint: chat_completions_url(&api_base),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

/// `http://host:8000/v1` → `http://host:8000/v1/chat/completions`; full URLs are kept.
fn chat_completions_url(api_base: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

/// Build the request body for one call.
fn build_body(messages: &[ChatMessage], cfg: &CallConfig) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": cfg.model,
        "messages": messages,
        "stream": cfg.stream,
        "temperature": cfg.temperature,
    });
    if let Some(max_tokens) = cfg.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(penalty) = cfg.frequency_penalty {
        body["frequency_penalty"] = serde_json::json!(penalty);
    }
    if let Some(serde_json::Value::Object(extra)) = &cfg.extra_body {
        for (k, v) in extra {
            body[k.as_str()] = v.clone();
        }
    }
    body
}

/// Copy of the body with base64 image payloads replaced, for logging only.
fn sanitize_for_log(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(|t| t.as_str()) != Some("image_url") {
                    continue;
                }
                if let Some(url) = part.get_mut("image_url").and_then(|i| i.get_mut("url")) {
                    *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> ArenaResult<LlmResponse> {
        let body = build_body(&messages, cfg);

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            stream = cfg.stream,
            messages = messages.len(),
            "sending LLM request"
        );
        tracing::trace!(
            body = %sanitize_for_log(&body),
            "request body (sanitized, base64 omitted)"
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(ArenaError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        if cfg.stream {
            self.handle_stream(response).await
        } else {
            self.handle_json(response).await
        }
    }
}

impl OpenAiCompatibleProvider {
    /// Handle an SSE streaming response by accumulating every delta.
    async fn handle_stream(&self, response: reqwest::Response) -> ArenaResult<LlmResponse> {
        let mut byte_stream = response.bytes_stream();
        let mut line_buf = String::new();
        let mut resp = LlmResponse::default();

        'stream: while let Some(result) = byte_stream.next().await {
            let bytes = result?;
            let text = String::from_utf8_lossy(&bytes);

            for ch in text.chars() {
                if ch != '\n' {
                    line_buf.push(ch);
                    continue;
                }
                let line = line_buf.trim().to_string();
                line_buf.clear();
                if line.is_empty() {
                    continue;
                }

                match sse_parser::parse_sse_line(&line) {
                    Ok(Some(chunk)) => match chunk.kind {
                        StreamChunkKind::Reasoning => resp.reasoning.push_str(&chunk.content),
                        StreamChunkKind::Content => resp.content.push_str(&chunk.content),
                        StreamChunkKind::Done => break 'stream,
                    },
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!("SSE parse skipped: {e}");
                    }
                }
            }
        }

        tracing::info!(
            provider = %self.id,
            content_len = resp.content.len(),
            reasoning_len = resp.reasoning.len(),
            "LLM stream complete"
        );
        Ok(resp)
    }

    /// Handle a non-streaming JSON response.
    async fn handle_json(&self, response: reqwest::Response) -> ArenaResult<LlmResponse> {
        let json: serde_json::Value = response.json().await?;

        let message = &json["choices"][0]["message"];
        let Some(content) = message["content"].as_str() else {
            return Err(ArenaError::LlmProvider(format!(
                "response has no choices[0].message.content: {json}"
            )));
        };
        let reasoning = message["reasoning_content"].as_str().unwrap_or("").to_string();

        tracing::info!(
            provider = %self.id,
            content_len = content.len(),
            "LLM JSON response received"
        );

        Ok(LlmResponse {
            content: content.to_string(),
            reasoning,
        })
    }
}
