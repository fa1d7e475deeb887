use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Parts(parts),
        }
    }

    /// Assistant turns are stored as a single text part so every history
    /// entry has the same array shape.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: MessageContent::Parts(vec![ContentPart::text(text)]),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// Insert a text part before all existing content.
    pub fn prepend_text(&mut self, text: impl Into<String>) {
        match &mut self.content {
            MessageContent::Parts(parts) => parts.insert(0, ContentPart::text(text)),
            MessageContent::Text(existing) => {
                let merged = vec![ContentPart::text(text), ContentPart::text(existing.clone())];
                self.content = MessageContent::Parts(merged);
            }
        }
    }

    /// Concatenated text parts, ignoring images.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// JPEG data URL part; `detail` is forwarded when the server supports it.
    pub fn jpeg_base64(base64: &str, detail: Option<&str>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:image/jpeg;base64,{base64}"),
                detail: detail.map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-call sampling configuration resolved from a role.
#[derive(Debug, Clone, PartialEq)]
pub struct CallConfig {
    pub model: String,
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub frequency_penalty: Option<f64>,
    /// Extra top-level request fields (e.g. `skip_special_tokens`).
    pub extra_body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub kind: StreamChunkKind,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamChunkKind {
    Reasoning,
    Content,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_part_serializes_as_openai_shape() {
        let part = ContentPart::jpeg_base64("QUJD", Some("auto"));
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["type"], "image_url");
        assert_eq!(v["image_url"]["url"], "data:image/jpeg;base64,QUJD");
        assert_eq!(v["image_url"]["detail"], "auto");
    }

    #[test]
    fn test_prepend_text_goes_first() {
        let mut msg = ChatMessage::user(vec![
            ContentPart::jpeg_base64("QUJD", None),
            ContentPart::text("Task: x"),
        ]);
        msg.prepend_text("system");
        match &msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], ContentPart::text("system"));
            }
            MessageContent::Text(_) => panic!("expected parts"),
        }
        assert_eq!(msg.text(), "system\nTask: x");
    }
}
