use crate::errors::{ArenaError, ArenaResult};
use crate::llm::types::{StreamChunk, StreamChunkKind};

/// Parses a raw SSE line (OpenAI-compatible format) into a StreamChunk.
/// Returns None if the line is a keep-alive or non-data line.
pub fn parse_sse_line(line: &str) -> ArenaResult<Option<StreamChunk>> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let data = if let Some(d) = line.strip_prefix("data:") {
        d.trim()
    } else {
        return Ok(None);
    };

    if data == "[DONE]" {
        return Ok(Some(StreamChunk {
            kind: StreamChunkKind::Done,
            content: String::new(),
        }));
    }

    let json: serde_json::Value =
        serde_json::from_str(data).map_err(|e| ArenaError::SseParsing(e.to_string()))?;

    let Some(first) = json["choices"].as_array().and_then(|c| c.first()) else {
        return Ok(None);
    };
    let delta = &first["delta"];

    // Reasoning content (some servers expose it separately)
    if let Some(reasoning) = delta["reasoning_content"].as_str() {
        if !reasoning.is_empty() {
            return Ok(Some(StreamChunk {
                kind: StreamChunkKind::Reasoning,
                content: reasoning.to_string(),
            }));
        }
    }

    if let Some(content) = delta["content"].as_str() {
        if !content.is_empty() {
            return Ok(Some(StreamChunk {
                kind: StreamChunkKind::Content,
                content: content.to_string(),
            }));
        }
    }

    if first["finish_reason"].as_str().is_some() {
        return Ok(Some(StreamChunk {
            kind: StreamChunkKind::Done,
            content: String::new(),
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"```python"},"finish_reason":null}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.kind, StreamChunkKind::Content);
        assert_eq!(chunk.content, "```python");
    }

    #[test]
    fn test_done_marker_and_keepalive() {
        let done = parse_sse_line("data: [DONE]").unwrap().unwrap();
        assert_eq!(done.kind, StreamChunkKind::Done);
        assert!(parse_sse_line(": keep-alive").unwrap().is_none());
        assert!(parse_sse_line("event: ping").unwrap().is_none());
    }

    #[test]
    fn test_finish_reason_ends_stream() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.kind, StreamChunkKind::Done);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(ArenaError::SseParsing(_))
        ));
    }
}
