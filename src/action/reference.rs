use serde::{Deserialize, Serialize};

use crate::action::lexer::{CallArgument, OBJECT_REF_END, OBJECT_REF_START, POINT_END, POINT_START};
use crate::grounding::types::{parse_pair, Point};

/// How the planner writes element references inside move/drag calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceDialect {
    /// `move("three dot settings menu")`
    #[serde(alias = "gpt4o")]
    Plain,
    /// `move("<|object_ref_start|>menu<|object_ref_end|><|point_start|>(300,500)<|point_end|>")`
    #[default]
    #[serde(alias = "qwen2vl")]
    Embedded,
}

impl ReferenceDialect {
    pub fn uses_markers(self) -> bool {
        self == ReferenceDialect::Embedded
    }
}

/// A described UI target, with the planner's own coordinate guess if it gave one.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementReference {
    pub text: String,
    pub hint: Option<Point>,
}

impl ElementReference {
    pub fn extract(dialect: ReferenceDialect, argument: &CallArgument<'_>) -> Self {
        let raw = argument.raw();
        match dialect {
            ReferenceDialect::Plain => Self {
                text: raw.to_string(),
                hint: None,
            },
            ReferenceDialect::Embedded => Self {
                text: embedded_text(raw),
                hint: embedded_hint(raw),
            },
        }
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let len = text[start..].find(close)?;
    Some(&text[start..start + len])
}

fn embedded_text(raw: &str) -> String {
    let text = if let Some(inner) = between(raw, OBJECT_REF_START, OBJECT_REF_END) {
        inner
    } else if let Some(idx) = raw.find(POINT_START) {
        &raw[..idx]
    } else {
        raw
    };
    text.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn embedded_hint(raw: &str) -> Option<Point> {
    let (x, y) = parse_pair(between(raw, POINT_START, POINT_END)?)?;
    let hint = Point::from_permille(x, y);
    if hint.is_none() {
        tracing::warn!(x, y, "embedded hint outside the 0-1000 grid, ignored");
    }
    hint
}
