use serde::{Deserialize, Serialize};

use crate::parser::fence::{dedent, fenced_block};

/// Rendering of the parse-miss sentinel, kept for log compatibility.
pub const NOT_FOUND: &str = "Not found";

/// Terminal signal carried by a ```` ```decision ```` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalDecision {
    Done,
    Fail,
    Wait,
    CallUser,
    Reset,
}

impl TerminalDecision {
    /// Scan order: the first keyword present wins.
    pub const PRIORITY: [TerminalDecision; 5] = [
        TerminalDecision::Done,
        TerminalDecision::Fail,
        TerminalDecision::Wait,
        TerminalDecision::CallUser,
        TerminalDecision::Reset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TerminalDecision::Done => "DONE",
            TerminalDecision::Fail => "FAIL",
            TerminalDecision::Wait => "WAIT",
            TerminalDecision::CallUser => "CALL_USER",
            TerminalDecision::Reset => "RESET",
        }
    }

    /// DONE and FAIL finish the task. WAIT, CALL_USER and RESET are sent to the
    /// environment as actions and stepping continues.
    pub fn ends_episode(self) -> bool {
        matches!(self, TerminalDecision::Done | TerminalDecision::Fail)
    }

    /// First keyword (in priority order) contained anywhere in `text`.
    pub fn scan(text: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|d| text.contains(d.as_str()))
    }
}

/// What one planning turn asks the environment to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAction {
    /// De-indented code block, possibly with symbolic element references.
    Code(String),
    Terminal(TerminalDecision),
    /// No code block and no decision override.
    NotFound,
}

impl ParsedAction {
    pub fn as_str(&self) -> &str {
        match self {
            ParsedAction::Code(code) => code,
            ParsedAction::Terminal(d) => d.as_str(),
            ParsedAction::NotFound => NOT_FOUND,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub decision_text: String,
    pub action: ParsedAction,
}

/// Response dialects understood by [`ResponseParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDialect {
    /// Thought/solution responses; a missing decision block means FAIL.
    #[default]
    #[serde(alias = "qwen2vl")]
    Cot,
    /// Plain responses; a missing decision block keeps the code block.
    #[serde(alias = "gpt4o")]
    Plain,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    dialect: ResponseDialect,
}

impl ResponseParser {
    pub fn new(dialect: ResponseDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> ResponseDialect {
        self.dialect
    }

    /// Parse one (solution-stripped) completion. Never fails.
    pub fn parse(&self, plan_result: &str) -> ParsedResponse {
        let mut action = match fenced_block(plan_result, "python") {
            Some(code) => ParsedAction::Code(dedent(code)),
            None => ParsedAction::NotFound,
        };

        let decision_text = match fenced_block(plan_result, "decision") {
            Some(block) => {
                if let Some(decision) = TerminalDecision::scan(block) {
                    action = ParsedAction::Terminal(decision);
                }
                block.trim().to_string()
            }
            None => {
                if self.dialect == ResponseDialect::Cot {
                    action = ParsedAction::Terminal(TerminalDecision::Fail);
                }
                NOT_FOUND.to_string()
            }
        };

        tracing::debug!(
            dialect = ?self.dialect,
            decision = %decision_text,
            action = %action.as_str(),
            "response parsed"
        );
        ParsedResponse {
            decision_text,
            action,
        }
    }
}
