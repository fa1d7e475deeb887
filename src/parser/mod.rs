//! Model response parsing: fenced-block scanning and decision extraction.
pub mod fence;
pub mod response;

pub use fence::strip_solution;
pub use response::{ParsedAction, ParsedResponse, ResponseDialect, ResponseParser, TerminalDecision};
