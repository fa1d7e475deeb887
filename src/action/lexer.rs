//! Tokenizer for the spatial statements of the action language.
//!
//! Only `computer.mouse.move(...)` and `computer.mouse.drag(...)` with a
//! symbolic argument are recognized; everything else in the block is opaque
//! text that must survive rewriting byte-for-byte.
use std::ops::Range;

use serde::Serialize;

pub const CALL_PREFIX: &str = "computer.mouse.";
pub const OBJECT_REF_START: &str = "<|object_ref_start|>";
pub const OBJECT_REF_END: &str = "<|object_ref_end|>";
pub const POINT_START: &str = "<|point_start|>";
pub const POINT_END: &str = "<|point_end|>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialKind {
    Move,
    Drag,
}

impl SpatialKind {
    fn method(self) -> &'static str {
        match self {
            SpatialKind::Move => "move(",
            SpatialKind::Drag => "drag(",
        }
    }

    /// Absolute-coordinate statement for this kind.
    pub fn grounded_call(self, x: f64, y: f64) -> String {
        let (x, y) = (format_coord(x), format_coord(y));
        match self {
            SpatialKind::Move => format!("computer.mouse.move_abs(x={x}, y={y})"),
            SpatialKind::Drag => format!("computer.mouse.drag(x={x}, y={y})"),
        }
    }
}

/// Shortest round-trip float text with at least one decimal: `0.5`, `1.0`.
pub fn format_coord(v: f64) -> String {
    let s = v.to_string();
    if s.contains('.') || !v.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallArgument<'a> {
    /// Text between the quotes of `move("...")`.
    Quoted(&'a str),
    /// Unquoted marker argument, e.g. `<|object_ref_start|>"x"<|object_ref_end|><|point_start|>(1,2)<|point_end|>`.
    Marked(&'a str),
}

impl<'a> CallArgument<'a> {
    pub fn raw(&self) -> &'a str {
        match self {
            CallArgument::Quoted(s) | CallArgument::Marked(s) => s,
        }
    }
}

/// One symbolic spatial statement; `span` covers `computer.mouse.` through `)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialCall<'a> {
    pub kind: SpatialKind,
    pub span: Range<usize>,
    pub argument: CallArgument<'a>,
}

/// Left-to-right scan of `text` for symbolic move/drag calls. Malformed calls
/// are skipped and scanning resumes after their opening parenthesis.
pub fn spatial_calls(text: &str, accept_markers: bool) -> Vec<SpatialCall<'_>> {
    let mut calls = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(CALL_PREFIX) {
        let start = pos + found;
        let after_prefix = start + CALL_PREFIX.len();
        let rest = &text[after_prefix..];

        let Some(kind) = [SpatialKind::Move, SpatialKind::Drag]
            .into_iter()
            .find(|k| rest.starts_with(k.method()))
        else {
            pos = after_prefix;
            continue;
        };

        let arg_start = after_prefix + kind.method().len();
        let parsed = quoted_argument(text, arg_start).or_else(|| {
            accept_markers
                .then(|| marked_argument(text, arg_start))
                .flatten()
        });

        match parsed {
            Some((argument, end)) => {
                calls.push(SpatialCall {
                    kind,
                    span: start..end,
                    argument,
                });
                pos = end;
            }
            None => pos = arg_start,
        }
    }
    calls
}

/// `"ref")` starting at `at`: the argument ends at the first quote of either
/// kind that is directly followed by `)`. Arguments never span lines.
fn quoted_argument(text: &str, at: usize) -> Option<(CallArgument<'_>, usize)> {
    let rest = &text[at..];
    let open = rest.chars().next()?;
    if open != '"' && open != '\'' {
        return None;
    }
    let body = &rest[1..];
    let line = &body[..body.find('\n').unwrap_or(body.len())];
    let bytes = line.as_bytes();
    let close = (0..bytes.len()).find(|&i| {
        matches!(bytes[i], b'"' | b'\'') && bytes.get(i + 1) == Some(&b')')
    })?;
    let end = at + 1 + close + 2;
    Some((CallArgument::Quoted(&line[..close]), end))
}

/// Marker argument starting at `at`, closed by `<|point_end|>)` or, without a
/// point, by `<|object_ref_end|>)`.
fn marked_argument(text: &str, at: usize) -> Option<(CallArgument<'_>, usize)> {
    let rest = &text[at..];
    if !rest.starts_with(OBJECT_REF_START) && !rest.starts_with(POINT_START) {
        return None;
    }
    let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
    // A call ends at the first `)` after either closer.
    let arg_len = [POINT_END, OBJECT_REF_END]
        .into_iter()
        .filter_map(|closer| line.find(&format!("{closer})")).map(|idx| idx + closer.len()))
        .min()?;
    Some((CallArgument::Marked(&line[..arg_len]), at + arg_len + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_move_and_drag_in_order() {
        let text = "computer.mouse.move(\"a\")\ncomputer.mouse.single_click()\ncomputer.mouse.drag('b')";
        let calls = spatial_calls(text, false);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, SpatialKind::Move);
        assert_eq!(calls[0].argument, CallArgument::Quoted("a"));
        assert_eq!(&text[calls[0].span.clone()], "computer.mouse.move(\"a\")");
        assert_eq!(calls[1].kind, SpatialKind::Drag);
        assert_eq!(calls[1].argument, CallArgument::Quoted("b"));
        assert_eq!(&text[calls[1].span.clone()], "computer.mouse.drag('b')");
    }

    #[test]
    fn test_ignores_non_symbolic_calls() {
        let text = "computer.mouse.move_abs(x=0.1, y=0.2)\ncomputer.mouse.drag(x=0.5, y=0.5)\ncomputer.keyboard.write(\"move\")\ncomputer.mouse.scroll(dir=\"down\")";
        assert!(spatial_calls(text, true).is_empty());
    }

    #[test]
    fn test_inner_quotes_end_at_quote_paren() {
        let text = r#"computer.mouse.move("the 'Save' button")"#;
        let calls = spatial_calls(text, false);
        assert_eq!(calls[0].argument, CallArgument::Quoted("the 'Save' button"));
        assert_eq!(calls[0].span, 0..text.len());
    }

    #[test]
    fn test_unterminated_call_is_skipped() {
        let text = "computer.mouse.move(\"broken\ncomputer.mouse.move(\"ok\")";
        let calls = spatial_calls(text, false);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].argument, CallArgument::Quoted("ok"));
    }

    #[test]
    fn test_marker_argument_only_when_accepted() {
        let text = "computer.mouse.move(<|object_ref_start|>\"menu\"<|object_ref_end|><|point_start|>(300,500)<|point_end|>)";
        assert!(spatial_calls(text, false).is_empty());
        let calls = spatial_calls(text, true);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].span, 0..text.len());
        assert_eq!(
            calls[0].argument.raw(),
            "<|object_ref_start|>\"menu\"<|object_ref_end|><|point_start|>(300,500)<|point_end|>"
        );
    }

    #[test]
    fn test_marker_call_without_point_stops_at_its_own_paren() {
        let text = "computer.mouse.move(<|object_ref_start|>\"a\"<|object_ref_end|>); computer.mouse.drag(<|point_start|>(1,2)<|point_end|>)";
        let calls = spatial_calls(text, true);
        assert_eq!(calls.len(), 2);
        let first_end = text.find("); ").unwrap() + 1;
        assert_eq!(calls[0].span, 0..first_end);
        assert_eq!(calls[0].argument.raw(), "<|object_ref_start|>\"a\"<|object_ref_end|>");
        assert_eq!(calls[1].kind, SpatialKind::Drag);
        assert_eq!(calls[1].span, first_end + 2..text.len());
        assert_eq!(calls[1].argument.raw(), "<|point_start|>(1,2)<|point_end|>");
    }

    #[test]
    fn test_grounded_call_text() {
        assert_eq!(
            SpatialKind::Move.grounded_call(0.5, 0.5),
            "computer.mouse.move_abs(x=0.5, y=0.5)"
        );
        assert_eq!(
            SpatialKind::Drag.grounded_call(1.0, 0.0),
            "computer.mouse.drag(x=1.0, y=0.0)"
        );
        assert_eq!(format_coord(0.123), "0.123");
    }
}
