//! Text-level scanning stages for model responses.
//!
//! Every function here is total: a missing delimiter yields `None`, never a
//! panic, so a malformed response can only fail the stage that looks for it.

/// Opening delimiter of the solution section in the thought/solution dialect.
pub const SOLUTION_START: &str = "<|begin_of_solution|>";
/// Closing delimiter of the solution section.
pub const SOLUTION_END: &str = "<|end_of_solution|>";

/// Body of the first fenced block opened by ```` ```{tag}\n ````, up to the
/// next ```` ``` ````. The body keeps its trailing newline.
pub fn fenced_block<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let opener = format!("```{tag}\n");
    let start = text.find(&opener)? + opener.len();
    let len = text[start..].find("```")?;
    Some(&text[start..start + len])
}

/// Text between the first `open` and the last `close` that follows it.
pub fn outermost_between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let len = text[start..].rfind(close)?;
    Some(&text[start..start + len])
}

/// Solution section of a thought/solution response, or the whole response
/// when the delimiters are missing.
pub fn strip_solution(full: &str) -> &str {
    match outermost_between(full, SOLUTION_START, SOLUTION_END) {
        Some(solution) => solution,
        None => {
            tracing::info!("solution delimiters not found, using the full response");
            full
        }
    }
}

/// Remove the smallest leading-space indent shared by all non-empty lines.
/// Relative indentation is kept and empty lines stay empty.
pub fn dedent(block: &str) -> String {
    let min_spaces = block
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    block
        .split('\n')
        .map(|line| line.get(min_spaces..).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}
