use std::fmt::Write as _;
use std::io::{self, Write};

use crate::{Error, State};

/// Render an interpreter error for the terminal.
///
/// Parse errors get a caret under the offending bracket. Runtime errors have
/// no source position (the tree carries none), so only the message is shown.
/// If `program` is `Some("bf")`, messages are prefixed with "bf: ...".
pub fn render_error(program: Option<&str>, code: &str, err: &Error) -> String {
    let msg = match program {
        Some(p) => format!("{p}: {err}"),
        None => err.to_string(),
    };

    match err {
        Error::Syntax(syntax) => render_with_context(&msg, code, syntax.position()),
        Error::Runtime(_) => format!("{msg}\n"),
    }
}

/// Print [`render_error`] output to stderr.
pub fn print_error(program: Option<&str>, code: &str, err: &Error) {
    eprint!("{}", render_error(program, code, err));
    let _ = io::stderr().flush();
}

/// A message followed by a short window of `code` around char index `pos`
/// with a caret under that position.
fn render_with_context(msg: &str, code: &str, pos: usize) -> String {
    const WINDOW_CHARS: usize = 32;

    let mut out = String::new();

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(code, start_char);
    let end_byte = char_to_byte_index(code, end_char);
    // Newlines inside the window would break the caret alignment.
    let slice: String = code[start_byte..end_byte]
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    let _ = writeln!(out, "{msg}");
    let _ = writeln!(out, "  {slice}");

    let caret_offset_chars = pos.saturating_sub(start_char);
    let _ = writeln!(out, "  {}^", " ".repeat(caret_offset_chars));
    out
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map_or(s.len(), |(byte_idx, _)| byte_idx)
}

/// The data pointer and the first `cells` tape cells, two lines:
/// `Memory cells: 3 2 1 0 0` and `Pointer: 2`.
pub fn render_memory_dump(state: &State, cells: usize) -> String {
    let shown = cells.min(state.memory().len());
    let values: Vec<String> = state.memory()[..shown]
        .iter()
        .map(|cell| cell.to_string())
        .collect();
    format!(
        "Memory cells: {}\nPointer: {}\n",
        values.join(" "),
        state.pointer()
    )
}
