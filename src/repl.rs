use std::env;
use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Style;
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Signal, StyledText};

use crate::config::{self, HighlightColors};
use crate::{Evaluator, State, cli_util, interpret};

pub fn repl_loop() -> io::Result<()> {
    let mut editor = init_line_editor()?;

    loop {
        let Some(submission) = read_submission_interactive(&mut editor)? else {
            // EOF or editor closed; end the session instead of spinning on a closed stdin
            println!();
            io::stdout().flush()?;
            return Ok(());
        };

        if submission.trim().is_empty() {
            continue;
        }

        execute_submission(&submission);

        // Test hook: if BF_REPL_ONCE=1, exit after one execution
        if env::var("BF_REPL_ONCE").ok().as_deref() == Some("1") {
            return Ok(());
        }
    }
}

fn init_line_editor() -> io::Result<reedline::Reedline> {
    use reedline::{
        EditCommand, Emacs, KeyCode, KeyModifiers, Reedline, ReedlineEvent,
        default_emacs_keybindings,
    };

    // Enter inserts a newline; Ctrl+D (Ctrl+Z on Windows) submits the buffer.
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('z'), ReedlineEvent::Submit);

    // Up/Down move inside the buffer; Alt or Ctrl with Up/Down browse history.
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = reedline::FileBackedHistory::new(1_000)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(SourceHighlighter::new(config::colors())))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

/// Collect all lines from `stdin` until EOF. `None` when nothing was read.
pub fn read_submission<R: io::BufRead>(stdin: &mut R) -> Option<String> {
    let mut buffer = String::new();

    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => buffer.push_str(&line),
            Err(_) => return None,
        }
    }

    if buffer.is_empty() { None } else { Some(buffer) }
}

fn read_submission_interactive(editor: &mut reedline::Reedline) -> io::Result<Option<String>> {
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("bf".to_string()),
        DefaultPromptSegment::Empty,
    );

    match editor.read_line(&prompt) {
        Ok(Signal::Success(buffer)) => {
            // One history item per submitted program
            if !buffer.trim().is_empty() {
                let _ = editor
                    .history_mut()
                    .save(HistoryItem::from_command_line(buffer.clone()));
            }
            Ok(Some(buffer))
        }
        Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => Ok(None),
        Err(e) => {
            eprintln!("repl: editor error: {e}");
            let _ = io::stderr().flush();
            Ok(None)
        }
    }
}

/// Parse and run one submission on a fresh tape.
/// - Program output goes to stdout.
/// - Errors are printed concisely to stderr.
/// - A newline is always written to stdout afterwards so the next prompt
///   starts at column 0.
fn execute_submission(source: &str) {
    let mut state = State::new();
    if let Err(err) = interpret(source, &mut Evaluator::stdio(), &mut state) {
        cli_util::print_error(None, source, &err);
    }
    println!();
    let _ = io::stdout().flush();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

/// Pick the REPL mode: flags, then `BF_REPL_MODE`, then auto-detect
/// (editor when stdin is a TTY, bare otherwise).
pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    let env_mode = env::var("BF_REPL_MODE").ok();
    resolve_mode(flag, env_mode.as_deref(), io::stdin().is_terminal())
}

fn resolve_mode(
    flag: ModeFlagOverride,
    env_mode: Option<&str>,
    stdin_is_tty: bool,
) -> Result<ReplMode, String> {
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor => {
            if !stdin_is_tty {
                return Err(
                    "cannot start editor: stdin is not a TTY (use --bare or BF_REPL_MODE=bare)"
                        .to_string(),
                );
            }
            return Ok(ReplMode::Editor);
        }
        ModeFlagOverride::None => {}
    }

    if let Some(val) = env_mode {
        return match val.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" if stdin_is_tty => Ok(ReplMode::Editor),
            "editor" => Err(
                "cannot start editor: stdin is not a TTY (use BF_REPL_MODE=bare)".to_string(),
            ),
            _ => Err(format!(
                "invalid BF_REPL_MODE value: {val}, must be 'bare' or 'editor'"
            )),
        };
    }

    if stdin_is_tty {
        Ok(ReplMode::Editor)
    } else {
        Ok(ReplMode::Bare)
    }
}

/// Bare mode: read all of stdin as one program, run it once.
///
/// Stdin is consumed as program text, so `,` inside it sees end of input.
pub fn execute_bare_once() -> io::Result<()> {
    let mut locked = io::BufReader::new(io::stdin().lock());
    if let Some(source) = read_submission(&mut locked) {
        if !source.trim().is_empty() {
            execute_submission(&source);
        }
    }
    Ok(())
}

/// Per-character styling of instruction symbols; everything else is a comment.
struct SourceHighlighter {
    move_right: Style,
    move_left: Style,
    increment: Style,
    decrement: Style,
    output: Style,
    input: Style,
    bracket: Style,
    comment: Style,
}

impl SourceHighlighter {
    fn new(colors: &HighlightColors) -> Self {
        Self {
            move_right: Style::new().fg(colors.move_right).bold(),
            move_left: Style::new().fg(colors.move_left).bold(),
            increment: Style::new().fg(colors.increment).bold(),
            decrement: Style::new().fg(colors.decrement).bold(),
            output: Style::new().fg(colors.output).bold(),
            input: Style::new().fg(colors.input).bold(),
            bracket: Style::new().fg(colors.bracket).bold(),
            comment: Style::new().fg(colors.comment),
        }
    }

    #[inline]
    fn style_for(&self, ch: char) -> Style {
        match ch {
            '>' => self.move_right,
            '<' => self.move_left,
            '+' => self.increment,
            '-' => self.decrement,
            '.' => self.output,
            ',' => self.input,
            '[' | ']' => self.bracket,
            _ => self.comment,
        }
    }

    /// Group consecutive characters sharing a style into runs.
    fn runs(&self, line: &str) -> Vec<(Style, String)> {
        let mut out: Vec<(Style, String)> = Vec::new();
        for ch in line.chars() {
            let style = self.style_for(ch);
            if let Some((current, text)) = out.last_mut() {
                if *current == style {
                    text.push(ch);
                    continue;
                }
            }
            out.push((style, ch.to_string()));
        }
        out
    }
}

impl Highlighter for SourceHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();
        for run in self.runs(line) {
            styled.push(run);
        }
        styled
    }
}
