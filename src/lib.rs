//! A tree-walking Brainfuck interpreter.
//!
//! Source text is parsed once into a tree of [`Instruction`]s, where every
//! `[`...`]` pair becomes a [`Instruction::Loop`] owning its body. The
//! [`Evaluator`] then walks that tree against a [`State`].
//!
//! Features and behaviors:
//! - Memory tape of [`MAX_MEMORY`] cells initialized to 0; cells wrap mod 256.
//! - Strict pointer bounds: moving left from cell 0 or right past the last
//!   cell returns [`RuntimeError::PointerOutOfBounds`].
//! - Input `,` reads a single byte; on EOF the current cell is left unchanged.
//! - Output `.` writes the byte at the current cell (no newline).
//! - Unmatched brackets are reported by [`parse`] as a [`SyntaxError`].
//! - Any non-Brainfuck character is a comment and is ignored.
//!
//! Quick start:
//!
//! ```no_run
//! use bf_tree::{parse, run, State};
//!
//! // Classic "Hello World!" in Brainfuck
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let program = parse(code).expect("brackets are balanced");
//! let mut state = State::new();
//! run(&program, &mut state).expect("program should run");
//! assert_eq!(state.outputs(), b"Hello World!\n");
//! ```

pub mod ast;
pub mod cli_util;
pub mod commands;
pub mod config;
pub mod evaluator;
pub mod logging;
pub mod parser;
pub mod repl;
pub mod stack;
pub mod state;

pub use ast::{Instruction, Program};
pub use evaluator::{Evaluator, RuntimeError, run};
pub use parser::{SyntaxError, UnmatchedBracketKind, parse};
pub use state::State;

/// Number of cells on the tape.
pub const MAX_MEMORY: usize = 30_000;

/// Either failure of a parse-then-run pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Parse `source` and run it against `state` with `evaluator`.
///
/// On a runtime failure `state` keeps every mutation made before the error,
/// so callers can still inspect the tape.
pub fn interpret(source: &str, evaluator: &mut Evaluator<'_>, state: &mut State) -> Result<(), Error> {
    let program = parse(source)?;
    evaluator.run(&program, state)?;
    Ok(())
}
