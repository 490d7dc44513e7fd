//! Recursive-descent parser from source text to an instruction tree.
//!
//! A single cursor walks the source left to right. Each `[` recurses into a
//! nested body that ends at the matching `]`, so the call stack doubles as
//! the bracket-matching stack. Characters outside `><+-.,[]` are comments.

use std::fmt;

use crate::ast::{Instruction, Program};
use crate::stack::ensure_sufficient_stack;

/// Errors raised while parsing source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// A `[` reached end of input without a matching `]`, or a `]` appeared
    /// with no enclosing loop. `position` is the char index of that bracket.
    #[error("unmatched {kind} at position {position}")]
    UnmatchedBracket {
        position: usize,
        kind: UnmatchedBracketKind,
    },
}

impl SyntaxError {
    /// Char index of the offending bracket in the source.
    pub fn position(&self) -> usize {
        match self {
            SyntaxError::UnmatchedBracket { position, .. } => *position,
        }
    }
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    Open,
    Close,
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::Open => write!(f, "opening bracket '['"),
            UnmatchedBracketKind::Close => write!(f, "closing bracket ']'"),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    /// Parse nodes until the `]` closing `open`, or until end of input at
    /// top level (`open == None`). The closing `]` is consumed.
    fn body(&mut self, open: Option<usize>) -> Result<Vec<Instruction>, SyntaxError> {
        ensure_sufficient_stack(|| -> Result<Vec<Instruction>, SyntaxError> {
            let mut nodes = Vec::new();

            while let Some(&ch) = self.chars.get(self.pos) {
                let at = self.pos;
                self.pos += 1;

                match ch {
                    '[' => {
                        let inner = self.body(Some(at))?;
                        nodes.push(Instruction::Loop(inner));
                    }
                    ']' => {
                        return match open {
                            Some(_) => Ok(nodes),
                            None => Err(SyntaxError::UnmatchedBracket {
                                position: at,
                                kind: UnmatchedBracketKind::Close,
                            }),
                        };
                    }
                    other => {
                        if let Some(node) = Instruction::from_leaf_symbol(other) {
                            nodes.push(node);
                        }
                    }
                }
            }

            match open {
                Some(position) => Err(SyntaxError::UnmatchedBracket {
                    position,
                    kind: UnmatchedBracketKind::Open,
                }),
                None => Ok(nodes),
            }
        })
    }
}

/// Parse `source` into a [`Program`].
///
/// Fails with [`SyntaxError`] when brackets are unbalanced; no partial
/// program is returned.
#[tracing::instrument(level = "debug", skip_all, fields(chars = source.chars().count()))]
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let mut parser = Parser::new(source);
    let program = Program::new(parser.body(None)?);
    tracing::debug!(
        top_level = program.len(),
        instructions = program.instruction_count(),
        "parsed program"
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use Instruction::*;

    #[test]
    fn leaves_are_emitted_in_source_order() {
        let program = parse("+++>++>+").unwrap();
        assert_eq!(
            program.instructions(),
            &[
                Increment, Increment, Increment, MoveRight, Increment, Increment, MoveRight,
                Increment,
            ]
        );
    }

    #[test]
    fn nested_loops_build_subtrees() {
        let program = parse("+[>[-]<-].").unwrap();
        assert_eq!(
            program.instructions(),
            &[
                Increment,
                Loop(vec![
                    MoveRight,
                    Loop(vec![Decrement]),
                    MoveLeft,
                    Decrement,
                ]),
                Output,
            ]
        );
    }

    #[test]
    fn unrecognized_characters_are_ignored() {
        let program = parse("add one: + then print it. done\n#!").unwrap();
        assert_eq!(program.instructions(), &[Increment, Output]);
    }

    #[test]
    fn empty_source_is_an_empty_program() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("no code here").unwrap().is_empty());
    }

    #[test]
    fn empty_loop_parses() {
        assert_eq!(parse("[]").unwrap().instructions(), &[Loop(Vec::new())]);
    }

    #[test]
    fn lone_closing_bracket_is_unmatched_close() {
        let err = parse("]").unwrap_err();
        assert_eq!(
            err,
            SyntaxError::UnmatchedBracket {
                position: 0,
                kind: UnmatchedBracketKind::Close
            }
        );
        assert!(err.to_string().contains("unmatched closing bracket"));
    }

    #[test]
    fn lone_opening_bracket_is_unmatched_open() {
        let err = parse("[").unwrap_err();
        assert_eq!(
            err,
            SyntaxError::UnmatchedBracket {
                position: 0,
                kind: UnmatchedBracketKind::Open
            }
        );
        assert!(err.to_string().contains("unmatched opening bracket"));
    }

    #[test]
    fn extra_closing_bracket_reports_its_position() {
        let err = parse("+[-]]").unwrap_err();
        assert_eq!(err.position(), 4);
    }

    #[test]
    fn innermost_open_bracket_is_reported() {
        let err = parse("[+[").unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::UnmatchedBracket { position: 2, kind: UnmatchedBracketKind::Open }
        ));
    }

    #[test]
    fn positions_count_chars_not_bytes() {
        let err = parse("é]").unwrap_err();
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn very_deep_nesting_parses() {
        let depth = 2_000;
        let source = format!("{}+{}", "[".repeat(depth), "]".repeat(depth));
        let program = parse(&source).unwrap();
        assert_eq!(program.instruction_count(), 1);
    }

    fn balanced_source() -> impl Strategy<Value = String> {
        let leaf = prop::sample::select(vec!["+", "-", ">", "<", ".", ",", " ", "x", "\n"])
            .prop_map(str::to_string);
        leaf.prop_recursive(6, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(|parts| parts.concat()),
                prop::collection::vec(inner, 0..8).prop_map(|parts| format!("[{}]", parts.concat())),
            ]
        })
    }

    fn count_leaf_symbols(source: &str) -> usize {
        source
            .chars()
            .filter(|c| matches!(c, '>' | '<' | '+' | '-' | '.' | ','))
            .count()
    }

    proptest! {
        #[test]
        fn balanced_sources_parse_with_matching_leaf_count(source in balanced_source()) {
            let program = parse(&source).unwrap();
            prop_assert_eq!(program.instruction_count(), count_leaf_symbols(&source));
        }

        #[test]
        fn trailing_open_bracket_always_fails(source in balanced_source()) {
            let err = parse(&format!("{source}[")).unwrap_err();
            prop_assert!(
                matches!(err, SyntaxError::UnmatchedBracket { kind: UnmatchedBracketKind::Open, .. }),
                "expected unmatched open bracket"
            );
        }

        #[test]
        fn trailing_close_bracket_always_fails(source in balanced_source()) {
            let err = parse(&format!("{source}]")).unwrap_err();
            prop_assert!(
                matches!(err, SyntaxError::UnmatchedBracket { kind: UnmatchedBracketKind::Close, .. }),
                "expected unmatched close bracket"
            );
        }

        #[test]
        fn display_reparses_to_the_same_tree(source in balanced_source()) {
            let program = parse(&source).unwrap();
            prop_assert_eq!(parse(&program.to_string()).unwrap(), program);
        }
    }
}
