//! Instruction tree produced by the parser.

use std::{fmt, mem};

use crate::stack::ensure_sufficient_stack;

/// A single node of the instruction tree.
///
/// Leaf variants carry no payload. A [`Instruction::Loop`] exclusively owns
/// its body, so the whole program is a strict tree.
///
/// Nesting depth is unbounded, so the recursive trait impls below grow the
/// stack per level and dropping a tree never recurses.
#[derive(Debug, Eq)]
pub enum Instruction {
    /// `>`
    MoveRight,
    /// `<`
    MoveLeft,
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[` ... `]`
    Loop(Vec<Instruction>),
}

impl Instruction {
    /// The source character this node was parsed from. Loops report `[`.
    pub fn symbol(&self) -> char {
        match self {
            Instruction::MoveRight => '>',
            Instruction::MoveLeft => '<',
            Instruction::Increment => '+',
            Instruction::Decrement => '-',
            Instruction::Output => '.',
            Instruction::Input => ',',
            Instruction::Loop(_) => '[',
        }
    }

    /// Map a leaf instruction character to its node. Brackets and any
    /// other character return `None`.
    pub fn from_leaf_symbol(ch: char) -> Option<Self> {
        match ch {
            '>' => Some(Instruction::MoveRight),
            '<' => Some(Instruction::MoveLeft),
            '+' => Some(Instruction::Increment),
            '-' => Some(Instruction::Decrement),
            '.' => Some(Instruction::Output),
            ',' => Some(Instruction::Input),
            _ => None,
        }
    }
}

impl Clone for Instruction {
    fn clone(&self) -> Self {
        match self {
            Instruction::MoveRight => Instruction::MoveRight,
            Instruction::MoveLeft => Instruction::MoveLeft,
            Instruction::Increment => Instruction::Increment,
            Instruction::Decrement => Instruction::Decrement,
            Instruction::Output => Instruction::Output,
            Instruction::Input => Instruction::Input,
            Instruction::Loop(body) => ensure_sufficient_stack(|| Instruction::Loop(body.clone())),
        }
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Instruction::Loop(a), Instruction::Loop(b)) => ensure_sufficient_stack(|| a == b),
            (a, b) => mem::discriminant(a) == mem::discriminant(b),
        }
    }
}

impl Drop for Instruction {
    fn drop(&mut self) {
        let Instruction::Loop(body) = self else {
            return;
        };
        // Flatten nested bodies onto a worklist; each popped node is dropped
        // with an empty body.
        let mut pending = mem::take(body);
        while let Some(mut node) = pending.pop() {
            if let Instruction::Loop(inner) = &mut node {
                pending.append(inner);
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Loop(body) => ensure_sufficient_stack(|| -> fmt::Result {
                write!(f, "[")?;
                for node in body {
                    write!(f, "{node}")?;
                }
                write!(f, "]")
            }),
            leaf => write!(f, "{}", leaf.symbol()),
        }
    }
}

/// The root of a parsed program: top-level instructions in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of top-level nodes.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Total number of leaf nodes in the tree, including those nested in loops.
    pub fn instruction_count(&self) -> usize {
        let mut pending: Vec<&[Instruction]> = vec![&self.instructions];
        let mut count = 0;
        while let Some(body) = pending.pop() {
            for node in body {
                match node {
                    Instruction::Loop(inner) => pending.push(inner),
                    _ => count += 1,
                }
            }
        }
        count
    }
}

/// Re-emits the canonical source: recognized characters only, comments dropped.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.instructions {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}
