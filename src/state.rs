//! Mutable execution state for a single program run.

use crate::MAX_MEMORY;

/// Tape, data pointer, and the logs of bytes consumed and produced.
///
/// The tape always holds exactly [`MAX_MEMORY`] cells and the pointer
/// always stays in `0..MAX_MEMORY`; the evaluator refuses any move that
/// would break this before touching the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    memory: Vec<u8>,
    pointer: usize,
    inputs: Vec<u8>,
    outputs: Vec<u8>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// A zeroed tape with the pointer on cell 0 and empty logs.
    pub fn new() -> Self {
        Self {
            memory: vec![0; MAX_MEMORY],
            pointer: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Mutable view of the tape. The slice has a fixed length, so callers can
    /// seed cell values but cannot resize the tape.
    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn current_cell(&self) -> u8 {
        self.memory[self.pointer]
    }

    /// Every byte stored by an input instruction, in order.
    pub fn inputs(&self) -> &[u8] {
        &self.inputs
    }

    /// Every byte emitted by an output instruction, in order.
    pub fn outputs(&self) -> &[u8] {
        &self.outputs
    }

    pub(crate) fn move_right(&mut self) -> bool {
        if self.pointer >= MAX_MEMORY - 1 {
            return false;
        }
        self.pointer += 1;
        true
    }

    pub(crate) fn move_left(&mut self) -> bool {
        if self.pointer == 0 {
            return false;
        }
        self.pointer -= 1;
        true
    }

    pub(crate) fn increment(&mut self) -> u8 {
        let cell = &mut self.memory[self.pointer];
        *cell = cell.wrapping_add(1);
        *cell
    }

    pub(crate) fn decrement(&mut self) -> u8 {
        let cell = &mut self.memory[self.pointer];
        *cell = cell.wrapping_sub(1);
        *cell
    }

    /// Store `byte` in the current cell and log the `raw` bytes consumed to
    /// produce it.
    pub(crate) fn store_input(&mut self, byte: u8, raw: &[u8]) {
        self.memory[self.pointer] = byte;
        self.inputs.extend_from_slice(raw);
    }

    pub(crate) fn record_output(&mut self) -> u8 {
        let byte = self.current_cell();
        self.outputs.push(byte);
        byte
    }
}
