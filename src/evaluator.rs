//! Tree-walking evaluator.
//!
//! Walks a [`Program`] against a [`State`], applying one transition rule per
//! [`Instruction`] variant. The first failure aborts the run; anything already
//! written to the tape or the output stream stays as it is.

use std::io::{self, BufRead, Write};

use crate::ast::{Instruction, Program};
use crate::stack::ensure_sufficient_stack;
use crate::state::State;

/// Errors that abort a running program.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The data pointer attempted to move left of cell 0 or past the last cell.
    #[error("pointer out of bounds (ptr={pointer}, op='{op}')")]
    PointerOutOfBounds { pointer: usize, op: char },

    /// The input, output, or trace stream failed. End of input is not an error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Executes programs against caller-supplied byte streams.
///
/// Output bytes are written raw, one per `.`; byte 10 is a line break.
/// Input reads one byte per `,` and treats a `\r\n` pair as a single
/// newline (stored as 10). On end of input the current cell is left as is.
pub struct Evaluator<'io> {
    input: Box<dyn BufRead + 'io>,
    output: Box<dyn Write + 'io>,
    // Receives a step-by-step table when set.
    trace: Option<Box<dyn Write + 'io>>,
    step: usize,
}

impl<'io> Evaluator<'io> {
    pub fn new<R, W>(input: R, output: W) -> Self
    where
        R: BufRead + 'io,
        W: Write + 'io,
    {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            trace: None,
            step: 0,
        }
    }

    /// Write a table of every executed instruction to `sink`:
    /// `STEP | PTR | CELL | INSTR | ACTION`.
    pub fn with_trace<T>(mut self, sink: T) -> Self
    where
        T: Write + 'io,
    {
        self.trace = Some(Box::new(sink));
        self
    }

    /// Execute every top-level node of `program` once, in order.
    ///
    /// The output stream is flushed before returning, whether or not the
    /// run succeeded.
    #[tracing::instrument(level = "debug", skip_all, fields(instructions = program.instruction_count()))]
    pub fn run(&mut self, program: &Program, state: &mut State) -> Result<(), RuntimeError> {
        self.step = 0;
        if let Some(trace) = self.trace.as_mut() {
            writeln!(trace, "STEP | PTR | CELL | INSTR | ACTION")?;
            writeln!(
                trace,
                "-----+-----+------+-------+------------------------------------------------"
            )?;
        }

        let result = self.block(program.instructions(), state);
        let flushed = self.output.flush();

        if let Err(err) = &result {
            tracing::debug!(error = %err, pointer = state.pointer(), "run aborted");
        }
        result?;
        flushed?;

        tracing::debug!(
            pointer = state.pointer(),
            inputs = state.inputs().len(),
            outputs = state.outputs().len(),
            "run finished"
        );
        Ok(())
    }

    fn block(&mut self, body: &[Instruction], state: &mut State) -> Result<(), RuntimeError> {
        for node in body {
            self.execute(node, state)?;
        }
        Ok(())
    }

    fn execute(&mut self, node: &Instruction, state: &mut State) -> Result<(), RuntimeError> {
        let (ptr_before, cell_before) = (state.pointer(), state.current_cell());

        match node {
            Instruction::MoveRight => {
                if !state.move_right() {
                    return Err(RuntimeError::PointerOutOfBounds {
                        pointer: ptr_before,
                        op: '>',
                    });
                }
                let ptr = state.pointer();
                self.trace_row(ptr_before, cell_before, '>', || {
                    format!("Moved pointer to cell {ptr}")
                })?;
            }
            Instruction::MoveLeft => {
                if !state.move_left() {
                    return Err(RuntimeError::PointerOutOfBounds {
                        pointer: ptr_before,
                        op: '<',
                    });
                }
                let ptr = state.pointer();
                self.trace_row(ptr_before, cell_before, '<', || {
                    format!("Moved pointer to cell {ptr}")
                })?;
            }
            Instruction::Increment => {
                let after = state.increment();
                self.trace_row(ptr_before, cell_before, '+', || {
                    format!("Increment cell[{ptr_before}] from {cell_before} to {after}")
                })?;
            }
            Instruction::Decrement => {
                let after = state.decrement();
                self.trace_row(ptr_before, cell_before, '-', || {
                    format!("Decrement cell[{ptr_before}] from {cell_before} to {after}")
                })?;
            }
            Instruction::Output => {
                let byte = state.record_output();
                self.output.write_all(&[byte])?;
                self.trace_row(ptr_before, cell_before, '.', || format!("Output byte {byte}"))?;
            }
            Instruction::Input => {
                // Prompts written by the program must be visible before we block.
                self.output.flush()?;
                match self.read_byte()? {
                    Some((byte, folded)) => {
                        let single = [byte];
                        let raw: &[u8] = if folded { b"\r\n" } else { &single };
                        state.store_input(byte, raw);
                        self.trace_row(ptr_before, cell_before, ',', || {
                            format!("Read byte {byte} into cell[{ptr_before}]")
                        })?;
                    }
                    None => {
                        self.trace_row(ptr_before, cell_before, ',', || {
                            "End of input; cell unchanged".to_string()
                        })?;
                    }
                }
            }
            Instruction::Loop(body) => self.run_loop(body, state)?,
        }

        Ok(())
    }

    fn run_loop(&mut self, body: &[Instruction], state: &mut State) -> Result<(), RuntimeError> {
        ensure_sufficient_stack(|| -> Result<(), RuntimeError> {
            tracing::trace!(pointer = state.pointer(), body = body.len(), "enter loop");
            while state.current_cell() != 0 {
                self.trace_row(state.pointer(), state.current_cell(), '[', || {
                    "Cell != 0; run loop body".to_string()
                })?;
                self.block(body, state)?;
            }
            self.trace_row(state.pointer(), 0, ']', || "Cell is 0; exit loop".to_string())?;
            Ok(())
        })
    }

    /// Read one byte, folding `\r\n` into `\n`. `None` means end of input;
    /// the flag is set when a pair was folded.
    fn read_byte(&mut self) -> io::Result<Option<(u8, bool)>> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if buf[0] == b'\r' {
            // Peeking blocks until the next byte or EOF arrives. Terminals in
            // cooked mode only deliver `\r` as part of a full line, so this
            // never waits on a keystroke there.
            let next = self.input.fill_buf()?;
            if next.first() == Some(&b'\n') {
                self.input.consume(1);
                return Ok(Some((b'\n', true)));
            }
        }
        Ok(Some((buf[0], false)))
    }

    fn trace_row(
        &mut self,
        ptr: usize,
        cell: u8,
        instr: char,
        action: impl FnOnce() -> String,
    ) -> io::Result<()> {
        let step = self.step;
        self.step += 1;
        match self.trace.as_mut() {
            Some(trace) => writeln!(
                trace,
                "{:<4} | {:<3} | {:<4} |  {}    | {}",
                step,
                ptr,
                cell,
                instr,
                action()
            ),
            None => Ok(()),
        }
    }
}

impl Evaluator<'static> {
    /// Bind the evaluator to process stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

/// Run `program` against `state` using process stdin and stdout.
pub fn run(program: &Program, state: &mut State) -> Result<(), RuntimeError> {
    Evaluator::stdio().run(program, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_MEMORY;
    use crate::parser::parse;
    use proptest::prelude::*;

    /// Parse and run `source` with `input`, returning the result, final state
    /// and the bytes written to the output stream.
    fn run_source(source: &str, input: &[u8]) -> (Result<(), RuntimeError>, State, Vec<u8>) {
        let program = parse(source).expect("valid program");
        let mut state = State::new();
        let mut out = Vec::new();
        let result = Evaluator::new(input, &mut out).run(&program, &mut state);
        (result, state, out)
    }

    #[test]
    fn moves_and_increments_leave_expected_tape() {
        let (result, state, out) = run_source("+++>++>+", b"");
        assert!(result.is_ok());
        assert_eq!(&state.memory()[..3], &[3, 2, 1]);
        assert_eq!(state.pointer(), 2);
        assert!(out.is_empty());
        assert!(state.outputs().is_empty());
    }

    #[test]
    fn output_records_non_printable_byte() {
        let (result, state, out) = run_source("+++.", b"");
        assert!(result.is_ok());
        assert_eq!(state.outputs(), &[3]);
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn byte_ten_is_written_as_line_break() {
        let (_, _, out) = run_source("++++++++++.", b"");
        assert_eq!(out, b"\n");
    }

    #[test]
    fn clear_loop_runs_until_cell_is_zero() {
        let program = parse("[-]").unwrap();
        let mut state = State::new();
        state.memory_mut()[0] = 5;
        let mut out = Vec::new();
        let mut evaluator = Evaluator::new(&b""[..], &mut out).with_trace(Vec::new());
        evaluator.run(&program, &mut state).unwrap();
        assert_eq!(state.current_cell(), 0);
    }

    #[test]
    fn loop_body_runs_once_per_nonzero_test() {
        let program = parse("[->+<]").unwrap();
        let mut state = State::new();
        state.memory_mut()[0] = 5;
        let mut trace = Vec::new();
        Evaluator::new(&b""[..], io::sink())
            .with_trace(&mut trace)
            .run(&program, &mut state)
            .unwrap();
        let trace = String::from_utf8(trace).unwrap();
        assert_eq!(trace.matches("run loop body").count(), 5);
        assert_eq!(&state.memory()[..2], &[0, 5]);
    }

    #[test]
    fn loop_on_zero_cell_skips_body() {
        let (result, state, out) = run_source("[<.]", b"");
        assert!(result.is_ok());
        assert_eq!(state.pointer(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn move_left_from_zero_fails() {
        let (result, state, _) = run_source("<", b"");
        assert!(matches!(
            result,
            Err(RuntimeError::PointerOutOfBounds { pointer: 0, op: '<' })
        ));
        assert_eq!(state.pointer(), 0);
    }

    #[test]
    fn move_right_from_last_cell_fails() {
        let source = ">".repeat(MAX_MEMORY);
        let (result, state, _) = run_source(&source, b"");
        match result {
            Err(RuntimeError::PointerOutOfBounds { pointer, op: '>' }) => {
                assert_eq!(pointer, MAX_MEMORY - 1)
            }
            other => panic!("expected out of bounds, got {other:?}"),
        }
        assert_eq!(state.pointer(), MAX_MEMORY - 1);
    }

    #[test]
    fn failure_inside_loop_keeps_prior_side_effects() {
        let (result, state, out) = run_source("+.[<]", b"");
        assert!(matches!(result, Err(RuntimeError::PointerOutOfBounds { .. })));
        assert_eq!(state.outputs(), &[1]);
        assert_eq!(out, vec![1]);
        assert_eq!(state.current_cell(), 1);
    }

    #[test]
    fn input_stores_bytes_and_logs_them() {
        let (result, state, out) = run_source(",[.[-],]", b"abc");
        assert!(result.is_ok());
        assert_eq!(out, b"abc");
        assert_eq!(state.inputs(), b"abc");
        assert_eq!(state.outputs(), b"abc");
    }

    #[test]
    fn end_of_input_leaves_cell_unchanged() {
        let (result, state, _) = run_source("+++++,", b"");
        assert!(result.is_ok());
        assert_eq!(state.current_cell(), 5);
        assert!(state.inputs().is_empty());
    }

    #[test]
    fn crlf_input_is_stored_as_single_newline() {
        let (result, state, _) = run_source(",>,>,", b"\r\nx");
        assert!(result.is_ok());
        assert_eq!(&state.memory()[..3], &[10, b'x', 0]);
        assert_eq!(state.inputs(), b"\r\nx");
    }

    #[test]
    fn lone_carriage_return_is_kept() {
        let (_, state, _) = run_source(",>,>,", b"\rx\r");
        assert_eq!(&state.memory()[..3], &[b'\r', b'x', b'\r']);
        assert_eq!(state.inputs(), b"\rx\r");
    }

    #[test]
    fn trace_table_lists_each_step() {
        let program = parse(">+").unwrap();
        let mut state = State::new();
        let mut trace = Vec::new();
        Evaluator::new(&b""[..], io::sink())
            .with_trace(&mut trace)
            .run(&program, &mut state)
            .unwrap();
        let trace = String::from_utf8(trace).unwrap();
        assert!(trace.starts_with("STEP | PTR | CELL | INSTR | ACTION"));
        assert!(trace.contains("Moved pointer to cell 1"));
        assert!(trace.contains("Increment cell[1] from 0 to 1"));
    }

    #[test]
    fn deeply_nested_loops_execute() {
        let depth = 2_000;
        let source = format!("+{}-{}", "[".repeat(depth), "]".repeat(depth));
        let (result, state, _) = run_source(&source, b"");
        assert!(result.is_ok());
        assert_eq!(state.current_cell(), 0);
    }

    #[test]
    fn hello_world() {
        let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
        let (result, _, out) = run_source(code, b"");
        assert!(result.is_ok());
        assert_eq!(out, b"Hello World!\n");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_stream_failure_is_io_error() {
        let program = parse("+.").unwrap();
        let mut state = State::new();
        let result = Evaluator::new(&b""[..], FailingWriter).run(&program, &mut state);
        assert!(matches!(result, Err(RuntimeError::Io { .. })));
    }

    proptest! {
        #[test]
        fn runs_are_deterministic(
            source in "[+\\-<>.,]{0,40}",
            input in prop::collection::vec(any::<u8>(), 0..16),
        ) {
            // Start to the right so '<' has room; failures must also reproduce.
            let source = format!("{}{}", ">".repeat(40), source);
            let (first, first_state, first_out) = run_source(&source, &input);
            let (second, second_state, second_out) = run_source(&source, &input);
            prop_assert_eq!(first.is_ok(), second.is_ok());
            prop_assert_eq!(first_state, second_state);
            prop_assert_eq!(first_out, second_out);
        }

        #[test]
        fn any_starting_value_wraps_back_after_256(start in any::<u8>()) {
            let program = parse(&"+".repeat(256)).unwrap();
            let mut state = State::new();
            state.memory_mut()[0] = start;
            Evaluator::new(&b""[..], io::sink()).run(&program, &mut state).unwrap();
            prop_assert_eq!(state.current_cell(), start);
        }
    }
}
