//! Execution engine for compressed instruction streams.
//!
//! The engine walks a stream produced by [`compress`](crate::compress()) one
//! `<count><op>` token at a time:
//! - `+`/`-` add or subtract the count, wrapping at the cell width.
//! - `<`/`>` move the pointer by the count; leaving the tape is an error and
//!   the pointer is left where it was.
//! - `.` writes the current cell once per count; `,` reads exactly one byte
//!   (EOF stores 0) whatever the count.
//! - `[`/`]` are driven by a bounded loop stack for entered loops and a skip
//!   counter for loops whose test failed.
//!
//! Every failure carries the program counter just past the failing
//! instruction, which [`diagnostics`](crate::diagnostics) turns into a
//! line/char trace.
//!
//! ```no_run
//! use rlbf::{compress, Engine};
//!
//! let stream = compress(b"++++++++[>++++++++<-]>+.");
//! let mut engine = Engine::new(&stream);
//! engine.run().expect("program should run");
//! println!();
//! ```

use std::io::{self, Read, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, trace};

use crate::compress::{self, DecodeError};
use crate::stack::LoopStack;

/// One tape cell. Arithmetic wraps at this width.
pub type Cell = u8;

pub const DEFAULT_TAPE_LEN: usize = 30_000;
pub const DEFAULT_STACK_CAPACITY: usize = 1024;

/// Errors that end an execution. `pc` is the stream offset just past the
/// instruction that failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The pointer would have moved left of cell 0.
    #[error("pointer underflow at instruction {pc} (ptr={ptr}, move=-{amount})")]
    Underflow { pc: usize, ptr: usize, amount: usize },

    /// The pointer would have moved past the last cell.
    #[error("pointer overflow at instruction {pc} (ptr={ptr}, move=+{amount})")]
    Overflow { pc: usize, ptr: usize, amount: usize },

    /// More loops were open at once than the loop stack can hold.
    #[error("loop nesting exceeds {capacity} at instruction {pc}")]
    StackOverflow { pc: usize, capacity: usize },

    /// The stream ended while a loop was open or being skipped. `open` is the
    /// offset of the outermost `[` that never closed.
    #[error("unclosed loop opened at offset {open} (end of stream at instruction {pc})")]
    UnclosedLoop { pc: usize, open: usize },

    /// A `]` was reached with no open loop.
    #[error("unmatched ']' at instruction {pc}")]
    UnmatchedClose { pc: usize },

    /// The stream contained a malformed repeat count.
    #[error("malformed stream at instruction {pc}: {source}")]
    Decode {
        pc: usize,
        #[source]
        source: DecodeError,
    },

    /// Reading input or writing output failed.
    #[error("I/O error at instruction {pc}: {source}")]
    Io {
        pc: usize,
        #[source]
        source: io::Error,
    },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    /// Execution aborted due to cooperative cancellation (e.g., timeout)
    #[error("Execution aborted: cancelled")]
    Canceled,

    /// The engine was asked to run a second time.
    #[error("engine has already run; create a new one")]
    AlreadyRun,
}

impl EngineError {
    /// The failing program counter, for errors tied to an instruction.
    pub fn pc(&self) -> Option<usize> {
        match self {
            EngineError::Underflow { pc, .. }
            | EngineError::Overflow { pc, .. }
            | EngineError::StackOverflow { pc, .. }
            | EngineError::UnclosedLoop { pc, .. }
            | EngineError::UnmatchedClose { pc }
            | EngineError::Decode { pc, .. }
            | EngineError::Io { pc, .. } => Some(*pc),
            EngineError::StepLimitExceeded { .. } | EngineError::Canceled | EngineError::AlreadyRun => None,
        }
    }
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone, Default)]
pub struct StepControl {
    pub max_steps: Option<usize>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<usize>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }
}

/// Construction-time engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub tape_len: usize,
    pub stack_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tape_len: DEFAULT_TAPE_LEN,
            stack_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

/// Execution state for one run of one compressed stream.
///
/// The engine maintains:
/// - the borrowed instruction stream and a program counter into it,
/// - a zeroed tape of `tape_len` cells and a data pointer,
/// - the loop stack and skip counter used for `[`/`]`.
///
/// An engine runs once. After a failure its tape is not meaningful.
pub struct Engine<'a> {
    stream: &'a [u8],
    tape: Vec<Cell>,
    pointer: usize,
    pc: usize,
    skip: usize,
    skip_open: usize,
    loops: LoopStack,
    spent: bool,
}

impl<'a> Engine<'a> {
    /// Create an engine with a 30,000 cell tape and 1024 deep loop stack.
    pub fn new(stream: &'a [u8]) -> Self {
        Self::with_config(stream, EngineConfig::default())
    }

    /// Create an engine with explicit limits. A `tape_len` of 0 is raised to
    /// a single cell so the pointer always has a cell to address.
    pub fn with_config(stream: &'a [u8], config: EngineConfig) -> Self {
        Self {
            stream,
            tape: vec![0; config.tape_len.max(1)],
            pointer: 0,
            pc: 0,
            skip: 0,
            skip_open: 0,
            loops: LoopStack::with_capacity(config.stack_capacity),
            spent: false,
        }
    }

    pub fn tape(&self) -> &[Cell] {
        &self.tape
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    /// Execute against stdin and stdout.
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.execute(io::stdin().lock(), io::stdout().lock(), false, None)
    }

    /// Execute with `,` reading from `input` and `.` writing to `output`.
    pub fn run_with_io<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<(), EngineError> {
        self.execute(input, output, false, None)
    }

    /// Execute with cooperative cancellation and optional step limit.
    pub fn run_with_control<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
        step_control: &StepControl,
    ) -> Result<(), EngineError> {
        self.execute(input, output, false, Some(step_control))
    }

    /// Debug-run the program, writing a step-by-step table of operations to
    /// `output` instead of producing I/O side effects. State advances exactly
    /// as in a real run, but:
    /// - '.' does not write the cell; the action is logged instead
    /// - ',' does not read; EOF is simulated and the cell set to 0
    pub fn run_debug<W: Write>(&mut self, output: W, step_control: Option<&StepControl>) -> Result<(), EngineError> {
        self.execute(io::empty(), output, true, step_control)
    }

    fn execute<R: Read, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
        table: bool,
        step_control: Option<&StepControl>,
    ) -> Result<(), EngineError> {
        if self.spent {
            return Err(EngineError::AlreadyRun);
        }
        self.spent = true;
        debug!(stream_len = self.stream.len(), tape_len = self.tape.len(), table, "engine start");

        if table {
            self.write_out(&mut output, b"STEP | PC  | PTR | CELL | OP    | ACTION\n")?;
            self.write_out(
                &mut output,
                b"-----+-----+-----+------+-------+------------------------------------------------\n",
            )?;
        }

        let mut step: usize = 0;
        let result = loop {
            if let Some(ctrl) = step_control {
                if ctrl.cancel_flag.load(Ordering::Relaxed) {
                    break Err(EngineError::Canceled);
                }
                if let Some(max) = ctrl.max_steps {
                    if step >= max {
                        break Err(EngineError::StepLimitExceeded { limit: max });
                    }
                }
            }

            let token = match compress::decode(self.stream, self.pc) {
                None => break Ok(()),
                Some(Ok(token)) => token,
                Some(Err(source)) => break Err(EngineError::Decode { pc: self.pc + 1, source }),
            };
            let at = token.next - 1;
            self.pc = token.next;
            step += 1;

            let (ptr_before, cell_before) = (self.pointer, self.tape[self.pointer]);
            let action = match self.dispatch(token.op, token.count, at, &mut input, &mut output, table) {
                Ok(action) => action,
                Err(err) => break Err(err),
            };

            if table {
                let op = if token.count > 1 {
                    format!("{}{}", token.count, char::from(token.op))
                } else {
                    char::from(token.op).to_string()
                };
                let row = format!(
                    "{:<4} | {:<3} | {:<3} | {:<4} | {:<5} | {}\n",
                    step - 1,
                    at,
                    ptr_before,
                    cell_before,
                    op,
                    action.unwrap_or_default()
                );
                if let Err(err) = self.write_out(&mut output, row.as_bytes()) {
                    break Err(err);
                }
            }
        };

        let result = result.and_then(|()| {
            // Skipped loops always nest inside the entered ones.
            match self.loops.bottom() {
                Some(open) => Err(EngineError::UnclosedLoop { pc: self.pc, open }),
                None if self.skip > 0 => Err(EngineError::UnclosedLoop { pc: self.pc, open: self.skip_open }),
                None => Ok(()),
            }
        });
        let flushed = output.flush().map_err(|source| EngineError::Io { pc: self.pc, source });

        match &result {
            Ok(()) => debug!(steps = step, pointer = self.pointer, "engine finished"),
            Err(err) => debug!(steps = step, error = %err, "engine aborted"),
        }
        result.and(flushed)
    }

    /// Apply one decoded instruction. `at` is the offset of the op byte.
    /// Returns a description of the action when `debug` is set.
    fn dispatch<R: Read, W: Write>(
        &mut self,
        op: u8,
        count: usize,
        at: usize,
        input: &mut R,
        output: &mut W,
        debug: bool,
    ) -> Result<Option<String>, EngineError> {
        let pc = self.pc;

        if self.skip > 0 && op != b'[' && op != b']' {
            return Ok(debug.then(|| format!("Skipped (depth {})", self.skip)));
        }

        let action = match op {
            b'+' | b'-' => {
                // Truncation to the cell width is the wraparound.
                let delta = count as Cell;
                let before = self.tape[self.pointer];
                let after = if op == b'+' {
                    before.wrapping_add(delta)
                } else {
                    before.wrapping_sub(delta)
                };
                self.tape[self.pointer] = after;
                debug.then(|| format!("Set cell[{}] from {} to {}", self.pointer, before, after))
            }
            b'>' => {
                self.pointer = self
                    .pointer
                    .checked_add(count)
                    .filter(|&target| target < self.tape.len())
                    .ok_or(EngineError::Overflow { pc, ptr: self.pointer, amount: count })?;
                debug.then(|| format!("Moved pointer head to index {}", self.pointer))
            }
            b'<' => {
                self.pointer = self
                    .pointer
                    .checked_sub(count)
                    .ok_or(EngineError::Underflow { pc, ptr: self.pointer, amount: count })?;
                debug.then(|| format!("Moved pointer head to index {}", self.pointer))
            }
            b'.' => {
                let cell = self.tape[self.pointer];
                if debug {
                    Some(format!("Output byte '{}' x{} (suppressed in debug)", char::from(cell), count))
                } else {
                    for _ in 0..count {
                        self.write_out(&mut *output, &[cell])?;
                    }
                    None
                }
            }
            b',' => {
                if debug {
                    self.tape[self.pointer] = 0;
                    Some("Read byte -> simulated EOF (set cell to 0)".to_string())
                } else {
                    let mut buf = [0u8; 1];
                    // Flush so prompts written by the program show before blocking.
                    output.flush().map_err(|source| EngineError::Io { pc, source })?;
                    self.tape[self.pointer] = match input.read(&mut buf) {
                        Ok(0) => 0,
                        Ok(_) => buf[0],
                        Err(source) => return Err(EngineError::Io { pc, source }),
                    };
                    None
                }
            }
            b'[' => {
                if self.skip > 0 || self.tape[self.pointer] == 0 {
                    if self.skip == 0 {
                        self.skip_open = at;
                    }
                    self.skip += 1;
                    debug.then(|| format!("Cell is 0 or skipping; skip depth now {}", self.skip))
                } else {
                    self.loops.push(at).map_err(|_| EngineError::StackOverflow {
                        pc,
                        capacity: self.loops.capacity(),
                    })?;
                    trace!(open = at, depth = self.loops.len(), "enter loop");
                    debug.then(|| "Enter loop (cell != 0)".to_string())
                }
            }
            b']' => {
                if self.skip > 0 {
                    self.skip -= 1;
                    debug.then(|| format!("End of skipped loop; skip depth now {}", self.skip))
                } else if self.tape[self.pointer] == 0 {
                    let open = self
                        .loops
                        .pop()
                        .map_err(|_| EngineError::UnmatchedClose { pc })?;
                    debug_assert!(
                        open < at && self.stream[open] == b'[',
                        "loop stack entry {open} is not an open bracket before {at}"
                    );
                    trace!(open, depth = self.loops.len(), "exit loop");
                    debug.then(|| "Exit loop (cell is 0)".to_string())
                } else {
                    let open = self.loops.peek().ok_or(EngineError::UnmatchedClose { pc })?;
                    // Resume just past the '[' so the entry is not pushed twice.
                    self.pc = open + 1;
                    debug.then(|| format!("Cell != 0; jump back to loop body at PC {}", self.pc))
                }
            }
            // Whitespace and comments in an uncompressed stream.
            _ => debug.then(|| "Ignored".to_string()),
        };
        Ok(action)
    }

    fn write_out<W: Write>(&self, output: &mut W, bytes: &[u8]) -> Result<(), EngineError> {
        output
            .write_all(bytes)
            .map_err(|source| EngineError::Io { pc: self.pc, source })
    }
}
