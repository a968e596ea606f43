//! A run-length compressing Brainfuck compressor and execution engine.
//!
//! Source text goes through two stages:
//! - [`compress`] strips everything that is not one of `><+-.,[]` and rewrites
//!   runs of the same instruction as `<count><op>` tokens, so `++++[-]`
//!   becomes `4+[-]`. Brackets are never counted.
//! - [`Engine`] executes the compressed stream directly, decoding repeat
//!   counts on the fly, against a bounded tape (30,000 cells by default) and
//!   a bounded loop stack (1024 entries by default).
//!
//! Features and behaviors:
//! - Memory tape initialized to 0; cells wrap at 8 bits.
//! - Strict pointer bounds: moving left of cell 0 or past the end is an error
//!   and the pointer stays where it was.
//! - Input `,` reads a single byte; on EOF the current cell is set to 0.
//! - Output `.` writes the byte at the current cell.
//! - Loops are matched at run time; a stray `]` or an unclosed `[` is reported
//!   with the program counter where it was detected, which
//!   [`diagnostics`] turns into a line/char trace.
//!
//! Quick start:
//!
//! ```no_run
//! use rlbf::{compress, Engine};
//!
//! // Classic "Hello World!" in Brainfuck
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let stream = compress(code.as_bytes());
//! let mut bf = Engine::new(&stream);
//! bf.run().expect("program should run");
//! println!(); // ensure a trailing newline for readability
//! ```

pub mod cli_util;
pub mod commands;
pub mod compress;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod stack;

pub use compress::{compress, compress_with_map, expand, Compressed, DecodeError};
pub use diagnostics::{locate, trace, Location, Trace};
pub use engine::{Engine, EngineConfig, EngineError, StepControl};
pub use stack::{LoopStack, StackError};
