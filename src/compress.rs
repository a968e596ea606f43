//! Source filtering and run-length encoding.
//!
//! Compression happens in two phases:
//! 1. [`filter`] keeps only the eight Brainfuck instruction bytes.
//! 2. [`encode_runs`] rewrites every run of N > 1 identical non-bracket
//!    instructions as the decimal literal `N` followed by the instruction.
//!
//! Brackets are structural and always stand alone, so `[[` stays `[[`.
//! Digits never survive phase 1, which means every digit in a compressed
//! stream belongs to a repeat count.

use std::iter::Peekable;
use tracing::debug;

/// Errors found while decoding a `<count><op>` token from a compressed stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The stream ended before the literal starting at `at` reached an instruction.
    #[error("repeat count at offset {at} is not followed by an instruction")]
    TruncatedLiteral { at: usize },

    /// A literal was followed by a byte that is not an instruction.
    #[error("repeat count at offset {at} is followed by '{found}'")]
    MisplacedLiteral { at: usize, found: char },

    /// A literal of zero repeats.
    #[error("repeat count at offset {at} is zero")]
    ZeroCount { at: usize },

    /// A literal too large to represent.
    #[error("repeat count at offset {at} is too large")]
    CountOverflow { at: usize },
}

/// One decoded `<count><op>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Repeat count; 1 when no literal preceded the instruction.
    pub count: usize,
    /// The instruction byte.
    pub op: u8,
    /// Offset just past the instruction.
    pub next: usize,
}

/// Compressed stream plus, for each stream byte, the offset in the original
/// source of the run it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compressed {
    pub stream: Vec<u8>,
    pub origins: Vec<usize>,
}

impl Compressed {
    /// Map an engine program counter back to the source offset of the
    /// instruction consumed last before it.
    pub fn origin_of(&self, pc: usize) -> Option<usize> {
        self.origins.get(pc.checked_sub(1)?).copied()
    }
}

pub fn is_instruction(byte: u8) -> bool {
    matches!(byte, b'+' | b'-' | b'<' | b'>' | b'.' | b',' | b'[' | b']')
}

fn is_bracket(byte: u8) -> bool {
    matches!(byte, b'[' | b']')
}

/// Keep only instruction bytes, in order. Runs are not merged.
pub fn filter(source: &[u8]) -> Vec<u8> {
    source.iter().copied().filter(|&b| is_instruction(b)).collect()
}

/// Run-length encode an already filtered instruction sequence.
pub fn encode_runs(filtered: &[u8]) -> Vec<u8> {
    let mut stream = Vec::with_capacity(filtered.len());
    encode(filtered.iter().copied().enumerate().peekable(), |byte, _| {
        stream.push(byte)
    });
    stream
}

/// Filter `source` and run-length encode the result.
pub fn compress(source: &[u8]) -> Vec<u8> {
    let stream = encode_runs(&filter(source));
    debug!(source_len = source.len(), stream_len = stream.len(), "compressed source");
    stream
}

/// Like [`compress`], but also records where every stream byte came from.
pub fn compress_with_map(source: &[u8]) -> Compressed {
    let mut out = Compressed::default();
    let instructions = source
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, b)| is_instruction(b));
    encode(instructions.peekable(), |byte, origin| {
        out.stream.push(byte);
        out.origins.push(origin);
    });
    debug!(source_len = source.len(), stream_len = out.stream.len(), "compressed source with map");
    out
}

fn encode<I, F>(mut instructions: Peekable<I>, mut emit: F)
where
    I: Iterator<Item = (usize, u8)>,
    F: FnMut(u8, usize),
{
    while let Some((start, op)) = instructions.next() {
        let mut run = 1usize;
        if !is_bracket(op) {
            while instructions.next_if(|&(_, next)| next == op).is_some() {
                run += 1;
            }
        }
        if run > 1 {
            for digit in run.to_string().bytes() {
                emit(digit, start);
            }
        }
        emit(op, start);
    }
}

/// Decode the `<count><op>` token starting at `pc`.
///
/// Returns `None` at end of stream. A byte that is neither a digit nor an
/// instruction is returned as-is with a count of 1 so callers can skip it.
pub fn decode(stream: &[u8], pc: usize) -> Option<Result<Token, DecodeError>> {
    let first = *stream.get(pc)?;
    if !first.is_ascii_digit() {
        return Some(Ok(Token { count: 1, op: first, next: pc + 1 }));
    }

    let mut count: usize = 0;
    let mut cursor = pc;
    while let Some(&byte) = stream.get(cursor) {
        if !byte.is_ascii_digit() {
            break;
        }
        count = match count
            .checked_mul(10)
            .and_then(|c| c.checked_add(usize::from(byte - b'0')))
        {
            Some(c) => c,
            None => return Some(Err(DecodeError::CountOverflow { at: pc })),
        };
        cursor += 1;
    }

    let Some(&op) = stream.get(cursor) else {
        return Some(Err(DecodeError::TruncatedLiteral { at: pc }));
    };
    if !is_instruction(op) {
        return Some(Err(DecodeError::MisplacedLiteral { at: pc, found: char::from(op) }));
    }
    if count == 0 {
        return Some(Err(DecodeError::ZeroCount { at: pc }));
    }
    Some(Ok(Token { count, op, next: cursor + 1 }))
}

/// Undo [`encode_runs`]: expand every `<count><op>` token back into a run.
pub fn expand(stream: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(stream.len());
    let mut pc = 0;
    while let Some(token) = decode(stream, pc) {
        let token = token?;
        out.extend(std::iter::repeat_n(token.op, token.count));
        pc = token.next;
    }
    Ok(out)
}
