//! Human-readable positions for error traces.

use std::fmt;

/// A 1-based line and column.
///
/// `column` is the column of the most recently consumed byte, so it is 0 when
/// nothing on the current line has been consumed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, char {}", self.line, self.column)
    }
}

/// A location together with the instruction found there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trace {
    pub location: Location,
    pub instruction: Option<char>,
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instruction {
            Some(ch) => write!(f, "{} ('{}')", self.location, ch),
            None => write!(f, "{}", self.location),
        }
    }
}

/// Locate program counter `pc` within `stream`.
///
/// Only `stream[..pc]` is scanned; a `pc` past the end is clamped.
pub fn locate(stream: &[u8], pc: usize) -> Location {
    let consumed = &stream[..pc.min(stream.len())];
    let mut location = Location { line: 1, column: 0 };
    for &byte in consumed {
        if byte == b'\n' {
            location.line += 1;
            location.column = 0;
        } else {
            location.column += 1;
        }
    }
    location
}

/// Locate `pc` and report the instruction consumed just before it.
pub fn trace(stream: &[u8], pc: usize) -> Trace {
    let instruction = pc
        .checked_sub(1)
        .and_then(|i| stream.get(i))
        .map(|&b| char::from(b));
    Trace {
        location: locate(stream, pc),
        instruction,
    }
}

/// Locate the byte at `offset` in the original source.
///
/// Unlike [`locate`], which takes a post-increment program counter, this
/// includes the byte at `offset` itself.
pub fn locate_source(source: &[u8], offset: usize) -> Trace {
    let end = offset.saturating_add(1);
    Trace {
        location: locate(source, end),
        instruction: source.get(offset).map(|&b| char::from(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_positions() {
        assert_eq!(locate(b"4+[-]", 0), Location { line: 1, column: 0 });
        assert_eq!(locate(b"4+[-]", 3), Location { line: 1, column: 3 });
        assert_eq!(locate(b"]", 1), Location { line: 1, column: 1 });
    }

    #[test]
    fn newlines_advance_the_line() {
        let source = b"++\n+<\n>";
        assert_eq!(locate(source, 5), Location { line: 2, column: 2 });
        assert_eq!(locate(source, 6), Location { line: 3, column: 0 });
        assert_eq!(locate(source, 7), Location { line: 3, column: 1 });
    }

    #[test]
    fn pc_past_end_is_clamped() {
        assert_eq!(locate(b"++", 10), Location { line: 1, column: 2 });
    }

    #[test]
    fn trace_reports_last_instruction() {
        let t = trace(b"+<", 2);
        assert_eq!(t.instruction, Some('<'));
        assert_eq!(t.to_string(), "line 1, char 2 ('<')");
        assert_eq!(trace(b"+", 0).instruction, None);
    }

    #[test]
    fn source_offsets_are_inclusive() {
        let t = locate_source(b"ab\ncd<", 5);
        assert_eq!(t.location, Location { line: 2, column: 3 });
        assert_eq!(t.instruction, Some('<'));
    }
}
