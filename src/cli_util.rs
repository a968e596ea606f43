use std::io::{self, Write};
use crate::compress::Compressed;
use crate::diagnostics::{self, Trace};
use crate::EngineError;

/// Pretty-print a structured [`EngineError`] with caret positioning in the
/// original `source`. If `program` is `Some("rlbf")`, messages are prefixed
/// with "rlbf: ...".
pub fn print_engine_error(program: Option<&str>, source: &[u8], compressed: &Compressed, err: &EngineError) {
    eprint!("{}", format_engine_error(program, source, compressed, err));
    let _ = io::stderr().flush();
}

pub fn format_engine_error(program: Option<&str>, source: &[u8], compressed: &Compressed, err: &EngineError) -> String {
    let prefix_program = |msg: &str| {
        if let Some(p) = program {
            format!("{p}: {msg}")
        } else {
            msg.to_string()
        }
    };

    let msg = match err {
        EngineError::Underflow { ptr, amount, .. } => {
            format!("Runtime error: pointer underflow (ptr={ptr}, move=-{amount})")
        }
        EngineError::Overflow { ptr, amount, .. } => {
            format!("Runtime error: pointer overflow (ptr={ptr}, move=+{amount})")
        }
        EngineError::StackOverflow { capacity, .. } => {
            format!("Runtime error: loop nesting exceeds {capacity}")
        }
        EngineError::UnclosedLoop { .. } => "Parse error: unclosed loop '['".to_string(),
        EngineError::UnmatchedClose { .. } => "Parse error: unmatched bracket ']'".to_string(),
        EngineError::Decode { source, .. } => format!("Parse error: {source}"),
        EngineError::Io { source, .. } => format!("I/O error: {source}"),
        other => return format!("{}\n", prefix_program(&other.to_string())),
    };
    let msg = prefix_program(&msg);

    let Some(pc) = err.pc() else {
        return format!("{msg}\n");
    };
    // An unclosed loop is reported at its opening bracket, not at end of stream.
    let pc = match err {
        EngineError::UnclosedLoop { open, .. } => open + 1,
        _ => pc,
    };

    match compressed.origin_of(pc) {
        Some(offset) => {
            let at = diagnostics::locate_source(source, offset);
            let mut out = format!("{msg} at {at}, stream offset {pc}\n");
            out.push_str(&format_context(source, offset));
            out
        }
        // Nothing consumed yet; fall back to the stream itself.
        None => {
            let at: Trace = diagnostics::trace(&compressed.stream, pc);
            format!("{msg} at {at}, stream offset {pc}\n")
        }
    }
}

/// A short window of the line containing `pos`, with a caret underneath.
pub fn format_context(code: &[u8], pos: usize) -> String {
    // Show a short window around the position for context
    const WINDOW: usize = 32;

    if code.is_empty() {
        return String::new();
    }
    let pos = pos.min(code.len() - 1);

    let line_start = code[..pos].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let line_end = code[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(code.len(), |i| pos + i);

    let start = pos.saturating_sub(WINDOW).max(line_start);
    let end = (pos + WINDOW + 1).min(line_end).max(pos + 1).min(code.len());
    let slice: String = code[start..end]
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { ' ' })
        .collect();

    // Caret under the exact position
    let mut underline = " ".repeat(pos - start);
    underline.push('^');
    format!("  {slice}\n  {underline}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress_with_map;

    #[test]
    fn context_points_at_position() {
        let ctx = format_context(b"++\n+<+", 4);
        assert_eq!(ctx, "  +<+\n   ^\n");
    }

    #[test]
    fn context_window_is_clamped() {
        let code = [b'+'; 100];
        let ctx = format_context(&code, 50);
        let lines: Vec<&str> = ctx.lines().collect();
        assert_eq!(lines[0].len(), 2 + 65);
        assert_eq!(lines[1], format!("  {}^", " ".repeat(32)));
    }

    #[test]
    fn error_maps_back_to_source_line() {
        let source = b"+++ comment\n\n  <<<<";
        let compressed = compress_with_map(source);
        assert_eq!(compressed.stream, b"3+4<");
        let err = EngineError::Underflow { pc: 4, ptr: 0, amount: 4 };
        let text = format_engine_error(Some("rlbf"), source, &compressed, &err);
        assert!(text.starts_with(
            "rlbf: Runtime error: pointer underflow (ptr=0, move=-4) at line 3, char 3 ('<'), stream offset 4\n"
        ));
        assert!(text.ends_with("    <<<<\n    ^\n"));
    }

    #[test]
    fn unclosed_loop_points_at_its_bracket() {
        let source = b"[ body\n++";
        let compressed = compress_with_map(source);
        assert_eq!(compressed.stream, b"[2+");
        let err = EngineError::UnclosedLoop { pc: 3, open: 0 };
        let text = format_engine_error(Some("rlbf"), source, &compressed, &err);
        assert!(text.starts_with(
            "rlbf: Parse error: unclosed loop '[' at line 1, char 1 ('['), stream offset 1\n"
        ));
        assert!(text.ends_with("  [ body\n  ^\n"));
    }

    #[test]
    fn aborts_have_no_location() {
        let compressed = compress_with_map(b"+[]");
        let text = format_engine_error(None, b"+[]", &compressed, &EngineError::Canceled);
        assert_eq!(text, "Execution aborted: cancelled\n");
    }
}
