use std::io::{self, Write};

use crate::builder::{BuildError, Program};
use crate::machine::RunError;

/// Pretty-print a [`BuildError`] with caret positioning.
/// If `program` is `Some("tapebf")`, messages are prefixed with "tapebf: ...".
pub fn print_build_error(program: Option<&str>, code: &str, err: &BuildError) {
    match err {
        BuildError::UnbalancedLoop { offset } => {
            let msg = prefix_program(program, "Parse error: unmatched ']'");
            print_error_with_context(&msg, code, *offset);
        }
        BuildError::UnterminatedLoop { offset } => {
            let msg = prefix_program(program, "Parse error: unterminated '['");
            print_error_with_context(&msg, code, *offset);
        }
        BuildError::Io(source) => {
            eprintln!("{}", prefix_program(program, &format!("I/O error: {source}")));
            let _ = io::stderr().flush();
        }
    }
}

/// Pretty-print a [`RunError`], pointing at the source of the failing instruction.
pub fn print_run_error(program: Option<&str>, code: &str, built: &Program, err: &RunError) {
    match err {
        RunError::TapeBounds { ip, cursor, op, count } => {
            let msg = prefix_program(
                program,
                &format!("Runtime error: cursor out of bounds (cursor={cursor}, op={op} x{count})"),
            );
            print_at_instruction(&msg, code, built, *ip);
        }
        RunError::Io { ip, source } => {
            let msg = prefix_program(program, &format!("I/O error: {source}"));
            print_at_instruction(&msg, code, built, *ip);
        }
        RunError::StepLimitExceeded { .. } | RunError::Canceled => {
            eprintln!("{err}");
            let _ = io::stderr().flush();
        }
    }
}

fn prefix_program(program: Option<&str>, msg: &str) -> String {
    match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg.to_string(),
    }
}

fn print_at_instruction(msg: &str, code: &str, built: &Program, ip: usize) {
    match built.offset_of(ip) {
        Some(offset) => print_error_with_context(msg, code, offset),
        // ip == len: the failure happened after the last instruction (final flush)
        None => {
            eprintln!("{msg}");
            let _ = io::stderr().flush();
        }
    }
}

/// Print a concise error with line/column and a caret under the offending
/// character. `offset` is a byte offset into `code`.
pub fn print_error_with_context(prefix: &str, code: &str, offset: usize) {
    let offset = offset.min(code.len());
    let line_start = code[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = code[offset..].find('\n').map_or(code.len(), |i| offset + i);
    let line_no = code[..line_start].matches('\n').count() + 1;
    let line = code[line_start..line_end].trim_end_matches('\r');
    let pos = code[line_start..offset].chars().count();

    eprintln!("{prefix} at line {line_no}, column {}", pos + 1);

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = line.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(line, start_char);
    let end_byte = char_to_byte_index(line, end_char);
    let slice = &line[start_byte..end_byte];

    eprintln!("  {}", slice);

    // Caret under the exact position
    let underline = format!("{}^", " ".repeat(pos - start_char));
    eprintln!("  {}", underline);
    let _ = io::stderr().flush();
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}
