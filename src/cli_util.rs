use std::fs;
use std::io::{self, IsTerminal, Read, Write};

use nu_ansi_term::Color;

use crate::{CompileError, Program, RuntimeError, SupervisedError};

/// Where the `run` and `dump` commands take their code from: `--file`, the
/// positional parts, or piped stdin. `Err` carries the exit code; 2 means
/// the caller should show usage.
pub fn load_source(program: &str, file: Option<&str>, code: &[String]) -> Result<String, i32> {
    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        let _ = io::stderr().flush();
        return Err(2);
    }

    if let Some(path) = file {
        return fs::read_to_string(path).map_err(|e| {
            eprintln!("{program}: failed to read code file as UTF-8: {e}");
            let _ = io::stderr().flush();
            1
        });
    }

    if !code.is_empty() {
        return Ok(code.join(""));
    }

    // Nothing given and nothing piped in
    if io::stdin().is_terminal() {
        return Err(2);
    }

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{program}: failed reading UTF-8 from stdin: {e}");
        let _ = io::stderr().flush();
        return Err(1);
    }
    Ok(buf)
}

/// Pretty-print a compile error with caret positioning.
pub fn print_compile_error(program: Option<&str>, code: &str, err: &CompileError) {
    match err {
        CompileError::UnmatchedBracket { offset, kind, .. } => {
            let msg = prefix_program(program, &format!("Parse error: unmatched bracket {kind}"));
            print_error_with_context(&msg, code, *offset);
        }
    }
}

/// Pretty-print a runtime error, mapping the failing instruction back to its
/// source character.
pub fn print_runtime_error(program: Option<&str>, code: &str, compiled: &Program, err: &RuntimeError) {
    let (detail, ip) = match err {
        RuntimeError::TapeUnderflow { ip, pointer } => {
            (format!("Runtime error: tape underflow (ptr={pointer}, op='<')"), *ip)
        }
        RuntimeError::TapeOverflow { ip, pointer } => {
            (format!("Runtime error: tape overflow (ptr={pointer}, op='>')"), *ip)
        }
        RuntimeError::InputUnsupported { ip } => {
            ("Runtime error: input (',') is not supported".to_string(), *ip)
        }
        RuntimeError::InvalidJumpTarget { ip, target } => {
            (format!("Runtime error: invalid jump target {target}"), *ip)
        }
        RuntimeError::ZeroCapacity => {
            eprintln!("{} {}", error_label(), prefix_program(program, &err.to_string()));
            let _ = io::stderr().flush();
            return;
        }
    };

    let msg = prefix_program(program, &detail);
    match compiled.source_offset(ip) {
        Some(offset) => print_error_with_context(&msg, code, offset),
        None => {
            eprintln!("{} {msg} at instruction {ip}", error_label());
            let _ = io::stderr().flush();
        }
    }
}

pub fn print_supervised_error(program: Option<&str>, code: &str, compiled: &Program, err: &SupervisedError) {
    match err {
        SupervisedError::Runtime(inner) => print_runtime_error(program, code, compiled, inner),
        SupervisedError::StepLimitExceeded { .. }
        | SupervisedError::Canceled
        | SupervisedError::OutputFailed(_) => {
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

/// "error:" in bold red when stderr is a terminal, plain otherwise.
fn error_label() -> String {
    if io::stderr().is_terminal() {
        Color::Red.bold().paint("error:").to_string()
    } else {
        "error:".to_string()
    }
}

/// Print a concise error with the source position and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{} {prefix} at source offset {pos}", error_label());

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    // Newlines would break the caret alignment.
    let slice: String = code
        .chars()
        .skip(start_char)
        .take(end_char.saturating_sub(start_char))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    eprintln!("  {slice}");

    let caret_offset_chars = pos.saturating_sub(start_char);
    let caret = format!("{}^", " ".repeat(caret_offset_chars));
    if io::stderr().is_terminal() {
        eprintln!("  {}", Color::Red.bold().paint(caret));
    } else {
        eprintln!("  {caret}");
    }
    let _ = io::stderr().flush();
}
