pub mod fold;
pub mod run;

use std::fs;
use std::io::{self, Write};

/// Program text from `--file` or from the concatenated positional parts.
/// On failure the caller should exit with the returned status.
fn load_source(program: &str, file: Option<String>, code: Vec<String>) -> Result<String, i32> {
    match file {
        Some(path) => fs::read_to_string(&path).map_err(|e| {
            eprintln!("{program}: failed to read code file as UTF-8: {e}");
            let _ = io::stderr().flush();
            1
        }),
        None => Ok(code.join("")),
    }
}
