//! A run-length folding Brainfuck interpreter library.
//!
//! The pipeline runs one way: a [`Scanner`] turns program text into tokens,
//! the [`Builder`] folds repeated instructions and resolves every loop to a
//! direct jump index, and the [`Machine`] executes the resulting [`Program`]
//! against a tape of byte cells.
//!
//! Features and behaviors:
//! - Tape of 3,000 cells by default, initialized to 0, with 8-bit wrapping cells.
//! - Strict cursor bounds: moving outside the tape is an error.
//! - Input `,` reads one byte per repetition; exhausted input is an error.
//! - Any character outside `><+-.,[]` is a comment.
//! - Unbalanced brackets are reported before anything runs.
//!
//! Quick start:
//!
//! ```
//! use tapebf::interpret;
//!
//! let mut out = Vec::new();
//! let machine = interpret("----[---->+<]>++.", std::io::empty(), &mut out).unwrap();
//! assert_eq!(out, b"A");
//! assert_eq!(machine.tape().cursor(), 1);
//! ```

use std::io::{Read, Write};

pub mod builder;
pub mod cli_util;
pub mod commands;
pub mod config;
pub mod machine;
pub mod scanner;

pub use builder::{BuildError, Builder, Instruction, Op, Program};
pub use machine::{Machine, RunError, StepControl, TAPE_LEN, Tape};
pub use scanner::{Scanner, Token};

/// Any failure of the full build-and-run pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Build `source` and run it on a fresh default machine.
///
/// Output is written to `output` as it is produced, so a caller holding the
/// sink keeps everything printed before a run error.
pub fn interpret<R: Read, W: Write>(source: &str, input: R, output: W) -> Result<Machine, Error> {
    let program = builder::parse(source)?;
    let mut machine = Machine::new();
    machine.run(&program, input, output)?;
    Ok(machine)
}
