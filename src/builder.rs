//! Turns a token stream into a flat, jump-resolved [`Program`].
//!
//! Consecutive identical non-bracket tokens are folded into one
//! [`Instruction::Run`] carrying a repeat count. Brackets are never folded;
//! each `[` is pushed on a resolution stack as it is emitted and back-patched
//! with the index of its `]` once that is seen, so every loop jump is a
//! direct index at run time.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use log::debug;

use crate::scanner::{Scanner, Token};

/// The six foldable instruction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    MoveRight,
    MoveLeft,
    Increment,
    Decrement,
    Output,
    Input,
}

impl Op {
    pub fn from_token(tok: Token) -> Option<Op> {
        match tok {
            Token::MoveRight => Some(Op::MoveRight),
            Token::MoveLeft => Some(Op::MoveLeft),
            Token::Increment => Some(Op::Increment),
            Token::Decrement => Some(Op::Decrement),
            Token::Output => Some(Op::Output),
            Token::Input => Some(Op::Input),
            Token::LoopOpen | Token::LoopClose | Token::End => None,
        }
    }

    pub fn token(self) -> Token {
        match self {
            Op::MoveRight => Token::MoveRight,
            Op::MoveLeft => Token::MoveLeft,
            Op::Increment => Token::Increment,
            Op::Decrement => Token::Decrement,
            Op::Output => Token::Output,
            Op::Input => Token::Input,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Op::MoveRight => '>',
            Op::MoveLeft => '<',
            Op::Increment => '+',
            Op::Decrement => '-',
            Op::Output => '.',
            Op::Input => ',',
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One resolved instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `op` applied `count` times (`count >= 1`).
    Run { op: Op, count: usize },
    /// `[`; `close` is the index of the matching `]`.
    LoopOpen { close: usize },
    /// `]`; `open` is the index of the matching `[`.
    LoopClose { open: usize },
}

impl Instruction {
    pub fn kind(&self) -> Token {
        match self {
            Instruction::Run { op, .. } => op.token(),
            Instruction::LoopOpen { .. } => Token::LoopOpen,
            Instruction::LoopClose { .. } => Token::LoopClose,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Run { op, count } => write!(f, "{op}  x{count}"),
            Instruction::LoopOpen { close } => write!(f, "[  -> {close}"),
            Instruction::LoopClose { open } => write!(f, "]  -> {open}"),
        }
    }
}

/// Errors raised while building a [`Program`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A `]` was scanned with no `[` pending.
    #[error("unmatched ']' at offset {offset}")]
    UnbalancedLoop { offset: usize },

    /// The source ended with at least one `[` still open.
    #[error("unterminated '[' at offset {offset}")]
    UnterminatedLoop { offset: usize },

    /// Reading the program text failed.
    #[error("failed to read program text: {0}")]
    Io(#[from] io::Error),
}

/// An immutable, 0-indexed instruction sequence with resolved loop targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    // source offset of the first token folded into each instruction
    offsets: Vec<usize>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, ip: usize) -> Option<&Instruction> {
        self.instructions.get(ip)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Source offset of the instruction at `ip`, for diagnostics.
    pub fn offset_of(&self, ip: usize) -> Option<usize> {
        self.offsets.get(ip).copied()
    }

    /// The same program with every fold undone: each `Run` of `count` becomes
    /// `count` single-step runs and loop targets are remapped accordingly.
    pub fn expanded(&self) -> Program {
        let mut starts = Vec::with_capacity(self.len());
        let mut total = 0;
        for ins in &self.instructions {
            starts.push(total);
            total += match ins {
                Instruction::Run { count, .. } => *count,
                _ => 1,
            };
        }

        let mut instructions = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(total);
        for (ins, &offset) in self.instructions.iter().zip(&self.offsets) {
            match *ins {
                Instruction::Run { op, count } => {
                    for _ in 0..count {
                        instructions.push(Instruction::Run { op, count: 1 });
                        offsets.push(offset);
                    }
                }
                Instruction::LoopOpen { close } => {
                    instructions.push(Instruction::LoopOpen { close: starts[close] });
                    offsets.push(offset);
                }
                Instruction::LoopClose { open } => {
                    instructions.push(Instruction::LoopClose { open: starts[open] });
                    offsets.push(offset);
                }
            }
        }

        Program { instructions, offsets }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Renders the instruction listing, one instruction per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ip, ins) in self.instructions.iter().enumerate() {
            writeln!(f, "{ip:>5}  {ins}")?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = BuildError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        parse(source)
    }
}

/// Folding, jump-resolving program builder.
///
/// Holds at most one token of lookahead so the scanner never has to support
/// unreading.
pub struct Builder<R> {
    scanner: Scanner<R>,
    pushback: Option<(Token, usize)>,
    instructions: Vec<Instruction>,
    offsets: Vec<usize>,
    open_loops: Vec<usize>,
}

impl<R: Read> Builder<R> {
    pub fn new(scanner: Scanner<R>) -> Self {
        Self {
            scanner,
            pushback: None,
            instructions: Vec::new(),
            offsets: Vec::new(),
            open_loops: Vec::new(),
        }
    }

    /// Consume the whole token stream. No partial program is returned on error.
    pub fn build(mut self) -> Result<Program, BuildError> {
        loop {
            let (tok, offset) = self.read()?;

            if let Some(op) = Op::from_token(tok) {
                let count = self.fold(tok)?;
                self.emit(Instruction::Run { op, count }, offset);
                continue;
            }

            match tok {
                Token::LoopOpen => {
                    // close target is back-patched when the matching ']' arrives
                    let open = self.emit(Instruction::LoopOpen { close: 0 }, offset);
                    self.open_loops.push(open);
                }
                Token::LoopClose => {
                    let Some(open) = self.open_loops.pop() else {
                        return Err(BuildError::UnbalancedLoop { offset });
                    };
                    let close = self.emit(Instruction::LoopClose { open }, offset);
                    self.instructions[open] = Instruction::LoopOpen { close };
                }
                // only Token::End is left
                _ => break,
            }
        }

        if let Some(&open) = self.open_loops.last() {
            return Err(BuildError::UnterminatedLoop {
                offset: self.offsets[open],
            });
        }

        debug!("built program with {} instructions", self.instructions.len());
        Ok(Program {
            instructions: self.instructions,
            offsets: self.offsets,
        })
    }

    fn read(&mut self) -> io::Result<(Token, usize)> {
        if let Some(buffered) = self.pushback.take() {
            return Ok(buffered);
        }
        let tok = self.scanner.next_token()?;
        Ok((tok, self.scanner.offset()))
    }

    fn unread(&mut self, tok: (Token, usize)) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(tok);
    }

    /// Count `first` plus every immediately following token of the same kind.
    fn fold(&mut self, first: Token) -> io::Result<usize> {
        let mut count = 1;
        loop {
            let next = self.read()?;
            if next.0 != first {
                self.unread(next);
                return Ok(count);
            }
            count += 1;
        }
    }

    fn emit(&mut self, ins: Instruction, offset: usize) -> usize {
        self.instructions.push(ins);
        self.offsets.push(offset);
        self.instructions.len() - 1
    }
}

pub fn build<R: Read>(scanner: Scanner<R>) -> Result<Program, BuildError> {
    Builder::new(scanner).build()
}

pub fn parse(source: &str) -> Result<Program, BuildError> {
    build(Scanner::from_source(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(program: &Program) -> Vec<usize> {
        program
            .iter()
            .filter_map(|ins| match ins {
                Instruction::Run { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn folds_runs_and_moves_break_folds() {
        let program = parse("+>>>+++++++>>+++--<<").unwrap();
        assert_eq!(counts(&program), vec![1, 3, 7, 2, 3, 2, 2]);
        assert_eq!(
            program.instructions()[..2],
            [
                Instruction::Run { op: Op::Increment, count: 1 },
                Instruction::Run { op: Op::MoveRight, count: 3 },
            ]
        );
    }

    #[test]
    fn folds_across_whitespace_and_comments() {
        let program = parse("+++++ -- [-]").unwrap();
        assert_eq!(
            program.instructions(),
            &[
                Instruction::Run { op: Op::Increment, count: 5 },
                Instruction::Run { op: Op::Decrement, count: 2 },
                Instruction::LoopOpen { close: 4 },
                Instruction::Run { op: Op::Decrement, count: 1 },
                Instruction::LoopClose { open: 2 },
            ]
        );
    }

    #[test]
    fn brackets_break_folds_and_are_never_folded() {
        let program = parse("++[[++]]++").unwrap();
        let kinds: Vec<Token> = program.iter().map(Instruction::kind).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Increment,
                Token::LoopOpen,
                Token::LoopOpen,
                Token::Increment,
                Token::LoopClose,
                Token::LoopClose,
                Token::Increment,
            ]
        );
        assert_eq!(counts(&program), vec![2, 2, 2]);
    }

    #[test]
    fn nested_loops_resolve_to_their_own_partner() {
        let program = parse("-[--[+]--]").unwrap();
        assert_eq!(program.get(1), Some(&Instruction::LoopOpen { close: 7 }));
        assert_eq!(program.get(7), Some(&Instruction::LoopClose { open: 1 }));
        assert_eq!(program.get(3), Some(&Instruction::LoopOpen { close: 5 }));
        assert_eq!(program.get(5), Some(&Instruction::LoopClose { open: 3 }));
    }

    #[test]
    fn stray_close_is_unbalanced() {
        let err = parse("+ ]").unwrap_err();
        assert!(matches!(err, BuildError::UnbalancedLoop { offset: 2 }));
    }

    #[test]
    fn close_after_balanced_pair_is_unbalanced() {
        assert!(matches!(parse("[]]"), Err(BuildError::UnbalancedLoop { offset: 2 })));
    }

    #[test]
    fn unclosed_open_is_unterminated() {
        let err = parse("[+[-]").unwrap_err();
        assert!(matches!(err, BuildError::UnterminatedLoop { offset: 0 }));
        assert!(matches!(parse("+[[]"), Err(BuildError::UnterminatedLoop { offset: 1 })));
    }

    #[test]
    fn empty_source_builds_empty_program() {
        let program = parse("just a comment").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn offsets_point_at_first_folded_token() {
        let program = parse("x ++ >").unwrap();
        assert_eq!(program.offset_of(0), Some(2));
        assert_eq!(program.offset_of(1), Some(5));
        assert_eq!(program.offset_of(2), None);
    }

    #[test]
    fn expanded_undoes_folds_and_remaps_jumps() {
        let program: Program = "++[->+++<]".parse().unwrap();
        let flat = program.expanded();
        assert_eq!(flat.len(), 10);
        assert_eq!(flat.get(2), Some(&Instruction::LoopOpen { close: 9 }));
        assert_eq!(flat.get(9), Some(&Instruction::LoopClose { open: 2 }));
        assert!(
            flat.iter()
                .all(|ins| !matches!(ins, Instruction::Run { count, .. } if *count != 1))
        );
    }

    #[test]
    fn listing_shows_counts_and_targets() {
        let program = parse("+++[>]").unwrap();
        let listing = program.to_string();
        assert_eq!(
            listing,
            "    0  +  x3\n    1  [  -> 3\n    2  >  x1\n    3  ]  -> 1\n"
        );
    }
}
