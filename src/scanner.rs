//! Tokenizer for program text.
//!
//! The scanner is a forward-only producer: it reads the source one byte at a
//! time and hands out classified tokens. Everything that is not one of the
//! eight instruction symbols (whitespace, letters, digits, other punctuation,
//! non-ASCII bytes) is a comment and is skipped.

use std::fmt;
use std::io::{self, BufReader, Read};

/// A classified instruction symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// `>`
    MoveRight,
    /// `<`
    MoveLeft,
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[`
    LoopOpen,
    /// `]`
    LoopClose,
    /// The source is exhausted. Not produced by any character.
    End,
}

impl Token {
    /// Classify a single source byte. Returns `None` for comment bytes.
    pub fn from_byte(b: u8) -> Option<Token> {
        match b {
            b'>' => Some(Token::MoveRight),
            b'<' => Some(Token::MoveLeft),
            b'+' => Some(Token::Increment),
            b'-' => Some(Token::Decrement),
            b'.' => Some(Token::Output),
            b',' => Some(Token::Input),
            b'[' => Some(Token::LoopOpen),
            b']' => Some(Token::LoopClose),
            _ => None,
        }
    }

    /// The source character for this token; `End` has none.
    pub fn symbol(self) -> Option<char> {
        match self {
            Token::MoveRight => Some('>'),
            Token::MoveLeft => Some('<'),
            Token::Increment => Some('+'),
            Token::Decrement => Some('-'),
            Token::Output => Some('.'),
            Token::Input => Some(','),
            Token::LoopOpen => Some('['),
            Token::LoopClose => Some(']'),
            Token::End => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(c) => write!(f, "'{c}'"),
            None => write!(f, "end of input"),
        }
    }
}

/// Lazily turns a byte source into [`Token`]s.
pub struct Scanner<R> {
    bytes: io::Bytes<BufReader<R>>,
    // offset of the next unread byte
    pos: usize,
    // offset of the last instruction token handed out
    last: usize,
    done: bool,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
            pos: 0,
            last: 0,
            done: false,
        }
    }

    /// Return the next instruction token, or [`Token::End`] once the source
    /// is exhausted. `End` is sticky: every later call returns it again.
    pub fn next_token(&mut self) -> io::Result<Token> {
        if self.done {
            return Ok(Token::End);
        }

        loop {
            let Some(b) = self.bytes.next() else {
                self.done = true;
                return Ok(Token::End);
            };
            let b = b?;
            let at = self.pos;
            self.pos += 1;

            if let Some(tok) = Token::from_byte(b) {
                self.last = at;
                return Ok(tok);
            }
        }
    }

    /// Byte offset of the most recently returned instruction token.
    pub fn offset(&self) -> usize {
        self.last
    }
}

impl<'a> Scanner<&'a [u8]> {
    pub fn from_source(source: &'a str) -> Self {
        Scanner::new(source.as_bytes())
    }
}

impl<R: Read> Iterator for Scanner<R> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Token::End) => None,
            other => Some(other),
        }
    }
}
