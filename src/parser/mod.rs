pub mod default;
pub mod heredoc;

use std::io;

use thiserror::Error;

use crate::ast::AstNode;

pub use default::DefaultParser;
pub use heredoc::{HeredocSource, LineSource};

pub trait Parser {
    fn parse(&mut self) -> Result<AstNode, ParseError>;
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token '{found}' at position {pos}. Expected: {expected:?}")]
    UnexpectedToken {
        found: String,
        expected: Vec<String>,
        pos: usize,
    },
    #[error("Expected a command but found '{found}' at position {pos}")]
    ExpectedCommand { found: String, pos: usize },
    #[error("Expected '{expected}' but found '{found}'")]
    ExpectedKeyword { expected: String, found: String },
    #[error("Missing heredoc delimiter at position {pos}")]
    MissingHeredocDelimiter { pos: usize },
    #[error("Heredoc ended before delimiter '{delimiter}'")]
    UnterminatedHeredoc { delimiter: String },
    #[error("Heredoc body exceeds {max} bytes")]
    HeredocTooLarge { max: usize },
    #[error("Too many arguments (limit is {max})")]
    TooManyArgs { max: usize },
    #[error("Failed to read heredoc: {0}")]
    Io(#[from] io::Error),
}
