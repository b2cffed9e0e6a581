use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::executor::ExecError;
use crate::lexer::LexError;
use crate::parser::ParseError;

/// Any failure that ends the handling of one input line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Lexing error: {0}")]
    Lex(#[from] LexError),
    #[error("Parsing error: {0}")]
    Parse(#[from] ParseError),
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
