pub mod lexer;
pub mod state;
pub mod token;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};

use crate::config::Limits;

/// Tokenizes one line with the given limits.
pub fn tokenize(line: &str, limits: &Limits) -> Result<Vec<Token>, LexError> {
    Lexer::with_limits(line, limits.clone()).tokenize()
}
