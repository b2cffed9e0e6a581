use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,                // command name, argument, keyword
    Operator,            // | || && ; & and every redirection except <<
    String,              // quoted text, quotes removed
    Variable,            // $name or ${...}
    CommandSubstitution, // $( ... )
    Comment,             // # to end of line
    Heredoc,             // <<
    Pattern,             // * ? [
    Paren,               // ( )
    EndOfInput,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Word => "WORD",
            TokenKind::Operator => "OPERATOR",
            TokenKind::String => "STRING",
            TokenKind::Variable => "VARIABLE",
            TokenKind::CommandSubstitution => "COMMAND_SUB",
            TokenKind::Comment => "COMMENT",
            TokenKind::Heredoc => "HEREDOC",
            TokenKind::Pattern => "PATTERN",
            TokenKind::Paren => "PAREN",
            TokenKind::EndOfInput => "EOF",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: (usize, usize), // Position info [start, end), in chars
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: (usize, usize)) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] '{}'", self.kind.name(), self.text)
    }
}
