use crate::ast::{AstNode, CommandNode, Redirect, RedirectOp};
use crate::config::Limits;
use crate::lexer::{Token, TokenKind};
use crate::parser::heredoc::{self, HeredocSource};
use crate::parser::{ParseError, Parser};

static END_OF_INPUT: Token = Token {
    kind: TokenKind::EndOfInput,
    text: String::new(),
    span: (0, 0),
};

pub struct DefaultParser<'a> {
    tokens: Vec<&'a Token>,
    pos: usize,
    heredoc: &'a mut dyn HeredocSource,
    limits: Limits,
    // Keywords that end the innermost open compound command when they start a command.
    closers: Vec<&'static [&'static str]>,
}

impl<'a> DefaultParser<'a> {
    pub fn new(tokens: &'a [Token], heredoc: &'a mut dyn HeredocSource) -> Self {
        Self::with_limits(tokens, heredoc, Limits::default())
    }

    pub fn with_limits(tokens: &'a [Token], heredoc: &'a mut dyn HeredocSource, limits: Limits) -> Self {
        Self {
            tokens: tokens.iter().filter(|t| t.kind != TokenKind::Comment).collect(),
            pos: 0,
            heredoc,
            limits,
            closers: Vec::new(),
        }
    }

    fn peek(&self) -> &'a Token {
        self.tokens.get(self.pos).copied().unwrap_or(&END_OF_INPUT)
    }

    fn next(&mut self) -> &'a Token {
        let tok = self.peek();
        if tok.kind != TokenKind::EndOfInput {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::EndOfInput
    }

    fn consume_op(&mut self, op: &str) -> bool {
        if self.peek().is_operator(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_keyword(tok: &Token, kw: &str) -> bool {
        matches!(tok.kind, TokenKind::Word | TokenKind::Paren) && tok.text == kw
    }

    fn consume_keyword(&mut self, kw: &str) -> bool {
        if Self::is_keyword(self.peek(), kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        if self.consume_keyword(kw) {
            return Ok(());
        }
        Err(ParseError::ExpectedKeyword {
            expected: kw.to_string(),
            found: describe(self.peek()),
        })
    }

    fn expect_word(&mut self) -> Result<String, ParseError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Word => Ok(tok.text.clone()),
            TokenKind::EndOfInput => Err(ParseError::UnexpectedEof),
            _ => Err(ParseError::UnexpectedToken {
                found: tok.text.clone(),
                expected: vec!["word".to_string()],
                pos: tok.span.0,
            }),
        }
    }

    fn is_closer(&self, tok: &Token) -> bool {
        match self.closers.last() {
            Some(set) => matches!(tok.kind, TokenKind::Word | TokenKind::Paren) && set.contains(&tok.text.as_str()),
            None => false,
        }
    }

    fn at_list_end(&self) -> bool {
        let tok = self.peek();
        tok.kind == TokenKind::EndOfInput || self.is_closer(tok)
    }

    /// Consumes one argument: a word-like token plus every token touching it.
    fn take_word(&mut self) -> Option<String> {
        let first = self.peek();
        if !is_word_like(first) {
            return None;
        }
        self.pos += 1;
        let mut text = literal(first).to_string();
        let mut end = first.span.1;
        loop {
            let tok = self.peek();
            if !is_word_like(tok) || tok.span.0 != end {
                break;
            }
            self.pos += 1;
            text.push_str(literal(tok));
            end = tok.span.1;
        }
        Some(text)
    }
}

// Top-down recursive descent parser
impl<'a> Parser for DefaultParser<'a> {
    fn parse(&mut self) -> Result<AstNode, ParseError> {
        if self.at_eof() {
            return Err(ParseError::EmptyInput);
        }
        let node = self.parse_list()?;
        if !self.at_eof() {
            let tok = self.peek();
            return Err(ParseError::UnexpectedToken {
                found: tok.text.clone(),
                expected: [";", "&", "&&", "||", "|"].iter().map(|s| s.to_string()).collect(),
                pos: tok.span.0,
            });
        }
        tracing::debug!("parsed tree:\n{}", node);
        Ok(node)
    }
}

impl<'a> DefaultParser<'a> {
    fn parse_list(&mut self) -> Result<AstNode, ParseError> {
        let (mut node, mut backgrounded) = self.parse_list_item()?;
        loop {
            if self.at_list_end() {
                break;
            }
            if self.consume_op(";") {
                if self.at_list_end() {
                    break;
                }
            } else if !backgrounded {
                break;
            }
            // Either after `;` or the remainder of a line following `&`.
            let (rhs, bg) = self.parse_list_item()?;
            backgrounded = bg;
            node = AstNode::Sequence(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_list_item(&mut self) -> Result<(AstNode, bool), ParseError> {
        let node = self.parse_and_or()?;
        if self.consume_op("&") {
            return Ok((AstNode::Background(Box::new(node)), true));
        }
        Ok((node, false))
    }

    fn parse_and_or(&mut self) -> Result<AstNode, ParseError> {
        let left = self.parse_pipeline()?;
        if self.consume_op("&&") {
            let right = self.parse_and_or()?;
            return Ok(AstNode::And(Box::new(left), Box::new(right)));
        }
        if self.consume_op("||") {
            let right = self.parse_and_or()?;
            return Ok(AstNode::Or(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_pipeline(&mut self) -> Result<AstNode, ParseError> {
        let mut node = self.parse_command_like()?;
        while self.consume_op("|") {
            let rhs = self.parse_command_like()?;
            node = AstNode::Pipe(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    // build "pipe elements" such as commands, groups and loops
    fn parse_command_like(&mut self) -> Result<AstNode, ParseError> {
        let tok = self.peek();
        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Paren, "(") => {
                self.pos += 1;
                let body = self.parse_block(&[")"])?;
                self.expect_keyword(")")?;
                Ok(AstNode::Subshell(Box::new(body)))
            }
            (TokenKind::Word, "{") => {
                self.pos += 1;
                let body = self.parse_block(&["}"])?;
                self.expect_keyword("}")?;
                Ok(AstNode::Group(Box::new(body)))
            }
            (TokenKind::Word, "if") => self.parse_if(),
            (TokenKind::Word, "for") => self.parse_for(),
            (TokenKind::Word, "while") => self.parse_while(),
            _ => self.parse_simple(),
        }
    }

    fn parse_block(&mut self, closers: &'static [&'static str]) -> Result<AstNode, ParseError> {
        self.closers.push(closers);
        let result = self.parse_list();
        self.closers.pop();
        result
    }

    fn parse_if(&mut self) -> Result<AstNode, ParseError> {
        self.pos += 1;
        let condition = self.parse_block(&["then"])?;
        self.expect_keyword("then")?;
        let then_branch = self.parse_block(&["else", "fi"])?;
        let else_branch = if self.consume_keyword("else") {
            Some(Box::new(self.parse_block(&["fi"])?))
        } else {
            None
        };
        self.expect_keyword("fi")?;
        Ok(AstNode::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn parse_for(&mut self) -> Result<AstNode, ParseError> {
        self.pos += 1;
        let var = self.expect_word()?;
        self.expect_keyword("in")?;
        let mut words = Vec::new();
        loop {
            if self.consume_op(";") || Self::is_keyword(self.peek(), "do") {
                break;
            }
            match self.take_word() {
                Some(word) => words.push(word),
                None => {
                    return Err(ParseError::ExpectedKeyword {
                        expected: "do".to_string(),
                        found: describe(self.peek()),
                    });
                }
            }
        }
        self.expect_keyword("do")?;
        let body = self.parse_block(&["done"])?;
        self.expect_keyword("done")?;
        Ok(AstNode::For {
            var,
            words,
            body: Box::new(body),
        })
    }

    fn parse_while(&mut self) -> Result<AstNode, ParseError> {
        self.pos += 1;
        let condition = self.parse_block(&["do"])?;
        self.expect_keyword("do")?;
        let body = self.parse_block(&["done"])?;
        self.expect_keyword("done")?;
        Ok(AstNode::While {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    fn parse_simple(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek();
        let mut cmd = CommandNode::default();

        loop {
            let tok = self.peek();
            if is_word_like(tok) {
                // Keywords only close a compound in command position; `echo fi` is two words.
                if cmd.args.is_empty() && self.is_closer(tok) {
                    break;
                }
                if cmd.args.len() >= self.limits.max_args {
                    return Err(ParseError::TooManyArgs {
                        max: self.limits.max_args,
                    });
                }
                if let Some(word) = self.take_word() {
                    cmd.args.push(word);
                }
                continue;
            }
            if matches!(tok.kind, TokenKind::Operator | TokenKind::Heredoc) && Redirect::split_operator(&tok.text).is_some() {
                self.parse_redirect(&mut cmd)?;
                continue;
            }
            break;
        }

        if cmd.args.is_empty() {
            if start.kind == TokenKind::EndOfInput {
                return Err(ParseError::UnexpectedEof);
            }
            return Err(ParseError::ExpectedCommand {
                found: start.text.clone(),
                pos: start.span.0,
            });
        }
        Ok(AstNode::Simple(cmd))
    }

    fn parse_redirect(&mut self, cmd: &mut CommandNode) -> Result<(), ParseError> {
        let op_tok = self.next();
        let Some((fd, op, inline_target)) = Redirect::split_operator(&op_tok.text) else {
            return Err(ParseError::UnexpectedToken {
                found: op_tok.text.clone(),
                expected: vec!["redirection".to_string()],
                pos: op_tok.span.0,
            });
        };

        if op == RedirectOp::Heredoc {
            let delimiter = self
                .take_word()
                .ok_or(ParseError::MissingHeredocDelimiter { pos: op_tok.span.0 })?;
            let body = heredoc::read_body(&mut *self.heredoc, &delimiter, self.limits.max_heredoc_bytes)?;
            cmd.redirects.push(Redirect::new(fd, op, delimiter));
            cmd.heredoc_body = Some(body);
            return Ok(());
        }

        let target = match inline_target {
            Some(target) => target,
            None => match self.take_word() {
                Some(target) => target,
                None => {
                    // Only this redirect is dropped; the command itself still parses.
                    eprintln!("mongsh: syntax error: missing filename after '{}'", op_tok.text);
                    tracing::warn!(op = %op_tok.text, pos = op_tok.span.0, "dropping redirect without target");
                    return Ok(());
                }
            },
        };
        cmd.redirects.push(Redirect::new(fd, op, target));
        Ok(())
    }
}

fn is_word_like(tok: &Token) -> bool {
    matches!(
        tok.kind,
        TokenKind::Word | TokenKind::String | TokenKind::Variable | TokenKind::Pattern | TokenKind::CommandSubstitution
    )
}

/// Argument text of a word-like token. `\;` stands for a literal `;`.
fn literal(tok: &Token) -> &str {
    if tok.kind == TokenKind::Word && tok.text == "\\;" {
        ";"
    } else {
        &tok.text
    }
}

fn describe(tok: &Token) -> String {
    if tok.kind == TokenKind::EndOfInput {
        "end of input".to_string()
    } else {
        tok.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::LineSource;

    #[test]
    fn test_heredoc_body_is_collected() {
        let tokens = Lexer::new("cat <<EOF | wc -l").tokenize().unwrap();
        let mut source = LineSource::new(["alpha", "beta", "EOF"]);
        let ast = DefaultParser::new(&tokens, &mut source).parse().unwrap();

        let mut cat = CommandNode::new(vec!["cat".into()]);
        cat.redirects.push(Redirect::new(None, RedirectOp::Heredoc, "EOF"));
        cat.heredoc_body = Some("alpha\nbeta\n".to_string());
        assert_eq!(
            ast,
            AstNode::Pipe(Box::new(AstNode::Simple(cat)), Box::new(AstNode::simple(&["wc", "-l"])))
        );
    }

    #[test]
    fn test_heredoc_missing_terminator() {
        let tokens = Lexer::new("cat <<END").tokenize().unwrap();
        let mut source = LineSource::new(["only line"]);
        let err = DefaultParser::new(&tokens, &mut source).parse().unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedHeredoc { delimiter } if delimiter == "END"));
    }

    #[test]
    fn test_escaped_semicolon_is_literal() {
        let tokens = Lexer::new(r"find . -exec rm {} \;").tokenize().unwrap();
        let mut source = LineSource::empty();
        let ast = DefaultParser::new(&tokens, &mut source).parse().unwrap();
        assert_eq!(ast, AstNode::simple(&["find", ".", "-exec", "rm", "{}", ";"]));
    }

    #[test]
    fn test_too_many_args() {
        let tokens = Lexer::new("echo a b c").tokenize().unwrap();
        let mut source = LineSource::empty();
        let limits = Limits {
            max_args: 3,
            ..Limits::default()
        };
        let err = DefaultParser::with_limits(&tokens, &mut source, limits).parse().unwrap_err();
        assert!(matches!(err, ParseError::TooManyArgs { max: 3 }));
    }

    #[test]
    fn test_closer_only_inside_compound() {
        let tokens = Lexer::new("echo done fi").tokenize().unwrap();
        let mut source = LineSource::empty();
        let ast = DefaultParser::new(&tokens, &mut source).parse().unwrap();
        assert_eq!(ast, AstNode::simple(&["echo", "done", "fi"]));
    }

    #[test]
    fn test_background_inside_group() {
        let tokens = Lexer::new("{ sleep 1 & }").tokenize().unwrap();
        let mut source = LineSource::empty();
        let ast = DefaultParser::new(&tokens, &mut source).parse().unwrap();
        assert_eq!(
            ast,
            AstNode::Group(Box::new(AstNode::Background(Box::new(AstNode::simple(&["sleep", "1"])))))
        );
    }
}
