use thiserror::Error;

use super::state::{LexState, StateStack};
use super::token::{Token, TokenKind};
use crate::config::Limits;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LexError {
    #[error("Unterminated quote '{0}' starting at position {1}")]
    UnterminatedQuote(char, usize),
    #[error("Unterminated variable expansion starting at position {0}")]
    UnterminatedVariable(usize),
    #[error("Unterminated command substitution starting at position {0}")]
    UnterminatedSubstitution(usize),
    #[error("Missing heredoc delimiter after '<<' at position {0}")]
    MissingHeredocDelimiter(usize),
    #[error("Dangling escape character at position {0}")]
    TrailingEscape(usize),
    #[error("Too many tokens (limit is {0})")]
    TooManyTokens(usize),
    #[error("Token at position {pos} is longer than {max} characters")]
    TokenTooLong { pos: usize, max: usize },
    #[error("Lexical nesting deeper than {0} levels")]
    NestingTooDeep(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordMode {
    /// Ends at whitespace, operators, quotes, parens and `$` substitutions.
    Plain,
    /// Started with `-`: parens and `$` stay part of the word.
    Dash,
}

/// State-machine tokenizer for one input line.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    limits: Limits,
    state: LexState,
    stack: StateStack,
    tokens: Vec<Token>,
    // Literal text of the word or quoted string being built.
    buf: String,
    buf_start: usize,
    word_mode: WordMode,
    // Start of the construct that is currently open, for error reporting.
    open_at: usize,
    quote_open: usize,
    // Span start override for the first token emitted inside double quotes.
    pending_start: Option<usize>,
    quote_emitted: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self::with_limits(input, Limits::default())
    }

    pub fn with_limits(input: &str, limits: Limits) -> Self {
        let stack = StateStack::new(limits.max_state_depth);
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            limits,
            state: LexState::Normal,
            stack,
            tokens: Vec::new(),
            buf: String::new(),
            buf_start: 0,
            word_mode: WordMode::Plain,
            open_at: 0,
            quote_open: 0,
            pending_start: None,
            quote_emitted: false,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        self.reset();

        while self.pos < self.chars.len() {
            match self.state {
                LexState::Normal => self.lex_normal()?,
                LexState::Escape => self.lex_escape()?,
                LexState::SingleQuote => self.lex_single_quote()?,
                LexState::DoubleQuote => self.lex_double_quote()?,
                LexState::Comment => self.lex_comment()?,
                LexState::VariableExpand => self.lex_variable()?,
                LexState::CommandSubstitution => self.lex_command_substitution()?,
                LexState::Heredoc => self.lex_heredoc()?,
            }
        }

        match self.state {
            LexState::Normal => {}
            // A dangling backslash inside double quotes leaves the quote open.
            LexState::Escape if self.stack.top() == Some(LexState::DoubleQuote) => {
                return Err(LexError::UnterminatedQuote('"', self.quote_open));
            }
            LexState::Escape => return Err(LexError::TrailingEscape(self.open_at)),
            LexState::SingleQuote => return Err(LexError::UnterminatedQuote('\'', self.open_at)),
            LexState::DoubleQuote => return Err(LexError::UnterminatedQuote('"', self.quote_open)),
            LexState::VariableExpand => return Err(LexError::UnterminatedVariable(self.open_at)),
            LexState::CommandSubstitution => return Err(LexError::UnterminatedSubstitution(self.open_at)),
            LexState::Heredoc => return Err(LexError::MissingHeredocDelimiter(self.open_at)),
            // Handlers always finish a comment before returning.
            LexState::Comment => {}
        }
        self.flush_word()?;

        let end = self.chars.len();
        self.tokens.push(Token::new(TokenKind::EndOfInput, "", (end, end)));
        tracing::trace!(count = self.tokens.len(), "tokenized line");
        Ok(std::mem::take(&mut self.tokens))
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.state = LexState::Normal;
        self.stack = StateStack::new(self.limits.max_state_depth);
        self.tokens.clear();
        self.buf.clear();
        self.pending_start = None;
        self.quote_emitted = false;
    }

    // ---- Normal ----

    fn lex_normal(&mut self) -> Result<(), LexError> {
        if !self.buf.is_empty() {
            // Back from an escape in the middle of a word.
            return self.continue_word();
        }

        let ch = self.chars[self.pos];
        let next = self.peek_at(self.pos + 1);

        if ch.is_whitespace() {
            self.pos += 1;
            return Ok(());
        }
        if ch == '#' {
            return self.enter(LexState::Comment);
        }
        if (ch == '\\' && next == Some(';')) || (ch == '{' && next == Some('}')) {
            let text = self.slice(self.pos, self.pos + 2);
            self.emit(TokenKind::Word, text, (self.pos, self.pos + 2))?;
            self.pos += 2;
            return Ok(());
        }
        if ch == '\\' {
            self.buf_start = self.pos;
            self.word_mode = WordMode::Plain;
            return self.begin_escape();
        }
        if ch == '\'' {
            return self.enter(LexState::SingleQuote);
        }
        if ch == '"' {
            return self.begin_double_quote();
        }
        if let Some(state) = self.substitution_at(self.pos) {
            return self.enter(state);
        }

        let op_len = self.operator_len(self.pos);
        if op_len > 0 {
            let start = self.pos;
            let text = self.slice(start, start + op_len);
            self.pos += op_len;
            if text == "<<" {
                self.emit(TokenKind::Heredoc, text, (start, self.pos))?;
                self.open_at = start;
                return self.enter(LexState::Heredoc);
            }
            return self.emit(TokenKind::Operator, text, (start, self.pos));
        }

        match ch {
            '(' | ')' => {
                self.emit(TokenKind::Paren, ch.to_string(), (self.pos, self.pos + 1))?;
                self.pos += 1;
                Ok(())
            }
            '[' => {
                let at_word_start = self.pos == 0 || self.chars[self.pos - 1].is_whitespace();
                let kind = if at_word_start { TokenKind::Word } else { TokenKind::Pattern };
                self.emit(kind, "[".to_string(), (self.pos, self.pos + 1))?;
                self.pos += 1;
                Ok(())
            }
            '*' | '?' => {
                self.emit(TokenKind::Pattern, ch.to_string(), (self.pos, self.pos + 1))?;
                self.pos += 1;
                Ok(())
            }
            _ => {
                self.buf_start = self.pos;
                self.word_mode = if ch == '-' { WordMode::Dash } else { WordMode::Plain };
                if ch == '-' {
                    self.buf.push(ch);
                    self.pos += 1;
                }
                self.continue_word()
            }
        }
    }

    fn continue_word(&mut self) -> Result<(), LexError> {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            if ch.is_whitespace() || self.operator_len(self.pos) > 0 {
                break;
            }
            if ch == '\\' {
                return self.begin_escape();
            }
            if ch == '\'' || ch == '"' {
                break;
            }
            if self.word_mode == WordMode::Plain {
                if ch == '(' || ch == ')' {
                    break;
                }
                if let Some(state) = self.substitution_at(self.pos) {
                    self.flush_word()?;
                    return self.enter(state);
                }
            }
            self.buf.push(ch);
            self.pos += 1;
        }
        self.flush_word()
    }

    fn flush_word(&mut self) -> Result<(), LexError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.buf);
        self.emit(TokenKind::Word, text, (self.buf_start, self.pos))
    }

    // ---- Escape ----

    fn begin_escape(&mut self) -> Result<(), LexError> {
        self.open_at = self.pos;
        self.pos += 1;
        self.enter(LexState::Escape)
    }

    fn lex_escape(&mut self) -> Result<(), LexError> {
        let ch = self.chars[self.pos];
        let outer = self.stack.pop();
        if outer == LexState::DoubleQuote {
            // Inside double quotes only these characters lose their backslash.
            if !matches!(ch, '$' | '`' | '"' | '\\') {
                self.push_literal('\\', self.pos - 1);
            }
            self.push_literal(ch, self.pos - 1);
        } else {
            self.buf.push(ch);
        }
        self.pos += 1;
        self.state = outer;
        Ok(())
    }

    // ---- Quotes ----

    fn lex_single_quote(&mut self) -> Result<(), LexError> {
        let open = self.pos;
        self.open_at = open;
        match self.find(open + 1, '\'') {
            Some(close) => {
                let text = self.slice(open + 1, close);
                self.emit(TokenKind::String, text, (open, close + 1))?;
                self.pos = close + 1;
                self.state = self.stack.pop();
            }
            None => self.pos = self.chars.len(),
        }
        Ok(())
    }

    fn begin_double_quote(&mut self) -> Result<(), LexError> {
        self.quote_open = self.pos;
        self.pending_start = Some(self.pos);
        self.quote_emitted = false;
        self.buf.clear();
        self.pos += 1;
        self.enter(LexState::DoubleQuote)
    }

    fn lex_double_quote(&mut self) -> Result<(), LexError> {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            match ch {
                '"' => {
                    if !self.buf.is_empty() || !self.quote_emitted {
                        let text = std::mem::take(&mut self.buf);
                        let start = if text.is_empty() { self.pos } else { self.buf_start };
                        self.emit(TokenKind::String, text, (start, self.pos + 1))?;
                    } else if let Some(last) = self.tokens.last_mut() {
                        // Closing quote right after a substitution belongs to it.
                        last.span.1 = self.pos + 1;
                    }
                    self.pos += 1;
                    self.state = self.stack.pop();
                    return Ok(());
                }
                '\\' => return self.begin_escape(),
                '$' => {
                    if let Some(state) = self.substitution_at(self.pos) {
                        self.flush_string_part()?;
                        return self.enter(state);
                    }
                    self.push_literal(ch, self.pos);
                    self.pos += 1;
                }
                _ => {
                    self.push_literal(ch, self.pos);
                    self.pos += 1;
                }
            }
        }
        Ok(())
    }

    fn flush_string_part(&mut self) -> Result<(), LexError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.buf);
        self.emit(TokenKind::String, text, (self.buf_start, self.pos))
    }

    fn push_literal(&mut self, ch: char, at: usize) {
        if self.buf.is_empty() {
            self.buf_start = at;
        }
        self.buf.push(ch);
    }

    // ---- Comment ----

    fn lex_comment(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        while self.pos < self.chars.len() && !matches!(self.chars[self.pos], '\n' | '\r') {
            self.pos += 1;
        }
        let text = self.slice(start, self.pos);
        self.emit(TokenKind::Comment, text, (start, self.pos))?;
        self.state = self.stack.pop();
        Ok(())
    }

    // ---- Substitutions ----

    fn substitution_at(&self, pos: usize) -> Option<LexState> {
        if self.chars.get(pos) != Some(&'$') {
            return None;
        }
        match self.peek_at(pos + 1) {
            Some('(') => Some(LexState::CommandSubstitution),
            Some('{') => Some(LexState::VariableExpand),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => Some(LexState::VariableExpand),
            _ => None,
        }
    }

    fn lex_variable(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.open_at = start;
        if self.peek_at(start + 1) == Some('{') {
            match self.find(start + 2, '}') {
                Some(close) => self.pos = close + 1,
                None => {
                    self.pos = self.chars.len();
                    return Ok(());
                }
            }
        } else {
            self.pos += 1;
            while self.pos < self.chars.len() && is_name_char(self.chars[self.pos]) {
                self.pos += 1;
            }
        }
        let text = self.slice(start, self.pos);
        self.emit(TokenKind::Variable, text, (start, self.pos))?;
        self.state = self.stack.pop();
        Ok(())
    }

    fn lex_command_substitution(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.open_at = start;
        self.pos += 2;
        let mut depth = 1usize;
        while self.pos < self.chars.len() && depth > 0 {
            if self.chars[self.pos] == '$' && self.peek_at(self.pos + 1) == Some('(') {
                depth += 1;
                self.pos += 2;
                continue;
            }
            if self.chars[self.pos] == ')' {
                depth -= 1;
            }
            self.pos += 1;
        }
        if depth == 0 {
            let text = self.slice(start, self.pos);
            self.emit(TokenKind::CommandSubstitution, text, (start, self.pos))?;
            self.state = self.stack.pop();
        }
        Ok(())
    }

    // ---- Heredoc delimiter ----

    fn lex_heredoc(&mut self) -> Result<(), LexError> {
        while self.pos < self.chars.len() && matches!(self.chars[self.pos], ' ' | '\t') {
            self.pos += 1;
        }
        if self.pos >= self.chars.len() {
            return Ok(());
        }

        let start = self.pos;
        let ch = self.chars[start];
        let (text, end) = if ch == '\'' || ch == '"' {
            let close = self
                .find(start + 1, ch)
                .ok_or(LexError::UnterminatedQuote(ch, start))?;
            (self.slice(start + 1, close), close + 1)
        } else {
            let mut end = start;
            while end < self.chars.len()
                && !self.chars[end].is_whitespace()
                && !matches!(self.chars[end], '(' | ')')
                && self.operator_len(end) == 0
            {
                end += 1;
            }
            (self.slice(start, end), end)
        };
        if end == start {
            return Err(LexError::MissingHeredocDelimiter(self.open_at));
        }

        self.emit(TokenKind::Word, text, (start, end))?;
        self.pos = end;
        self.state = self.stack.pop();
        Ok(())
    }

    // ---- Operators ----

    /// Length of the operator starting at `p`, or 0.
    fn operator_len(&self, p: usize) -> usize {
        const LONGEST_FIRST: [&str; 7] = ["&&", "||", "&>>", "&>", ">>", "<<", "<>"];
        for op in LONGEST_FIRST {
            if self.starts_with(p, op) {
                return op.chars().count();
            }
        }

        // Descriptor redirections: 2>, 2>>, 2>&1, 5<&-, >&2
        let len = self.chars.len();
        let mut q = p;
        while q < len && self.chars[q].is_ascii_digit() {
            q += 1;
        }
        if q < len && matches!(self.chars[q], '>' | '<') {
            let dir = self.chars[q];
            q += 1;
            if q < len && self.chars[q] == '&' {
                q += 1;
                while q < len && self.chars[q].is_ascii_digit() {
                    q += 1;
                }
                if q < len && self.chars[q] == '-' {
                    q += 1;
                }
            } else if dir == '>' && q < len && self.chars[q] == '>' && q - p > 1 {
                q += 1;
            }
            return q - p;
        }

        match self.chars.get(p) {
            Some('>' | '<' | '&' | '|' | ';') => 1,
            _ => 0,
        }
    }

    // ---- helpers ----

    fn enter(&mut self, next: LexState) -> Result<(), LexError> {
        if !self.stack.push(self.state) {
            return Err(LexError::NestingTooDeep(self.limits.max_state_depth));
        }
        self.state = next;
        Ok(())
    }

    fn emit(&mut self, kind: TokenKind, text: String, span: (usize, usize)) -> Result<(), LexError> {
        let start = match kind {
            TokenKind::Comment => span.0,
            _ => self.pending_start.take().unwrap_or(span.0),
        };
        if self.tokens.len() >= self.limits.max_tokens {
            return Err(LexError::TooManyTokens(self.limits.max_tokens));
        }
        if kind != TokenKind::Comment && text.chars().count() > self.limits.max_token_len {
            return Err(LexError::TokenTooLong {
                pos: start,
                max: self.limits.max_token_len,
            });
        }
        if self.stack.top() == Some(LexState::DoubleQuote) || self.state == LexState::DoubleQuote {
            self.quote_emitted = true;
        }
        self.tokens.push(Token::new(kind, text, (start, span.1)));
        Ok(())
    }

    fn peek_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    fn starts_with(&self, pos: usize, pat: &str) -> bool {
        let mut i = pos;
        for c in pat.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn find(&self, from: usize, target: char) -> Option<usize> {
        (from..self.chars.len()).find(|&i| self.chars[i] == target)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, text: &str, span: (usize, usize)) -> Token {
        Token::new(kind, text, span)
    }

    fn lex(input: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn kt(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_tokenize_simple_words() {
        let tokens = Lexer::new("echo hello").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Word, "echo", (0, 4)),
                token(TokenKind::Word, "hello", (5, 10)),
                token(TokenKind::EndOfInput, "", (10, 10)),
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = Lexer::new("a|b && c || d > e < f ; (g) ").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Word, "a", (0, 1)),
                token(TokenKind::Operator, "|", (1, 2)),
                token(TokenKind::Word, "b", (2, 3)),
                token(TokenKind::Operator, "&&", (4, 6)),
                token(TokenKind::Word, "c", (7, 8)),
                token(TokenKind::Operator, "||", (9, 11)),
                token(TokenKind::Word, "d", (12, 13)),
                token(TokenKind::Operator, ">", (14, 15)),
                token(TokenKind::Word, "e", (16, 17)),
                token(TokenKind::Operator, "<", (18, 19)),
                token(TokenKind::Word, "f", (20, 21)),
                token(TokenKind::Operator, ";", (22, 23)),
                token(TokenKind::Paren, "(", (24, 25)),
                token(TokenKind::Word, "g", (25, 26)),
                token(TokenKind::Paren, ")", (26, 27)),
                token(TokenKind::EndOfInput, "", (28, 28)),
            ]
        );
    }

    #[test]
    fn test_quotes_and_variables() {
        let tokens = Lexer::new(r#""a b" 'c d' $VAR ${VAR2}"#).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::String, "a b", (0, 5)),
                token(TokenKind::String, "c d", (6, 11)),
                token(TokenKind::Variable, "$VAR", (12, 16)),
                token(TokenKind::Variable, "${VAR2}", (17, 24)),
                token(TokenKind::EndOfInput, "", (24, 24)),
            ]
        );
    }

    #[test]
    fn test_double_quote_splits_at_substitutions() {
        let tokens = Lexer::new(r#"echo "x $A y""#).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Word, "echo", (0, 4)),
                token(TokenKind::String, "x ", (5, 8)),
                token(TokenKind::Variable, "$A", (8, 10)),
                token(TokenKind::String, " y", (10, 13)),
                token(TokenKind::EndOfInput, "", (13, 13)),
            ]
        );
    }

    #[test]
    fn test_double_quote_substitution_only_covers_quotes() {
        let tokens = Lexer::new(r#""$(date)""#).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::CommandSubstitution, "$(date)", (0, 9)),
                token(TokenKind::EndOfInput, "", (9, 9)),
            ]
        );
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(
            lex(r#"a "" ''"#),
            vec![
                kt(TokenKind::Word, "a"),
                kt(TokenKind::String, ""),
                kt(TokenKind::String, ""),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            lex(r#"echo a\ b "q\"x\n""#),
            vec![
                kt(TokenKind::Word, "echo"),
                kt(TokenKind::Word, "a b"),
                kt(TokenKind::String, "q\"x\\n"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_find_exec_terminator() {
        assert_eq!(
            lex(r"find . -exec rm {} \;"),
            vec![
                kt(TokenKind::Word, "find"),
                kt(TokenKind::Word, "."),
                kt(TokenKind::Word, "-exec"),
                kt(TokenKind::Word, "rm"),
                kt(TokenKind::Word, "{}"),
                kt(TokenKind::Word, "\\;"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_fd_redirections() {
        assert_eq!(
            lex("ls 2>&1 >out 2>>err 5<&- &>all >&2"),
            vec![
                kt(TokenKind::Word, "ls"),
                kt(TokenKind::Operator, "2>&1"),
                kt(TokenKind::Operator, ">"),
                kt(TokenKind::Word, "out"),
                kt(TokenKind::Operator, "2>>"),
                kt(TokenKind::Word, "err"),
                kt(TokenKind::Operator, "5<&-"),
                kt(TokenKind::Operator, "&>"),
                kt(TokenKind::Word, "all"),
                kt(TokenKind::Operator, ">&2"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_longest_operator_first() {
        assert_eq!(
            lex("a &>> b <> c >> d &"),
            vec![
                kt(TokenKind::Word, "a"),
                kt(TokenKind::Operator, "&>>"),
                kt(TokenKind::Word, "b"),
                kt(TokenKind::Operator, "<>"),
                kt(TokenKind::Word, "c"),
                kt(TokenKind::Operator, ">>"),
                kt(TokenKind::Word, "d"),
                kt(TokenKind::Operator, "&"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_heredoc_marker_and_delimiter() {
        assert_eq!(
            lex("cat <<EOF"),
            vec![
                kt(TokenKind::Word, "cat"),
                kt(TokenKind::Heredoc, "<<"),
                kt(TokenKind::Word, "EOF"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
        assert_eq!(
            lex("cat << 'END' | wc"),
            vec![
                kt(TokenKind::Word, "cat"),
                kt(TokenKind::Heredoc, "<<"),
                kt(TokenKind::Word, "END"),
                kt(TokenKind::Operator, "|"),
                kt(TokenKind::Word, "wc"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_heredoc_without_delimiter() {
        assert_eq!(
            Lexer::new("cat <<").tokenize(),
            Err(LexError::MissingHeredocDelimiter(4))
        );
        assert_eq!(
            Lexer::new("cat << | wc").tokenize(),
            Err(LexError::MissingHeredocDelimiter(4))
        );
    }

    #[test]
    fn test_patterns_and_brackets() {
        assert_eq!(
            lex("ls *.txt ? [ -f x ] a|[b"),
            vec![
                kt(TokenKind::Word, "ls"),
                kt(TokenKind::Pattern, "*"),
                kt(TokenKind::Word, ".txt"),
                kt(TokenKind::Pattern, "?"),
                kt(TokenKind::Word, "["),
                kt(TokenKind::Word, "-f"),
                kt(TokenKind::Word, "x"),
                kt(TokenKind::Word, "]"),
                kt(TokenKind::Word, "a"),
                kt(TokenKind::Operator, "|"),
                kt(TokenKind::Pattern, "["),
                kt(TokenKind::Word, "b"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_dash_word_keeps_parens_and_dollars() {
        assert_eq!(
            lex("grep -P(a)$x|wc"),
            vec![
                kt(TokenKind::Word, "grep"),
                kt(TokenKind::Word, "-P(a)$x"),
                kt(TokenKind::Operator, "|"),
                kt(TokenKind::Word, "wc"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_variable_split_mid_word() {
        let tokens = Lexer::new("pre$NAME.txt").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Word, "pre", (0, 3)),
                token(TokenKind::Variable, "$NAME", (3, 8)),
                token(TokenKind::Word, ".txt", (8, 12)),
                token(TokenKind::EndOfInput, "", (12, 12)),
            ]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            lex("echo hi # trailing note"),
            vec![
                kt(TokenKind::Word, "echo"),
                kt(TokenKind::Word, "hi"),
                kt(TokenKind::Comment, "# trailing note"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_nested_command_substitution() {
        assert_eq!(
            lex("echo $(a $(b) c) d"),
            vec![
                kt(TokenKind::Word, "echo"),
                kt(TokenKind::CommandSubstitution, "$(a $(b) c)"),
                kt(TokenKind::Word, "d"),
                kt(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_unterminated_constructs() {
        assert_eq!(Lexer::new("echo 'foo").tokenize(), Err(LexError::UnterminatedQuote('\'', 5)));
        assert_eq!(Lexer::new("echo \"foo").tokenize(), Err(LexError::UnterminatedQuote('"', 5)));
        assert_eq!(Lexer::new("echo $(a $(b)").tokenize(), Err(LexError::UnterminatedSubstitution(5)));
        assert_eq!(Lexer::new("echo ${HOME").tokenize(), Err(LexError::UnterminatedVariable(5)));
        assert_eq!(Lexer::new("echo \\").tokenize(), Err(LexError::TrailingEscape(5)));
    }

    #[test]
    fn test_backslash_at_end_of_open_double_quote() {
        assert_eq!(Lexer::new(r#"echo "a\"#).tokenize(), Err(LexError::UnterminatedQuote('"', 5)));
        assert_eq!(Lexer::new(r#"echo a\"#).tokenize(), Err(LexError::TrailingEscape(6)));
    }

    #[test]
    fn test_token_limits() {
        let limits = Limits {
            max_tokens: 2,
            ..Limits::default()
        };
        assert_eq!(
            Lexer::with_limits("a b c", limits).tokenize(),
            Err(LexError::TooManyTokens(2))
        );

        let limits = Limits {
            max_token_len: 3,
            ..Limits::default()
        };
        assert_eq!(
            Lexer::with_limits("ab abcd", limits).tokenize(),
            Err(LexError::TokenTooLong { pos: 3, max: 3 })
        );
    }

    #[test]
    fn test_nesting_limit() {
        let limits = Limits {
            max_state_depth: 1,
            ..Limits::default()
        };
        assert_eq!(
            Lexer::with_limits(r#""a\b""#, limits).tokenize(),
            Err(LexError::NestingTooDeep(1))
        );
    }

    #[test]
    fn test_lexer_is_reusable() {
        let mut lexer = Lexer::new("true");
        let first = lexer.tokenize().unwrap();
        let second = lexer.tokenize().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_tokenize_empty() {
        let tokens = Lexer::new("").tokenize().unwrap();
        assert_eq!(tokens, vec![token(TokenKind::EndOfInput, "", (0, 0))]);
    }
}
