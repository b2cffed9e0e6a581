use std::collections::VecDeque;
use std::io;

use super::ParseError;

/// Where heredoc bodies are read from once the delimiter has been parsed.
pub trait HeredocSource {
    /// Next raw line without its terminator, `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Fixed list of lines, for scripted input and tests.
#[derive(Debug, Default)]
pub struct LineSource {
    lines: VecDeque<String>,
}

impl LineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LineSource {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl HeredocSource for LineSource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Collects lines until one equals `delimiter`. Each body line keeps a trailing `\n`.
pub fn read_body(source: &mut dyn HeredocSource, delimiter: &str, max_bytes: usize) -> Result<String, ParseError> {
    let mut body = String::new();
    loop {
        let Some(line) = source.read_line()? else {
            return Err(ParseError::UnterminatedHeredoc {
                delimiter: delimiter.to_string(),
            });
        };
        let line = line.trim_end_matches(['\n', '\r']);
        if line == delimiter {
            return Ok(body);
        }
        if body.len() + line.len() + 1 > max_bytes {
            return Err(ParseError::HeredocTooLarge { max: max_bytes });
        }
        body.push_str(line);
        body.push('\n');
    }
}
