use std::io::{self, Write};

use crate::parser::HeredocSource;

pub struct InputHandler;

impl InputHandler {
    /// Prints `prompt` and reads one line from stdin, without its line terminator.
    pub fn read_line(prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut buf = String::new();
        let bytes_read = io::stdin().read_line(&mut buf)?;
        if bytes_read == 0 {
            // EOF (e.g., Ctrl-D)
            println!();
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Heredoc bodies typed at the terminal, one `> ` prompt per line.
pub struct StdinHeredoc;

impl HeredocSource for StdinHeredoc {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        InputHandler::read_line("> ")
    }
}
