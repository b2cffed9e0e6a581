use std::io;

use nix::unistd::{User, gethostname, geteuid};

use crate::environment::Environment;
use crate::io::InputHandler;

pub struct ShellPrompt {
    custom: Option<String>,
}

impl ShellPrompt {
    /// `custom` replaces the generated `user@host:dir$ ` prompt.
    pub fn new(custom: Option<String>) -> Self {
        ShellPrompt { custom }
    }

    pub fn render(&self, env: &Environment) -> String {
        if let Some(custom) = &self.custom {
            return custom.clone();
        }

        let user = User::from_uid(geteuid())
            .ok()
            .flatten()
            .map(|u| u.name)
            .unwrap_or_else(|| "?".to_string());
        let host = gethostname()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "?".to_string());
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        format!("{}@{}:{}$ ", user, host, abbreviate_home(&cwd, env.get("HOME")))
    }

    pub fn read_line(&self, env: &Environment) -> io::Result<Option<String>> {
        InputHandler::read_line(&self.render(env))
    }
}

/// Replaces a leading `$HOME` with `~`.
fn abbreviate_home(cwd: &str, home: Option<&str>) -> String {
    match home {
        Some(home) if !home.is_empty() => match cwd.strip_prefix(home) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{}", rest),
            _ => cwd.to_string(),
        },
        _ => cwd.to_string(),
    }
}
