use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Size bounds shared by the lexer and the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub max_tokens: usize,
    pub max_token_len: usize,
    pub max_args: usize,
    pub max_heredoc_bytes: usize,
    pub max_state_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_tokens: 256,
            max_token_len: 127,
            max_args: 19,
            max_heredoc_bytes: 4096,
            max_state_depth: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Fork every stage, then wait for all of them.
    Concurrent,
    /// Wait for each stage before forking the next one.
    Staged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubshellMode {
    /// `( ... )` runs in a forked child.
    Fork,
    /// `( ... )` runs in the shell process, exactly like `{ ... }`.
    Inline,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: Option<String>,
    pub limits: Limits,
    pub pipeline: PipelineMode,
    pub subshell: SubshellMode,
    pub env_vars: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: None,
            limits: Limits::default(),
            pipeline: PipelineMode::Concurrent,
            subshell: SubshellMode::Fork,
            env_vars: HashMap::new(),
        }
    }

    /// `$MONGSH_CONFIG`, then `$HOME/.mongshrc`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("MONGSH_CONFIG") {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME").map(|home| Path::new(&home).join(".mongshrc"))
    }

    /// Loads the config from [`ConfigLoader::default_path`]. A missing file is not an error.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from_file(path),
            _ => Ok(Self::default_config()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let mut src = String::new();
        for line in BufReader::new(file).lines() {
            src.push_str(&line?);
            src.push('\n');
        }
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!("Line {}: No '=' found: {}", lineno + 1, line)));
            };
            let key = key.trim();
            // The prompt keeps its trailing whitespace; everything else is trimmed.
            let trimmed_value = value.trim();

            match key {
                "prompt" => config.prompt = Some(value.trim_start().to_string()),
                "max_tokens" => config.limits.max_tokens = parse_usize(lineno, key, trimmed_value)?,
                "max_token_len" => config.limits.max_token_len = parse_usize(lineno, key, trimmed_value)?,
                "max_args" => config.limits.max_args = parse_usize(lineno, key, trimmed_value)?,
                "max_heredoc_bytes" => {
                    config.limits.max_heredoc_bytes = parse_usize(lineno, key, trimmed_value)?
                }
                "max_state_depth" => config.limits.max_state_depth = parse_usize(lineno, key, trimmed_value)?,
                "pipeline" => {
                    config.pipeline = match trimmed_value {
                        "concurrent" => PipelineMode::Concurrent,
                        "staged" => PipelineMode::Staged,
                        other => {
                            return Err(ConfigError::Parse(format!(
                                "Line {}: Unknown pipeline mode: {}",
                                lineno + 1,
                                other
                            )));
                        }
                    };
                }
                "subshell" => {
                    config.subshell = match trimmed_value {
                        "fork" => SubshellMode::Fork,
                        "inline" => SubshellMode::Inline,
                        other => {
                            return Err(ConfigError::Parse(format!(
                                "Line {}: Unknown subshell mode: {}",
                                lineno + 1,
                                other
                            )));
                        }
                    };
                }
                k if k.starts_with("env.") => {
                    let var = k.trim_start_matches("env.").to_string();
                    config.env_vars.insert(var, trimmed_value.to_string());
                }
                _ => return Err(ConfigError::Parse(format!("Line {}: Unknown key: {}", lineno + 1, key))),
            }
        }

        Ok(config)
    }
}

fn parse_usize(lineno: usize, key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Parse(format!("Line {}: Invalid usize for {}: {}", lineno + 1, key, value)))
}
