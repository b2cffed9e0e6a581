use crate::config::{Config, Limits};
use crate::environment::Environment;
use crate::error::ShellError;
use crate::executor::{DefaultExecutor, Executor};
use crate::io::StdinHeredoc;
use crate::lexer;
use crate::parser::{DefaultParser, HeredocSource, ParseError, Parser};
use crate::prompt::ShellPrompt;

/// Interactive loop. Returns the status of the last command.
pub fn start(config: Config) -> i32 {
    let mut env = Environment::new();
    for (key, value) in &config.env_vars {
        env.set_exported(key, value);
    }
    let prompt = ShellPrompt::new(config.prompt.clone());
    let mut executor = DefaultExecutor::new(&config);
    let mut heredoc = StdinHeredoc;
    let mut last_status = 0;

    loop {
        for (job, status) in executor.jobs_mut().reap() {
            tracing::debug!(id = job.id, status, "reaped job");
            println!("[{}]+ Done  {}", job.id, job.text);
        }

        let line = match prompt.read_line(&env) {
            Ok(Some(line)) => line,
            // End with EOF (e.g. Ctrl+D)
            Ok(None) => break,
            Err(e) => {
                eprintln!("mongsh: {}", ShellError::from(e));
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" {
            break;
        }

        match run_line(&line, &mut heredoc, &mut executor, &mut env, &config.limits) {
            Ok(status) => last_status = status,
            Err(ShellError::Parse(ParseError::EmptyInput)) => {}
            Err(e) => {
                eprintln!("mongsh: {}", e);
                last_status = 1;
            }
        }
    }

    last_status
}

/// Tokenizes, parses and runs one line. Nothing runs if lexing or parsing fails.
pub fn run_line(
    line: &str,
    heredoc: &mut dyn HeredocSource,
    executor: &mut dyn Executor,
    env: &mut Environment,
    limits: &Limits,
) -> Result<i32, ShellError> {
    let tokens = lexer::tokenize(line, limits)?;
    if tracing::enabled!(tracing::Level::TRACE) {
        for token in &tokens {
            tracing::trace!(span = ?token.span, "{}", token);
        }
    }

    let ast = DefaultParser::with_limits(&tokens, heredoc, limits.clone()).parse()?;
    let status = executor.evaluate(&ast, env)?;
    tracing::debug!(status, "line finished");
    Ok(status)
}
