use std::io;

use thiserror::Error;

use crate::ast::AstNode;
use crate::environment::Environment;

pub type ExecStatus = Result<i32, ExecError>;

/// Failures that abort the current line. Failed opens, execs and `cd`
/// targets are reported where they happen and become non-zero statuses instead.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("fork failed: {0}")]
    Fork(nix::Error),
    #[error("pipe failed: {0}")]
    Pipe(nix::Error),
    #[error("wait failed: {0}")]
    Wait(nix::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("No such builtin command: {0}")]
    NoSuchBuiltin(String),
}

pub trait Executor {
    /// Runs `node` and returns its exit status.
    fn evaluate(&mut self, node: &AstNode, env: &mut Environment) -> ExecStatus;

    /// Runs `node` for its effects only; failures are reported on stderr.
    fn execute(&mut self, node: &AstNode, env: &mut Environment) {
        if let Err(e) = self.evaluate(node, env) {
            eprintln!("mongsh: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Records the traversal instead of running anything.
    struct TraceExecutor {
        log: Vec<String>,
    }

    impl Executor for TraceExecutor {
        fn evaluate(&mut self, node: &AstNode, env: &mut Environment) -> ExecStatus {
            match node {
                AstNode::Simple(cmd) => {
                    self.log.push(cmd.args.join(" "));
                    Ok(if cmd.name() == Some("false") { 1 } else { 0 })
                }
                AstNode::Sequence(l, r) => {
                    self.evaluate(l, env)?;
                    self.evaluate(r, env)
                }
                AstNode::And(l, r) => match self.evaluate(l, env)? {
                    0 => self.evaluate(r, env),
                    status => Ok(status),
                },
                AstNode::Or(l, r) => match self.evaluate(l, env)? {
                    0 => Ok(0),
                    _ => self.evaluate(r, env),
                },
                _ => Err(ExecError::NoSuchBuiltin(node.source_text())),
            }
        }
    }

    #[test]
    fn test_execute_reports_instead_of_failing() {
        let mut exec = TraceExecutor { log: vec![] };
        let mut env = Environment::empty();
        exec.execute(&AstNode::Group(Box::new(AstNode::simple(&["x"]))), &mut env);
        assert!(exec.log.is_empty());
    }

    #[test]
    fn test_and_or_short_circuit() {
        // false && skipped; true || skipped; echo end
        let ast = AstNode::Sequence(
            Box::new(AstNode::Sequence(
                Box::new(AstNode::And(
                    Box::new(AstNode::simple(&["false"])),
                    Box::new(AstNode::simple(&["skipped", "1"])),
                )),
                Box::new(AstNode::Or(
                    Box::new(AstNode::simple(&["true"])),
                    Box::new(AstNode::simple(&["skipped", "2"])),
                )),
            )),
            Box::new(AstNode::simple(&["echo", "end"])),
        );
        let mut exec = TraceExecutor { log: vec![] };
        let mut env = Environment::empty();
        assert_eq!(exec.evaluate(&ast, &mut env).unwrap(), 0);
        assert_eq!(exec.log, vec!["false", "true", "echo end"]);
    }
}
