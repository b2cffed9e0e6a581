use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsRawFd;

use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::ast::{AstNode, CommandNode};
use crate::config::{Config, PipelineMode, SubshellMode};
use crate::environment::Environment;
use crate::executor::builtin::BuiltinManager;
use crate::executor::jobs::JobTable;
use crate::executor::pipeline::PipelineHandler;
use crate::executor::process;
use crate::executor::redirect::RedirectHandler;
use crate::executor::{ExecError, ExecStatus, Executor};

/// Tree-walking executor backed by fork/exec.
pub struct DefaultExecutor {
    builtins: BuiltinManager,
    jobs: JobTable,
    pipeline_mode: PipelineMode,
    subshell_mode: SubshellMode,
}

impl Default for DefaultExecutor {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Executor for DefaultExecutor {
    fn evaluate(&mut self, node: &AstNode, env: &mut Environment) -> ExecStatus {
        match node {
            AstNode::Simple(cmd) => self.exec_simple(cmd, env),
            AstNode::Pipe(_, _) => {
                let mode = self.pipeline_mode;
                PipelineHandler::run(self, node, env, mode)
            }
            AstNode::Sequence(lhs, rhs) => {
                self.evaluate(lhs, env)?;
                self.evaluate(rhs, env)
            }
            AstNode::And(lhs, rhs) => match self.evaluate(lhs, env)? {
                0 => self.evaluate(rhs, env),
                status => Ok(status),
            },
            AstNode::Or(lhs, rhs) => match self.evaluate(lhs, env)? {
                0 => Ok(0),
                _ => self.evaluate(rhs, env),
            },
            AstNode::Background(job) => self.exec_background(job, env),
            AstNode::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)? == 0 {
                    self.evaluate(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.evaluate(else_branch, env)
                } else {
                    Ok(0)
                }
            }
            AstNode::For { var, words, body } => {
                let mut status = 0;
                for word in words {
                    env.set_exported(var, word);
                    status = self.evaluate(body, env)?;
                }
                Ok(status)
            }
            AstNode::While { condition, body } => {
                let mut status = 0;
                while self.evaluate(condition, env)? == 0 {
                    status = self.evaluate(body, env)?;
                }
                Ok(status)
            }
            AstNode::Group(body) => self.evaluate(body, env),
            AstNode::Subshell(body) => self.exec_subshell(body, env),
        }
    }
}

impl DefaultExecutor {
    pub fn new(config: &Config) -> Self {
        DefaultExecutor {
            builtins: BuiltinManager::new(),
            jobs: JobTable::new(),
            pipeline_mode: config.pipeline,
            subshell_mode: config.subshell,
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut JobTable {
        &mut self.jobs
    }

    fn exec_simple(&mut self, cmd: &CommandNode, env: &mut Environment) -> ExecStatus {
        let Some(name) = cmd.name() else {
            return Ok(1);
        };

        if self.builtins.is_builtin(name) {
            // Builtins never read stdin, so a heredoc body has nowhere to go.
            let _saved = RedirectHandler::apply_saved(&cmd.redirects, None);
            let mut out = Vec::new();
            let result = self
                .builtins
                .execute(name, &cmd.args[1..], env, &mut out)
                .and_then(|status| write_stdout(&out).map(|_| status).map_err(ExecError::from));
            return match result {
                // A builtin that cannot write fails like any other command.
                Err(ExecError::Io(e)) => {
                    eprintln!("{}: write error: {}", name, e);
                    Ok(1)
                }
                other => other,
            };
        }

        self.exec_external(cmd, env)
    }

    fn exec_external(&mut self, cmd: &CommandNode, env: &Environment) -> ExecStatus {
        // Both ends close on exec; the child only keeps the copy on its stdin.
        let heredoc = match &cmd.heredoc_body {
            Some(body) => Some((body, pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?)),
            None => None,
        };
        let heredoc_fd = heredoc.as_ref().map(|(_, (read, _))| read.as_raw_fd());

        let pid = process::spawn(|| {
            RedirectHandler::apply(&cmd.redirects, heredoc_fd);
            process::exec_command(&cmd.args, env)
        })?;

        if let Some((body, (read, write))) = heredoc {
            drop(read);
            let mut writer = File::from(write);
            if let Err(e) = writer.write_all(body.as_bytes()) {
                // The command exited without reading all of it.
                tracing::debug!(error = %e, "heredoc body not fully consumed");
            }
        }
        process::wait_for(pid)
    }

    fn exec_background(&mut self, job: &AstNode, env: &mut Environment) -> ExecStatus {
        let pid = process::spawn(|| self.run_in_child(job, env))?;
        let id = self.jobs.add(pid, job.source_text());
        eprintln!("[{}] {}", id, pid);
        Ok(0)
    }

    fn exec_subshell(&mut self, body: &AstNode, env: &mut Environment) -> ExecStatus {
        match self.subshell_mode {
            SubshellMode::Inline => self.evaluate(body, env),
            SubshellMode::Fork => {
                let pid = process::spawn(|| self.run_in_child(body, env))?;
                process::wait_for(pid)
            }
        }
    }

    /// Runs `node` inside an already forked child and returns the exit status.
    /// A plain external command replaces the child instead of forking again.
    pub(crate) fn run_in_child(&mut self, node: &AstNode, env: &mut Environment) -> i32 {
        if let AstNode::Simple(cmd) = node {
            let external = cmd.name().is_some_and(|name| !self.builtins.is_builtin(name));
            if external && cmd.heredoc_body.is_none() {
                RedirectHandler::apply(&cmd.redirects, None);
                process::exec_command(&cmd.args, env);
            }
        }
        self.evaluate(node, env).unwrap_or_else(|e| {
            eprintln!("mongsh: {}", e);
            1
        })
    }
}

/// Writes `bytes` straight to descriptor 1, bypassing the buffered `Stdout`
/// so nothing is left behind once a builtin's redirects are undone.
fn write_stdout(mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(1, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        bytes = &bytes[n as usize..];
    }
    Ok(())
}
