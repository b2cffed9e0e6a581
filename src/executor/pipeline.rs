use std::os::fd::{AsRawFd, OwnedFd};

use nix::unistd::{ForkResult, Pid, fork, pipe};

use crate::ast::AstNode;
use crate::config::PipelineMode;
use crate::environment::Environment;
use crate::executor::default_executor::DefaultExecutor;
use crate::executor::process;
use crate::executor::{ExecError, ExecStatus};

pub struct PipelineHandler;

impl PipelineHandler {
    /// Runs a `Pipe` chain. Every stage gets its own child; the status is the last stage's.
    pub fn run(executor: &mut DefaultExecutor, node: &AstNode, env: &mut Environment, mode: PipelineMode) -> ExecStatus {
        let mut stages = Vec::new();
        flatten_pipeline(node, &mut stages);
        tracing::debug!(stages = stages.len(), ?mode, "running pipeline");

        let mut prev_read: Option<OwnedFd> = None;
        let mut running: Vec<Pid> = Vec::with_capacity(stages.len());
        let mut status = 0;

        for (i, stage) in stages.iter().enumerate() {
            let is_last = i == stages.len() - 1;
            let next = if is_last {
                None
            } else {
                match pipe() {
                    Ok(ends) => Some(ends),
                    Err(e) => {
                        Self::wait_quietly(&running);
                        return Err(ExecError::Pipe(e));
                    }
                }
            };

            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    if let Some(read) = prev_read.take() {
                        unsafe { libc::dup2(read.as_raw_fd(), 0) };
                    }
                    if let Some((read, write)) = next {
                        drop(read);
                        unsafe { libc::dup2(write.as_raw_fd(), 1) };
                    }
                    let code = executor.run_in_child(stage, env);
                    std::process::exit(code)
                }
                Ok(ForkResult::Parent { child }) => {
                    // Close our copies so readers see EOF once writers exit.
                    drop(prev_read.take());
                    if let Some((read, write)) = next {
                        drop(write);
                        prev_read = Some(read);
                    }
                    match mode {
                        PipelineMode::Staged => status = process::wait_for(child)?,
                        PipelineMode::Concurrent => running.push(child),
                    }
                }
                Err(e) => {
                    drop(prev_read.take());
                    Self::wait_quietly(&running);
                    return Err(ExecError::Fork(e));
                }
            }
        }

        for pid in running {
            status = process::wait_for(pid)?;
        }
        Ok(status)
    }

    fn wait_quietly(pids: &[Pid]) {
        for &pid in pids {
            let _ = process::wait_for(pid);
        }
    }
}

pub fn flatten_pipeline<'a>(node: &'a AstNode, result: &mut Vec<&'a AstNode>) {
    match node {
        AstNode::Pipe(left, right) => {
            flatten_pipeline(left, result);
            flatten_pipeline(right, result);
        }
        _ => result.push(node),
    }
}
