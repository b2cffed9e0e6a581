use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: usize,
    pub pid: Pid,
    pub text: String,
}

/// Background jobs that have not been reaped yet.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job and returns its id, one above the highest live id.
    pub fn add(&mut self, pid: Pid, text: impl Into<String>) -> usize {
        let id = self.jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
        self.jobs.push(Job {
            id,
            pid,
            text: text.into(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Collects finished jobs without blocking, with their exit statuses.
    pub fn reap(&mut self) -> Vec<(Job, i32)> {
        self.collect(Some(WaitPidFlag::WNOHANG))
    }

    /// Blocks until every job has finished.
    pub fn wait_all(&mut self) -> Vec<(Job, i32)> {
        self.collect(None)
    }

    fn collect(&mut self, flags: Option<WaitPidFlag>) -> Vec<(Job, i32)> {
        let mut done = Vec::new();
        let mut running = Vec::with_capacity(self.jobs.len());

        for job in self.jobs.drain(..) {
            let status = loop {
                match waitpid(job.pid, flags) {
                    Ok(WaitStatus::StillAlive) => break None,
                    Ok(WaitStatus::Exited(_, code)) => break Some(code),
                    Ok(WaitStatus::Signaled(..)) => break Some(1),
                    Ok(_) => break None,
                    Err(Errno::EINTR) => continue,
                    Err(e) => {
                        // Already collected elsewhere; nothing left to wait for.
                        tracing::warn!(pid = job.pid.as_raw(), error = %e, "failed to reap background job");
                        break Some(1);
                    }
                }
            };
            match status {
                Some(code) => {
                    tracing::debug!(id = job.id, pid = job.pid.as_raw(), code, "background job finished");
                    done.push((job, code));
                }
                None => running.push(job),
            }
        }

        self.jobs = running;
        done
    }
}
