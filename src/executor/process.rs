use std::ffi::CString;

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvpe, fork};

use crate::environment::Environment;
use crate::executor::ExecError;

/// Forks. The child runs `child` and exits with the status it returns.
///
/// Builtins flush their own output, so nothing is left buffered for the
/// child to write a second time.
pub fn spawn<F>(child: F) -> Result<Pid, ExecError>
where
    F: FnOnce() -> i32,
{
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(pid = child.as_raw(), "forked child");
            Ok(child)
        }
        Ok(ForkResult::Child) => std::process::exit(child()),
        Err(e) => Err(ExecError::Fork(e)),
    }
}

/// Blocks until `pid` terminates. Death by signal maps to 1.
pub fn wait_for(pid: Pid) -> Result<i32, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(pid = pid.as_raw(), code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                tracing::debug!(pid = pid.as_raw(), ?sig, "child killed by signal");
                return Ok(1);
            }
            Ok(_) => return Ok(1),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(ExecError::Wait(e)),
        }
    }
}

/// Replaces the current (child) process with `args[0]`, searched on PATH.
/// Only returns control by exiting with status 1.
pub fn exec_command(args: &[String], env: &Environment) -> ! {
    let name = args.first().map(String::as_str).unwrap_or_default();

    // The shell ignores SIGPIPE; programs expect the default.
    unsafe {
        let _ = signal::signal(Signal::SIGPIPE, SigHandler::SigDfl);
    }

    match args.iter().map(|a| CString::new(a.as_str())).collect::<Result<Vec<_>, _>>() {
        Ok(argv) if !argv.is_empty() => {
            let envp = env.to_exec_env();
            if let Err(e) = execvpe(&argv[0], &argv, &envp) {
                eprintln!("{}: {}", name, e.desc());
            }
        }
        Ok(_) => eprintln!("mongsh: empty command"),
        Err(_) => eprintln!("{}: argument contains a NUL byte", name),
    }
    std::process::exit(1)
}
