use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use crate::ast::{Redirect, RedirectOp};

pub struct RedirectHandler;

impl RedirectHandler {
    /// Applies `redirects` to the current process in order. A redirect that
    /// fails is reported and skipped; the rest still apply.
    pub fn apply(redirects: &[Redirect], heredoc_fd: Option<RawFd>) {
        for redirect in redirects {
            if let Err(e) = Self::apply_one(redirect, heredoc_fd) {
                eprintln!("mongsh: {}: {}", describe_target(redirect), e);
                tracing::warn!(%redirect, error = %e, "skipping redirect");
            }
        }
    }

    /// Like [`RedirectHandler::apply`], but the returned guard puts every
    /// touched descriptor back when dropped. Used for builtins.
    pub fn apply_saved(redirects: &[Redirect], heredoc_fd: Option<RawFd>) -> SavedFds {
        let mut saved = SavedFds::default();
        for redirect in redirects {
            for fd in affected_fds(redirect) {
                saved.save(fd);
            }
        }
        Self::apply(redirects, heredoc_fd);
        saved
    }

    fn apply_one(redirect: &Redirect, heredoc_fd: Option<RawFd>) -> io::Result<()> {
        let fd = redirect.fd();
        let target = redirect.target.as_str();
        match redirect.op {
            RedirectOp::Out => open_onto(OpenOptions::new().write(true).create(true).truncate(true), target, &[fd]),
            RedirectOp::Append => open_onto(OpenOptions::new().append(true).create(true), target, &[fd]),
            RedirectOp::In => open_onto(OpenOptions::new().read(true), target, &[fd]),
            RedirectOp::ReadWrite => open_onto(OpenOptions::new().read(true).write(true).create(true), target, &[fd]),
            RedirectOp::OutErr => {
                open_onto(OpenOptions::new().write(true).create(true).truncate(true), target, &[1, 2])
            }
            RedirectOp::AppendErr => open_onto(OpenOptions::new().append(true).create(true), target, &[1, 2]),
            RedirectOp::DupOut | RedirectOp::DupIn => {
                let src: RawFd = target
                    .parse()
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "bad file descriptor"))?;
                dup2(src, fd)
            }
            RedirectOp::CloseOut | RedirectOp::CloseIn => {
                unsafe { libc::close(fd) };
                Ok(())
            }
            RedirectOp::Heredoc => match heredoc_fd {
                Some(src) => dup2(src, fd),
                None => Ok(()),
            },
        }
    }
}

/// Copies of descriptors taken before redirecting. Restored in reverse on drop.
#[derive(Debug, Default)]
pub struct SavedFds {
    // (descriptor, copy of its previous target or None if it was closed)
    saved: Vec<(RawFd, Option<RawFd>)>,
}

impl SavedFds {
    fn save(&mut self, fd: RawFd) {
        if self.saved.iter().any(|(f, _)| *f == fd) {
            return;
        }
        // Park the copy above the low descriptors redirects are likely to target.
        let copy = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 10) };
        self.saved.push((fd, (copy >= 0).then_some(copy)));
    }
}

impl Drop for SavedFds {
    fn drop(&mut self) {
        for (fd, copy) in self.saved.drain(..).rev() {
            unsafe {
                match copy {
                    Some(copy) => {
                        libc::dup2(copy, fd);
                        libc::close(copy);
                    }
                    None => {
                        libc::close(fd);
                    }
                }
            }
        }
    }
}

fn affected_fds(redirect: &Redirect) -> Vec<RawFd> {
    match redirect.op {
        RedirectOp::OutErr | RedirectOp::AppendErr => vec![1, 2],
        _ => vec![redirect.fd()],
    }
}

fn open_onto(options: &mut OpenOptions, path: &str, fds: &[RawFd]) -> io::Result<()> {
    let file = options.mode(0o644).open(path)?;
    let raw = file.as_raw_fd();
    for &fd in fds {
        dup2(raw, fd)?;
    }
    if fds.contains(&raw) {
        // The file landed on a target descriptor already; keep it open.
        let _ = file.into_raw_fd();
    }
    Ok(())
}

fn dup2(src: RawFd, dst: RawFd) -> io::Result<()> {
    if src == dst {
        return Ok(());
    }
    if unsafe { libc::dup2(src, dst) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn describe_target(redirect: &Redirect) -> String {
    match redirect.op {
        RedirectOp::DupOut | RedirectOp::DupIn | RedirectOp::CloseOut | RedirectOp::CloseIn | RedirectOp::Heredoc => {
            redirect.to_string()
        }
        _ => redirect.target.clone(),
    }
}
