//! # Forked pipeline processes.
//!
//! [`ProcessHandle`] is the parent's view of one child created by [`ProcessHandle::spawn`].
//!
//! ## Rules
//! - The child runs the closure, then leaves through `_exit(0)`: no destructors, no atexit
//!   handlers, no flushing of buffers inherited from the parent.
//! - A panic escaping the closure exits the child with status `101`.
//! - Liveness is polled with `waitpid(WNOHANG)`; a child observed dead is reaped at once.
//! - Dropping a live handle kills and reaps the child.

use std::io;
use std::panic::{self, AssertUnwindSafe};

/// Parent-side handle to a forked child.
#[derive(Debug)]
pub(crate) struct ProcessHandle {
    pid: libc::pid_t,
    /// Raw wait status once reaped.
    exit: Option<libc::c_int>,
}

impl ProcessHandle {
    /// Forks the current process and runs `child` in the new one.
    ///
    /// The closure must restrict itself to fork-safe work: no locks held by other parent
    /// threads, no Tokio runtime, no `tracing` subscriber.
    pub(crate) fn spawn<F>(child: F) -> io::Result<Self>
    where
        F: FnOnce(),
    {
        // SAFETY: fork has no memory-safety preconditions of its own; the child only runs
        // `child` and then terminates without returning into the parent's stack.
        let pid = unsafe { libc::fork() };
        match pid {
            -1 => Err(io::Error::last_os_error()),
            0 => {
                let code = match panic::catch_unwind(AssertUnwindSafe(child)) {
                    Ok(()) => 0,
                    Err(_) => 101,
                };
                // SAFETY: terminates the child immediately.
                unsafe { libc::_exit(code) }
            }
            pid => Ok(Self { pid, exit: None }),
        }
    }

    #[inline]
    pub(crate) fn pid(&self) -> libc::pid_t {
        self.pid
    }

    /// Raw wait status of a reaped child.
    pub(crate) fn exit_status(&self) -> Option<libc::c_int> {
        self.exit
    }

    /// Polls the child; reaps it if it has terminated.
    pub(crate) fn is_alive(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }
        let mut status: libc::c_int = 0;
        // SAFETY: `status` is a valid out-pointer; the pid is our own child.
        let rc = unsafe { libc::waitpid(self.pid, &mut status, libc::WNOHANG) };
        match rc {
            0 => true,
            rc if rc == self.pid => {
                self.exit = Some(status);
                false
            }
            _ => {
                // ECHILD: reaped elsewhere; nothing left to track.
                self.exit = Some(-1);
                false
            }
        }
    }

    /// Sends `SIGKILL` and blocks until the child is reaped.
    ///
    /// A child that already exited is reaped without signalling.
    pub(crate) fn kill(&mut self) -> io::Result<()> {
        if !self.is_alive() {
            return Ok(());
        }
        // SAFETY: plain syscall on our own, not yet reaped, child.
        if unsafe { libc::kill(self.pid, libc::SIGKILL) } == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(err);
            }
        }
        self.wait()
    }

    fn wait(&mut self) -> io::Result<()> {
        let mut status: libc::c_int = 0;
        loop {
            // SAFETY: `status` is a valid out-pointer; the pid is our own child.
            let rc = unsafe { libc::waitpid(self.pid, &mut status, 0) };
            if rc == self.pid {
                self.exit = Some(status);
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ECHILD) => {
                    self.exit = Some(-1);
                    return Ok(());
                }
                _ => return Err(err),
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}

/// Human-readable form of a raw wait status.
pub(crate) fn describe_exit(status: libc::c_int) -> String {
    if status < 0 {
        "unknown".to_string()
    } else if libc::WIFEXITED(status) {
        format!("exit code {}", libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        format!("signal {}", libc::WTERMSIG(status))
    } else {
        format!("wait status {status}")
    }
}
