/// Convert an OS process status into shell-style exit code semantics.
///
/// On Unix, processes terminated by signal map to `128 + signal`.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(unix)]
pub fn exit_code_from_wait_status(raw_status: libc::c_int) -> Option<i32> {
    if unsafe { libc::WIFEXITED(raw_status) } {
        return Some(unsafe { libc::WEXITSTATUS(raw_status) });
    }

    if unsafe { libc::WIFSIGNALED(raw_status) } {
        let signal = unsafe { libc::WTERMSIG(raw_status) };
        return Some(128 + signal);
    }

    None
}

/// A transparent POSIX wait-status word: the raw value kernel `wait`/`waitpid`
/// hands back, still discriminable via `WIFEXITED`/`WIFSIGNALED`/`WIFSTOPPED`/
/// `WIFCONTINUED`. The job table never decodes this eagerly — it keeps the raw
/// word around, using `Option<RawStatus>` for "no status observed yet" in
/// place of a sentinel value, so a stopped-then-continued-then-exited
/// process reports the right thing at each step.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct RawStatus(pub libc::c_int);

#[cfg(unix)]
impl RawStatus {
    pub fn exited(self) -> bool {
        unsafe { libc::WIFEXITED(self.0) }
    }

    pub fn exit_status(self) -> i32 {
        unsafe { libc::WEXITSTATUS(self.0) }
    }

    pub fn signaled(self) -> bool {
        unsafe { libc::WIFSIGNALED(self.0) }
    }

    pub fn term_signal(self) -> i32 {
        unsafe { libc::WTERMSIG(self.0) }
    }

    pub fn stopped(self) -> bool {
        unsafe { libc::WIFSTOPPED(self.0) }
    }

    pub fn continued(self) -> bool {
        unsafe { libc::WIFCONTINUED(self.0) }
    }

    /// Shell-style exit code: `WEXITSTATUS` if exited, `128 + signal` if
    /// signaled, else 0 (stopped/continued have no "exit code").
    pub fn shell_exit_code(self) -> i32 {
        if self.exited() {
            self.exit_status()
        } else if self.signaled() {
            128 + self.term_signal()
        } else {
            0
        }
    }
}
