#[cfg(unix)]
use std::io;

#[cfg(unix)]
pub(crate) enum WaitOutcome {
    Exited(i32),
    Stopped,
}

#[cfg(unix)]
pub(crate) fn set_process_group(pid: libc::pid_t, pgid: libc::pid_t) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::setpgid(pid, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EINTR => continue,
            // Already exec'd or gone; caller can proceed with best-effort behavior.
            Some(code) if code == libc::EACCES || code == libc::ESRCH => return Ok(()),
            _ => return Err(err),
        }
    }
}

#[cfg(unix)]
pub(crate) fn process_group_id(pid: libc::pid_t) -> io::Result<libc::pid_t> {
    loop {
        let rc = unsafe { libc::getpgid(pid) };
        if rc >= 0 {
            return Ok(rc);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

#[cfg(unix)]
pub(crate) fn send_continue_to_group(pgid: libc::pid_t) -> io::Result<()> {
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process group id",
        ));
    }

    loop {
        let rc = unsafe { libc::kill(-pgid, libc::SIGCONT) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

#[cfg(unix)]
pub(crate) struct ForegroundTerminalGuard {
    tty_fd: Option<libc::c_int>,
    shell_pgid: libc::pid_t,
}

#[cfg(unix)]
impl ForegroundTerminalGuard {
    pub(crate) fn new(target_pgid: libc::pid_t) -> io::Result<Self> {
        let tty_fd = if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
            Some(libc::STDIN_FILENO)
        } else {
            None
        };

        let shell_pgid = unsafe { libc::getpgrp() };
        let guard = Self { tty_fd, shell_pgid };

        if let Some(fd) = guard.tty_fd {
            set_terminal_foreground(fd, target_pgid)?;
        }

        Ok(guard)
    }
}

#[cfg(unix)]
impl Drop for ForegroundTerminalGuard {
    fn drop(&mut self) {
        if let Some(fd) = self.tty_fd {
            let _ = set_terminal_foreground(fd, self.shell_pgid);
        }
    }
}

#[cfg(unix)]
pub(crate) fn wait_for_pid(pid: libc::pid_t) -> io::Result<WaitOutcome> {
    let mut raw_status: libc::c_int = 0;

    loop {
        let rc = unsafe { libc::waitpid(pid, &mut raw_status, libc::WUNTRACED) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }

        if unsafe { libc::WIFSTOPPED(raw_status) } {
            return Ok(WaitOutcome::Stopped);
        }

        if let Some(code) = crate::status::exit_code_from_wait_status(raw_status) {
            return Ok(WaitOutcome::Exited(code));
        }
    }
}

#[cfg(unix)]
struct SignalIgnoreGuard {
    signal: libc::c_int,
    previous: libc::sighandler_t,
}

#[cfg(unix)]
impl SignalIgnoreGuard {
    fn ignore(signal: libc::c_int) -> io::Result<Self> {
        let previous = unsafe { libc::signal(signal, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { signal, previous })
    }
}

#[cfg(unix)]
impl Drop for SignalIgnoreGuard {
    fn drop(&mut self) {
        unsafe {
            libc::signal(self.signal, self.previous);
        }
    }
}

/// Blocks `SIGCHLD` for as long as it is held, restoring the prior signal
/// mask on drop. Every mainline read or mutation of the job table happens
/// while one of these is alive, so the reaper (run from the mainline drain
/// point, never from signal context itself — see `reaper.rs`) cannot be
/// invoked by the kernel mid-mutation.
#[cfg(unix)]
pub(crate) struct SigchldBlockGuard {
    previous: libc::sigset_t,
}

#[cfg(unix)]
impl SigchldBlockGuard {
    pub(crate) fn block() -> Self {
        unsafe {
            let mut set: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, libc::SIGCHLD);
            let mut previous: libc::sigset_t = std::mem::zeroed();
            libc::sigprocmask(libc::SIG_BLOCK, &set, &mut previous);
            Self { previous }
        }
    }
}

#[cfg(unix)]
impl Drop for SigchldBlockGuard {
    fn drop(&mut self) {
        unsafe {
            libc::sigprocmask(libc::SIG_SETMASK, &self.previous, std::ptr::null_mut());
        }
    }
}

/// Atomically unblock every signal and suspend the calling thread until one
/// arrives, then restore whatever mask was in effect before the call. Used
/// by the foreground monitor's wait loop: `SIGCHLD` is blocked on entry (an
/// active `SigchldBlockGuard`), so the gap between unblocking and sleeping
/// that a bare `sigprocmask` followed by a blocking wait would leave open is
/// closed by the kernel doing both in one syscall.
#[cfg(unix)]
pub(crate) fn sigsuspend_unblocked() {
    unsafe {
        let mut empty: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut empty);
        libc::sigsuspend(&empty);
    }
}

/// RAII snapshot of the terminal's `termios` state, restored on request, not
/// on drop — the monitor restores explicitly only on the STOPPED/FINISHED
/// exit paths, since a child that legitimately changed the terminal mode and
/// is still running should not have it yanked back.
#[cfg(unix)]
pub(crate) struct TerminalAttrs {
    fd: libc::c_int,
    saved: libc::termios,
}

#[cfg(unix)]
impl TerminalAttrs {
    pub(crate) fn capture(fd: libc::c_int) -> Option<Self> {
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut saved) } == 0 {
            Some(Self { fd, saved })
        } else {
            None
        }
    }

    pub(crate) fn restore(&self) {
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSADRAIN, &self.saved);
        }
    }
}

/// Shared `pre_exec` hook for every forked pipeline stage, builtin or
/// external, matching spec's child-side step order: unblock `SIGCHLD` (the
/// parent holds it blocked across the whole fork-and-register sequence —
/// see `SigchldBlockGuard` — and that blocked-set membership survives
/// `execve`, unlike dispositions, so it has to be undone here explicitly),
/// join or create the pipeline's process group, then reset the job-control
/// signals the shell ignores back to their default disposition (they too
/// survive `exec` otherwise). `pgid = None` means "become the leader"
/// (`setpgid(0, 0)`); `Some(leader)` joins an existing group.
#[cfg(unix)]
pub(crate) fn install_group_and_signal_reset(
    command: &mut std::process::Command,
    pgid: Option<libc::pid_t>,
) {
    use std::os::unix::process::CommandExt;
    unsafe {
        command.pre_exec(move || {
            let mut chld_set: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut chld_set);
            libc::sigaddset(&mut chld_set, libc::SIGCHLD);
            if libc::sigprocmask(libc::SIG_UNBLOCK, &chld_set, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }

            let target = pgid.unwrap_or(0);
            if libc::setpgid(0, target) != 0 {
                return Err(io::Error::last_os_error());
            }

            for signal in [
                libc::SIGCHLD,
                libc::SIGINT,
                libc::SIGTSTP,
                libc::SIGTTIN,
                libc::SIGTTOU,
            ] {
                if libc::signal(signal, libc::SIG_DFL) == libc::SIG_ERR {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(())
        });
    }
}

/// RAII: temporarily `dup2`s `input`/`output` onto fd 0/1 for the duration
/// of a closure run in-process. Foreground builtins never fork, so C2's
/// already-opened redirection files have to be installed onto the real
/// descriptors and torn down around the call instead of being inherited
/// across an `exec` the way a forked stage's redirections are.
#[cfg(unix)]
pub(crate) struct StdioRedirectGuard {
    saved_stdin: Option<libc::c_int>,
    saved_stdout: Option<libc::c_int>,
}

#[cfg(unix)]
impl StdioRedirectGuard {
    pub(crate) fn install(input: Option<&std::fs::File>, output: Option<&std::fs::File>) -> Self {
        use std::os::unix::io::AsRawFd;
        let saved_stdin = input.map(|file| {
            let saved = unsafe { libc::dup(libc::STDIN_FILENO) };
            unsafe { libc::dup2(file.as_raw_fd(), libc::STDIN_FILENO) };
            saved
        });
        let saved_stdout = output.map(|file| {
            let saved = unsafe { libc::dup(libc::STDOUT_FILENO) };
            unsafe { libc::dup2(file.as_raw_fd(), libc::STDOUT_FILENO) };
            saved
        });
        Self {
            saved_stdin,
            saved_stdout,
        }
    }
}

#[cfg(unix)]
impl Drop for StdioRedirectGuard {
    fn drop(&mut self) {
        if let Some(fd) = self.saved_stdin {
            unsafe {
                libc::dup2(fd, libc::STDIN_FILENO);
                libc::close(fd);
            }
        }
        if let Some(fd) = self.saved_stdout {
            unsafe {
                libc::dup2(fd, libc::STDOUT_FILENO);
                libc::close(fd);
            }
        }
    }
}

#[cfg(unix)]
fn set_terminal_foreground(fd: libc::c_int, pgid: libc::pid_t) -> io::Result<()> {
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process group id",
        ));
    }

    let _sigttou = SignalIgnoreGuard::ignore(libc::SIGTTOU)?;
    loop {
        let rc = unsafe { libc::tcsetpgrp(fd, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}
