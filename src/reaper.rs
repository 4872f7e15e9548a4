//! The child-state reaper. The `SIGCHLD` handler itself does the bare
//! minimum that is async-signal-safe: flip an `AtomicBool`. The actual
//! drain — `waitpid(-1, WNOHANG|WUNTRACED|WCONTINUED)` in a loop, job
//! lookup, state update, aggregate recompute, reporting — runs on the
//! mainline thread, from exactly two call sites: the foreground monitor's
//! wait loop and the REPL's post-command sweep. This message-passing split
//! is observably identical to a handler that touches the table directly,
//! and it means nothing in this module ever allocates or takes a lock from
//! signal context.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::job::JobTable;
use crate::status::RawStatus;

static SIGCHLD_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigchld(_signal: libc::c_int) {
    SIGCHLD_PENDING.store(true, Ordering::SeqCst);
}

/// Install the `SIGCHLD` handler. Call once at shell startup.
pub fn install() {
    unsafe {
        libc::signal(libc::SIGCHLD, handle_sigchld as libc::sighandler_t);
    }
}

/// Drain every ready child via a non-blocking wait, update the job table,
/// and return one report line per job whose aggregate state changed. Safe
/// to call unconditionally — an empty drain is cheap and
/// the `SIGCHLD_PENDING` flag is purely advisory (callers are not required
/// to check it first; this function does its own waitpid regardless, which
/// is simplest and still correct since a stray drain with nothing to reap
/// is a single failing syscall).
pub fn drain(table: &mut JobTable) -> Vec<String> {
    SIGCHLD_PENDING.store(false, Ordering::SeqCst);

    let mut transitions = Vec::new();
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe {
            libc::waitpid(
                -1,
                &mut raw_status,
                libc::WNOHANG | libc::WUNTRACED | libc::WCONTINUED,
            )
        };
        if pid <= 0 {
            break;
        }
        if let Some(transition) = table.apply_reap(pid, RawStatus(raw_status)) {
            transitions.push(transition);
        }
    }

    let mut lines = Vec::new();
    for transition in &transitions {
        // Slot 0 (foreground) is reported by the monitor itself, not here.
        if transition.slot == 0 {
            continue;
        }
        if let Some(job) = table.get(transition.slot) {
            lines.push(crate::job::report_line(
                transition.slot,
                job,
                Some(transition.before),
                transition.after,
            ));
        }
    }
    for transition in &transitions {
        if transition.slot != 0 && transition.after == crate::job::JobState::Finished {
            table.delete(transition.slot);
        }
    }
    lines
}
