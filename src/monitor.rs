//! The foreground monitor: transfers the controlling terminal to the
//! foreground job's process group, blocks until it leaves RUNNING under a
//! disciplined signal mask, then classifies the outcome and restores the
//! shell's ownership of the terminal.
//!
//! Precondition: a foreground job exists in slot 0, and `SIGCHLD` is
//! blocked in the caller's mask (an active `SigchldBlockGuard` — see
//! `pipeline.rs`, which holds one across fork-and-register and hands
//! control here without ever unblocking in between).

use crate::job::{JobState, JobTable};
use crate::job_control::{ForegroundTerminalGuard, TerminalAttrs};
use crate::reaper;

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// The job ran to completion (or was killed by a signal); carries the
    /// shell-style exit code (`128 + signal` when signaled).
    Exited(i32),
    /// The job was stopped (Ctrl-Z) and has been parked in a background slot.
    Stopped,
}

/// Run the monitor loop for the job currently in slot 0.
pub fn run_foreground(table: &mut JobTable) -> Outcome {
    let pgid = table
        .get(0)
        .map(|job| job.pgid)
        .expect("run_foreground requires a job in slot 0");

    let saved_attrs = TerminalAttrs::capture(libc::STDIN_FILENO);

    // Transfers terminal ownership to the job's pgid; its `Drop` hands it
    // back to the shell's own group when this function returns, covering
    // both the STOPPED and FINISHED outcomes.
    let terminal = ForegroundTerminalGuard::new(pgid).ok();

    loop {
        reaper::drain(table);
        match table.aggregate(0) {
            Some(JobState::Running) | None => {
                crate::job_control::sigsuspend_unblocked();
            }
            Some(_) => break,
        }
    }

    // Terminal foreground back to the shell first, then the saved termios.
    drop(terminal);
    if let Some(attrs) = &saved_attrs {
        attrs.restore();
    }

    match table.aggregate(0) {
        Some(JobState::Stopped) => {
            let to = allocate_bg_slot(table);
            table.movejob(0, to);
            for line in table.watchjobs(crate::job::JobFilter::Stopped) {
                crate::report::msg(line);
            }
            Outcome::Stopped
        }
        _ => {
            let (_, status) = table.jobstate(0).unwrap_or((JobState::Finished, None));
            Outcome::Exited(status.map(|s| s.shell_exit_code()).unwrap_or(0))
        }
    }
}

fn allocate_bg_slot(table: &JobTable) -> usize {
    // Mirrors JobTable::addjob's own "lowest free ≥1" rule without
    // re-running the pgid/reporting side effects `addjob` has, since the
    // job already exists — `movejob` is the right primitive here.
    let mut slot = 1;
    while !table.is_free(slot) {
        slot += 1;
    }
    slot
}
