//! The job table: process-group lifecycle bookkeeping for every
//! pipeline the shell has launched. Slot 0 is reserved for the foreground
//! job; background slots are a sparse, densely-reused set of small
//! integers that stay stable and user-visible for the life of the job.
//!
//! Every public mutator here assumes `SIGCHLD` is already blocked by the
//! caller — this module does not take the lock itself, it is the
//! resource the lock protects.

use crate::status::RawStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Stopped,
    Finished,
}

/// One process within a job's pipeline.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: libc::pid_t,
    pub state: ProcState,
    /// `None` means no wait status has been observed yet.
    pub status: Option<RawStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Finished,
}

/// A job: one or more processes sharing a process group, launched from a
/// single command line.
#[derive(Debug, Clone)]
pub struct Job {
    pub pgid: libc::pid_t,
    pub processes: Vec<Process>,
    /// `argv0 a1 … | argv0 b1 …`, built incrementally by `addproc`.
    pub command: String,
}

/// Aggregate state: RUNNING if any process RUNNING; else STOPPED if any
/// STOPPED; else FINISHED.
pub fn aggregate_state(job: &Job) -> JobState {
    if job.processes.iter().any(|p| p.state == ProcState::Running) {
        JobState::Running
    } else if job.processes.iter().any(|p| p.state == ProcState::Stopped) {
        JobState::Stopped
    } else {
        JobState::Finished
    }
}

enum Slot {
    Free,
    Occupied(Job),
}

/// Which jobs a `watchjobs` sweep should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFilter {
    Running,
    Stopped,
    Finished,
    All,
}

impl JobFilter {
    fn matches(self, state: JobState) -> bool {
        match self {
            JobFilter::All => true,
            JobFilter::Running => state == JobState::Running,
            JobFilter::Stopped => state == JobState::Stopped,
            JobFilter::Finished => state == JobState::Finished,
        }
    }
}

/// A pid-and-before/after record for a state transition observed by the
/// reaper, used to choose between "running" and "continue" in the report
/// line (see `reaper.rs`).
pub struct Transition {
    pub slot: usize,
    pub before: JobState,
    pub after: JobState,
}

pub struct JobTable {
    slots: Vec<Slot>,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        // Slot 0 always exists so FG is addressable without an Option lookup.
        Self {
            slots: vec![Slot::Free],
        }
    }

    fn lowest_free_bg(&self) -> usize {
        for (i, slot) in self.slots.iter().enumerate().skip(1) {
            if matches!(slot, Slot::Free) {
                return i;
            }
        }
        self.slots.len().max(1)
    }

    /// addjob(pgid, bg) → slot. Prints `[slot] pgid` when backgrounded.
    pub fn addjob(&mut self, pgid: libc::pid_t, bg: bool) -> usize {
        let slot = if bg { self.lowest_free_bg() } else { 0 };
        while slot >= self.slots.len() {
            self.slots.push(Slot::Free);
        }
        self.slots[slot] = Slot::Occupied(Job {
            pgid,
            processes: Vec::new(),
            command: String::new(),
        });
        if bg {
            crate::report::msg(format!("[{slot}] {pgid}"));
        }
        slot
    }

    /// addproc(slot, pid, argv). Appends ` | ` + the joined argv to the job's
    /// command string when it is not the first process in the pipeline.
    pub fn addproc(&mut self, slot: usize, pid: libc::pid_t, argv: &[String]) {
        if let Some(Slot::Occupied(job)) = self.slots.get_mut(slot) {
            if !job.processes.is_empty() {
                job.command.push_str(" | ");
            }
            job.command.push_str(&argv.join(" "));
            job.processes.push(Process {
                pid,
                state: ProcState::Running,
                status: None,
            });
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Job> {
        match self.slots.get(slot) {
            Some(Slot::Occupied(job)) => Some(job),
            _ => None,
        }
    }

    pub fn is_free(&self, slot: usize) -> bool {
        !matches!(self.slots.get(slot), Some(Slot::Occupied(_)))
    }

    pub fn aggregate(&self, slot: usize) -> Option<JobState> {
        self.get(slot).map(aggregate_state)
    }

    /// jobstate(slot, &status) → state. If FINISHED, captures the last
    /// process's status, deletes the job, and returns it; otherwise
    /// just returns the current aggregate.
    pub fn jobstate(&mut self, slot: usize) -> Option<(JobState, Option<RawStatus>)> {
        let state = self.aggregate(slot)?;
        if state == JobState::Finished {
            let status = self
                .get(slot)
                .and_then(|job| job.processes.last())
                .and_then(|p| p.status);
            self.delete(slot);
            Some((JobState::Finished, status))
        } else {
            Some((state, None))
        }
    }

    /// Delete requires state=FINISHED — enforced by the caller via
    /// `jobstate`/`watchjobs`; this is the mechanical zero-the-slot step.
    pub fn delete(&mut self, slot: usize) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = Slot::Free;
        }
    }

    /// movejob(from, to). Requires `to` free; destructively copies and
    /// clears `from`.
    pub fn movejob(&mut self, from: usize, to: usize) -> bool {
        if !self.is_free(to) || self.is_free(from) {
            return false;
        }
        while to >= self.slots.len() {
            self.slots.push(Slot::Free);
        }
        let job = std::mem::replace(&mut self.slots[from], Slot::Free);
        self.slots[to] = job;
        true
    }

    /// Mark every process in `slot` RUNNING. Used by `resumejob` right after
    /// sending `SIGCONT`: the kernel's matching `WIFCONTINUED` event may not
    /// have been reaped yet by the time the foreground monitor starts
    /// polling, so the job table needs to reflect the resumption immediately
    /// rather than have the monitor briefly observe a stale STOPPED.
    pub fn mark_running(&mut self, slot: usize) {
        if let Some(Slot::Occupied(job)) = self.slots.get_mut(slot) {
            for process in &mut job.processes {
                process.state = ProcState::Running;
            }
        }
    }

    /// killjob(slot). SIGCONT (if stopped) then SIGTERM to the group.
    /// Returns false if the slot is free or already finished.
    pub fn killjob(&mut self, slot: usize) -> bool {
        let Some(job) = self.get(slot) else {
            return false;
        };
        let state = aggregate_state(job);
        if state == JobState::Finished {
            return false;
        }
        let pgid = job.pgid;
        if state == JobState::Stopped {
            let _ = crate::job_control::send_continue_to_group(pgid);
        }
        unsafe {
            libc::kill(-pgid, libc::SIGTERM);
        }
        true
    }

    /// Feed one reaped `(pid, status)` pair into the table. Returns the
    /// transition if the owning job's aggregate state changed, `None`
    /// otherwise (including when the pid belongs to no tracked job, which
    /// is silently ignored).
    pub fn apply_reap(&mut self, pid: libc::pid_t, status: RawStatus) -> Option<Transition> {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            let Slot::Occupied(job) = entry else {
                continue;
            };
            let Some(process) = job.processes.iter_mut().find(|p| p.pid == pid) else {
                continue;
            };
            let before = aggregate_state(job);
            if status.exited() || status.signaled() {
                process.state = ProcState::Finished;
            } else if status.stopped() {
                process.state = ProcState::Stopped;
            } else if status.continued() {
                process.state = ProcState::Running;
            }
            process.status = Some(status);
            let after = aggregate_state(job);
            return if before != after {
                Some(Transition { slot, before, after })
            } else {
                None
            };
        }
        None
    }

    /// watchjobs(which). Reports every non-free *background* slot matching
    /// `which`, deleting FINISHED ones after reporting (slot 0 is never
    /// reported here — the monitor reports the foreground job directly).
    pub fn watchjobs(&mut self, which: JobFilter) -> Vec<String> {
        let mut lines = Vec::new();
        let mut finished = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if i == 0 {
                continue;
            }
            if let Slot::Occupied(job) = slot {
                let state = aggregate_state(job);
                if !which.matches(state) {
                    continue;
                }
                lines.push(report_line(i, job, None, state));
                if state == JobState::Finished {
                    finished.push(i);
                }
            }
        }
        for slot in finished {
            self.delete(slot);
        }
        lines
    }

    /// The highest-numbered live (non-free) background slot, the `fg`/`bg`
    /// default when no job-spec is given.
    pub fn highest_live(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, s)| matches!(s, Slot::Occupied(_)))
            .map(|(i, _)| i)
    }

    /// All non-free background slots, ascending — used by `shutdownjobs`.
    pub fn live_background_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| matches!(s, Slot::Occupied(_)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Serialize every occupied slot (pgid, aggregate state, command text)
    /// into a compact line-oriented form. A builtin that is re-exec'd as a
    /// pipeline stage or background job (see `pipeline::self_exec_builtin`)
    /// runs in a fresh process with no other way to see the real job
    /// table across `execve`; this is how that snapshot gets there.
    pub fn encode_snapshot(&self) -> String {
        let mut out = String::new();
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Slot::Occupied(job) = entry {
                let code = match aggregate_state(job) {
                    JobState::Running => 'R',
                    JobState::Stopped => 'S',
                    JobState::Finished => 'F',
                };
                out.push_str(&format!("{slot}\t{}\t{code}\t{}\n", job.pgid, job.command));
            }
        }
        out
    }

    /// Reconstruct a table from `encode_snapshot`'s output. Each slot gets
    /// one synthetic process whose state mirrors the recorded aggregate —
    /// enough for `jobs` to report and `kill %n` to signal the right pgid
    /// correctly. Not enough for `fg`/`bg`, which need to actually migrate a
    /// job into this process's slot 0 and take the terminal — those are
    /// refused before a snapshot table is ever built (see
    /// `main::run_reexeced_builtin`).
    pub fn decode_snapshot(text: &str) -> Self {
        let mut table = Self::new();
        for line in text.lines() {
            let mut fields = line.splitn(4, '\t');
            let (Some(slot), Some(pgid), Some(code), Some(command)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let (Ok(slot), Ok(pgid)) = (slot.parse::<usize>(), pgid.parse::<libc::pid_t>()) else {
                continue;
            };
            let state = match code {
                "S" => ProcState::Stopped,
                "F" => ProcState::Finished,
                _ => ProcState::Running,
            };
            while slot >= table.slots.len() {
                table.slots.push(Slot::Free);
            }
            table.slots[slot] = Slot::Occupied(Job {
                pgid,
                processes: vec![Process {
                    pid: pgid,
                    state,
                    status: None,
                }],
                command: command.to_string(),
            });
        }
        table
    }
}

/// Render one job-status reporting line. `before` disambiguates "running"
/// from "continue" (Stopped → Running) — `None` callers (the generic
/// `watchjobs` sweep) always get "running".
pub fn report_line(slot: usize, job: &Job, before: Option<JobState>, after: JobState) -> String {
    let cmd = &job.command;
    match after {
        JobState::Running => {
            if before == Some(JobState::Stopped) {
                format!("[{slot}] continue '{cmd}'")
            } else {
                format!("[{slot}] running '{cmd}'")
            }
        }
        JobState::Stopped => format!("[{slot}] suspended '{cmd}'"),
        JobState::Finished => match job.processes.last().and_then(|p| p.status) {
            Some(status) if status.signaled() => {
                format!("[{slot}] killed '{cmd}' by signal {}", status.term_signal())
            }
            Some(status) => format!("[{slot}] exited '{cmd}', status={}", status.exit_status()),
            None => format!("[{slot}] exited '{cmd}', status=0"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: i32) -> RawStatus {
        // WIFEXITED(status) is true when (status & 0x7f) == 0; WEXITSTATUS
        // reads the high byte.
        RawStatus((code & 0xff) << 8)
    }

    fn signaled(sig: i32) -> RawStatus {
        // WIFSIGNALED(status) is true when the low 7 bits are a signal
        // number in (0, 0x7f), excluding the stop sentinel 0x7f.
        RawStatus(sig & 0x7f)
    }

    fn stopped(sig: i32) -> RawStatus {
        // WIFSTOPPED is `(status & 0xff) == 0x7f`; WSTOPSIG reads the next byte.
        RawStatus(((sig & 0xff) << 8) | 0x7f)
    }

    #[test]
    fn addjob_allocates_fg_slot_zero() {
        let mut table = JobTable::new();
        let slot = table.addjob(123, false);
        assert_eq!(slot, 0);
    }

    #[test]
    fn addjob_reuses_lowest_free_bg_slot() {
        let mut table = JobTable::new();
        let a = table.addjob(1, true);
        let b = table.addjob(2, true);
        assert_eq!((a, b), (1, 2));
        table.delete(a);
        let c = table.addjob(3, true);
        assert_eq!(c, 1, "lowest free slot should be reused before appending");
    }

    #[test]
    fn aggregate_state_prefers_running_then_stopped_then_finished() {
        let mut table = JobTable::new();
        let slot = table.addjob(10, true);
        table.addproc(slot, 10, &["sleep".into(), "1".into()]);
        table.addproc(slot, 11, &["cat".into()]);
        assert_eq!(table.aggregate(slot), Some(JobState::Running));

        table.apply_reap(10, stopped(libc::SIGTSTP));
        // one stopped, one still running -> still RUNNING
        assert_eq!(table.aggregate(slot), Some(JobState::Running));

        table.apply_reap(11, stopped(libc::SIGTSTP));
        assert_eq!(table.aggregate(slot), Some(JobState::Stopped));

        table.apply_reap(10, exited(0));
        table.apply_reap(11, exited(0));
        assert_eq!(table.aggregate(slot), Some(JobState::Finished));
    }

    #[test]
    fn jobstate_deletes_on_finished_and_reports_last_status() {
        let mut table = JobTable::new();
        let slot = table.addjob(20, true);
        table.addproc(slot, 20, &["false".into()]);
        table.apply_reap(20, exited(1));

        let (state, status) = table.jobstate(slot).unwrap();
        assert_eq!(state, JobState::Finished);
        assert_eq!(status.unwrap().exit_status(), 1);
        assert!(table.is_free(slot), "finished jobs are deleted");
    }

    #[test]
    fn watchjobs_finished_frees_every_reported_slot() {
        let mut table = JobTable::new();
        let a = table.addjob(1, true);
        table.addproc(a, 1, &["true".into()]);
        let b = table.addjob(2, true);
        table.addproc(b, 2, &["sleep".into(), "5".into()]);

        table.apply_reap(1, exited(0));
        let lines = table.watchjobs(JobFilter::Finished);
        assert_eq!(lines.len(), 1);
        assert!(table.is_free(a));
        assert!(!table.is_free(b), "still-running job must survive the sweep");
    }

    #[test]
    fn killjob_round_trips_to_a_free_slot() {
        let mut table = JobTable::new();
        let slot = table.addjob(999999, true); // bogus pgid, never really signaled
        table.addproc(slot, 999999, &["sleep".into(), "99".into()]);
        assert!(table.killjob(slot));
        table.apply_reap(999999, signaled(libc::SIGTERM));
        let (state, _) = table.jobstate(slot).unwrap();
        assert_eq!(state, JobState::Finished);
        assert!(table.is_free(slot));
    }

    #[test]
    fn apply_reap_ignores_unknown_pid() {
        let mut table = JobTable::new();
        assert!(table.apply_reap(424242, exited(0)).is_none());
    }

    #[test]
    fn report_line_distinguishes_continue_from_running() {
        let mut table = JobTable::new();
        let slot = table.addjob(5, true);
        table.addproc(slot, 5, &["sleep".into(), "5".into()]);
        let job = table.get(slot).unwrap();
        let running = report_line(slot, job, None, JobState::Running);
        let continued = report_line(slot, job, Some(JobState::Stopped), JobState::Running);
        assert!(running.contains("running"));
        assert!(continued.contains("continue"));
    }

    #[test]
    fn movejob_requires_destination_free() {
        let mut table = JobTable::new();
        let a = table.addjob(1, true);
        let b = table.addjob(2, true);
        assert!(!table.movejob(a, b), "destination occupied");
        table.delete(b);
        assert!(table.movejob(a, b));
        assert!(table.is_free(a));
        assert_eq!(table.get(b).unwrap().pgid, 1);
    }

    #[test]
    fn snapshot_round_trips_pgid_state_and_command() {
        let mut table = JobTable::new();
        let slot = table.addjob(4242, true);
        table.addproc(slot, 4242, &["sleep".into(), "30".into()]);
        table.apply_reap(4242, stopped(libc::SIGTSTP));
        assert_eq!(table.aggregate(slot), Some(JobState::Stopped));

        let restored = JobTable::decode_snapshot(&table.encode_snapshot());
        let job = restored.get(slot).unwrap();
        assert_eq!(job.pgid, 4242);
        assert_eq!(job.command, "sleep 30");
        assert_eq!(restored.aggregate(slot), Some(JobState::Stopped));
    }
}
