//! The orderly-exit path run on `quit`/EOF. Every live background job is
//! signaled and reaped before the shell itself exits, so `quit` never
//! abandons a stopped or running background pipeline.

use crate::job::{JobFilter, JobTable};
use crate::job_control::SigchldBlockGuard;

/// Terminate every live background job and reap them before returning.
pub fn run(table: &mut JobTable) {
    let _mask = SigchldBlockGuard::block();

    for slot in table.live_background_slots() {
        table.killjob(slot);
    }

    // Blocking wait: every signaled pgid must actually exit before the
    // shell does, or its children would be silently orphaned mid-signal.
    while !table.live_background_slots().is_empty() {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, 0) };
        if pid <= 0 {
            break;
        }
        table.apply_reap(pid, crate::status::RawStatus(raw_status));
    }

    for line in table.watchjobs(JobFilter::Finished) {
        crate::report::msg(line);
    }
}
