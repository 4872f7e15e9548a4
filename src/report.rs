//! A line-oriented sink for job-control reporting (`[n] running '…'`,
//! `[n] exited '…', status=0`, …), kept distinct from `tracing`'s internal
//! diagnostics — this is user-facing shell output, not a log line, so it
//! always goes to stdout by line rather than through a subscriber.

pub fn msg(line: impl AsRef<str>) {
    println!("{}", line.as_ref());
}
