use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod builtins;
mod editor;
mod error;
mod exec;
mod job;
mod job_control;
mod monitor;
mod pipeline;
mod reaper;
mod redirect;
mod repl;
mod report;
mod shutdown;
mod status;
mod token;
mod tokenizer;

/// Hidden re-entry flag: a pipeline stage that is a built-in re-invokes
/// this same binary with this flag so it runs as a genuinely forked child
/// that can join the pipeline's process group — `std::process::Command`
/// has no "fork only" primitive, so the built-in's own binary stands in for
/// the fork-then-run-in-child step a raw `fork()` would give for free.
pub const BUILTIN_REEXEC_FLAG: &str = "--jobsh-run-builtin";

/// Environment variable carrying `JobTable::encode_snapshot`'s output into
/// a re-exec'd builtin: a real `fork()` would have handed the child a
/// copy-on-write view of the live table for free, but `execve` replaces the
/// address space entirely, so the snapshot has to cross the re-exec some
/// other way for `jobs`/`kill %n` to see real state instead of an always-
/// empty table.
pub const JOB_SNAPSHOT_ENV: &str = "JOBSH_JOB_SNAPSHOT";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let rest: Vec<String> = std::env::args().skip(1).collect();

    if rest.first().map(String::as_str) == Some(BUILTIN_REEXEC_FLAG) {
        std::process::exit(run_reexeced_builtin(&rest[1..]));
    }

    let mut table = job::JobTable::new();
    seize_terminal_and_process_group()?;
    reaper::install();
    tracing::info!("jobsh starting up");
    let code = repl::run(&mut table);
    std::process::exit(code);
}

/// The `--jobsh-run-builtin` re-entry path: rebuilds a read-only snapshot
/// of the real job table from `JOB_SNAPSHOT_ENV` (see `pipeline::
/// self_exec_builtin`), enough for `jobs` to report and `kill %n` to signal
/// the right process group. `fg`/`bg` need more than a snapshot can give
/// them — moving a job into this process's slot 0 and taking the terminal
/// only means something in the shell that actually owns both — so they are
/// refused here rather than silently acting on a table nobody will ever
/// look at again once this process exits.
fn run_reexeced_builtin(argv: &[String]) -> i32 {
    if argv.is_empty() {
        return 1;
    }
    if matches!(argv[0].as_str(), "fg" | "bg") {
        eprintln!("{}: no job control in this context", argv[0]);
        return 1;
    }
    let snapshot = std::env::var(JOB_SNAPSHOT_ENV).unwrap_or_default();
    let mut table = job::JobTable::decode_snapshot(&snapshot);
    match builtins::execute(argv, &mut table) {
        builtins::Outcome::Code(code) => code,
        builtins::Outcome::Quit(code) => code,
    }
}

/// Place the shell in its own process group and seize the controlling
/// terminal. These two syscalls are load-bearing: nothing downstream can
/// maintain job control without them, so failure here propagates out of
/// `main` via `anyhow` rather than being swallowed.
fn seize_terminal_and_process_group() -> anyhow::Result<()> {
    use anyhow::{bail, Context};

    unsafe {
        let pid = libc::getpid();
        if libc::setpgid(pid, pid) != 0 {
            let err = std::io::Error::last_os_error();
            // EPERM here means we're already a session/group leader (common
            // under a test harness or `nohup`) — not fatal.
            if err.raw_os_error() != Some(libc::EPERM) {
                return Err(err).context("setpgid(0, 0) failed during shell startup");
            }
        }

        if libc::isatty(libc::STDIN_FILENO) == 1 {
            libc::signal(libc::SIGTTOU, libc::SIG_IGN);
            if libc::tcsetpgrp(libc::STDIN_FILENO, pid) != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ENOTTY) {
                    bail!("tcsetpgrp failed while seizing the controlling terminal: {err}");
                }
            }
        }

        libc::signal(libc::SIGTSTP, libc::SIG_IGN);
        libc::signal(libc::SIGTTIN, libc::SIG_IGN);
        libc::signal(libc::SIGTTOU, libc::SIG_IGN);
    }

    Ok(())
}
