//! The pipeline launcher: turns one already-tokenized command line
//! into a running job, wiring pipes and redirections and assigning a
//! process group, then either hands off to the foreground monitor or
//! returns immediately for a backgrounded job.

use std::process::{Command, Stdio};

use crate::builtins;
use crate::exec;
use crate::job::JobTable;
use crate::job_control::SigchldBlockGuard;
use crate::monitor;
use crate::redirect::{self, Resolved};
use crate::token::Token;

pub enum LineOutcome {
    Code(i32),
    Quit(i32),
}

/// Run one already-tokenized command line: strip a trailing `&`, split on
/// `|`, and delegate to the single- or multi-stage path.
pub fn run_line(mut tokens: Vec<Token>, table: &mut JobTable) -> Result<LineOutcome, String> {
    if tokens.is_empty() {
        return Ok(LineOutcome::Code(0));
    }

    let background = matches!(tokens.last(), Some(Token::Background));
    if background {
        tokens.pop();
    }
    if tokens.is_empty() {
        // "&" alone on a line is treated as empty: no job created.
        return Ok(LineOutcome::Code(0));
    }

    let stages = split_stages(&tokens)?;

    if stages.len() == 1 {
        do_job(stages.into_iter().next().unwrap(), background, table)
    } else {
        do_pipeline(stages, background, table)
    }
}

fn split_stages(tokens: &[Token]) -> Result<Vec<Vec<Token>>, String> {
    // `;`, `&&`, and `||` are recognized by the tokenizer but not
    // implemented as control flow: seeing one where the grammar expects a
    // single pipeline is a structural error, not a silent no-op.
    if tokens
        .iter()
        .any(|t| matches!(t, Token::Semicolon | Token::And | Token::Or))
    {
        return Err("command line is not well formed".to_string());
    }

    let mut stages: Vec<Vec<Token>> = vec![Vec::new()];
    for token in tokens {
        if matches!(token, Token::Pipe) {
            stages.push(Vec::new());
        } else {
            stages.last_mut().unwrap().push(token.clone());
        }
    }
    if stages.iter().any(Vec::is_empty) {
        return Err("command line is not well formed".to_string());
    }
    Ok(stages)
}

/// Runs a command line with no `|` stages: resolve redirections, dispatch a
/// foreground built-in in-process, or fork-and-register everything else as
/// a one-process job.
fn do_job(tokens: Vec<Token>, background: bool, table: &mut JobTable) -> Result<LineOutcome, String> {
    let resolved = redirect::resolve(tokens).map_err(|e| e.to_string())?;
    if resolved.args.is_empty() {
        return Ok(LineOutcome::Code(0));
    }

    // Step 2: a foreground built-in runs in-process and returns directly —
    // no job is ever created for it. It still doesn't fork, so C2's opened
    // redirection files have to be dup2'd onto fd 0/1 around the call by
    // hand and restored after, rather than being inherited across an exec.
    if !background && builtins::is_builtin(&resolved.args[0]) {
        let _redirect =
            crate::job_control::StdioRedirectGuard::install(resolved.input.as_ref(), resolved.output.as_ref());
        return Ok(match builtins::execute(&resolved.args, table) {
            builtins::Outcome::Code(code) => LineOutcome::Code(code),
            builtins::Outcome::Quit(code) => LineOutcome::Quit(code),
        });
    }

    // Steps 3-4: fork (realized as spawn()), register, monitor-or-return.
    // SIGCHLD stays blocked for the whole fork-and-register sequence so the
    // reaper can never observe a pid before its job entry exists.
    let _mask = SigchldBlockGuard::block();

    let mut command = stage_command(&resolved, None, None, None, table)?;
    let child = spawn(&mut command, &resolved.args[0])?;
    let pid = child.id() as libc::pid_t;
    let _ = crate::job_control::set_process_group(pid, pid);
    // `Child` is dropped here without `wait()`ing — by design. Reaping goes
    // through the job table's own waitpid calls (reaper.rs), not through
    // this handle; dropping it does not reap or signal the child.
    drop(child);

    let slot = table.addjob(pid, background);
    table.addproc(slot, pid, &resolved.args);

    if background {
        return Ok(LineOutcome::Code(0));
    }

    Ok(match monitor::run_foreground(table) {
        monitor::Outcome::Exited(code) => LineOutcome::Code(code),
        monitor::Outcome::Stopped => LineOutcome::Code(0),
    })
}

/// Runs a command line with two or more `|`-joined stages: one job, one
/// process per stage, all sharing the first stage's pgid.
fn do_pipeline(
    stages: Vec<Vec<Token>>,
    background: bool,
    table: &mut JobTable,
) -> Result<LineOutcome, String> {
    let resolved_stages: Vec<Resolved> = stages
        .into_iter()
        .map(redirect::resolve)
        .collect::<Result<_, _>>()
        .map_err(|e: crate::error::RedirectError| e.to_string())?;

    // Every stage's argv must be non-empty before any stage is forked — a
    // stage that is purely redirection tokens (`> out.txt | cat`) resolves
    // to an empty argv, and catching that mid-loop would leave earlier
    // stages already spawned with no job-table entry to reap them through.
    if resolved_stages.iter().any(|r| r.args.is_empty()) {
        return Err("command line is not well formed".to_string());
    }

    let _mask = SigchldBlockGuard::block();

    let mut pgid: Option<libc::pid_t> = None;
    let mut argvs: Vec<Vec<String>> = Vec::new();
    let mut pids: Vec<libc::pid_t> = Vec::new();
    let mut next_stdin: Option<Stdio> = None;

    let n = resolved_stages.len();
    for (i, resolved) in resolved_stages.iter().enumerate() {
        let is_last = i + 1 == n;
        let stdin_override = next_stdin.take();
        let stdout_override = if is_last {
            None
        } else {
            let (reader, writer) = os_pipe::pipe().map_err(|e| format!("pipe: {e}"))?;
            next_stdin = Some(Stdio::from(reader));
            Some(Stdio::from(writer))
        };

        let mut command = stage_command(resolved, pgid, stdin_override, stdout_override, table)?;
        let child = spawn(&mut command, &resolved.args[0])?;
        let pid = child.id() as libc::pid_t;
        drop(child);

        // Parent-side half of the setpgid race: whichever of parent or
        // child wins, the result is the same; the loser's EACCES/ESRCH is
        // swallowed by `set_process_group`.
        let target = pgid.unwrap_or(pid);
        let _ = crate::job_control::set_process_group(pid, target);
        if pgid.is_none() {
            pgid = Some(pid);
        }

        pids.push(pid);
        argvs.push(resolved.args.clone());
    }

    let leader = pgid.expect("pipeline has at least one stage");
    let slot = table.addjob(leader, background);
    for (pid, argv) in pids.iter().zip(argvs.iter()) {
        table.addproc(slot, *pid, argv);
    }

    if background {
        return Ok(LineOutcome::Code(0));
    }

    Ok(match monitor::run_foreground(table) {
        monitor::Outcome::Exited(code) => LineOutcome::Code(code),
        monitor::Outcome::Stopped => LineOutcome::Code(0),
    })
}

/// Build the `Command` for one stage, whether it execs an external program
/// or (mid-pipeline, or backgrounded) re-invokes this binary to run a
/// built-in out of process. A built-in running as any pipeline stage must
/// join the pipeline's process group, which only a forked child can
/// do — `std::process::Command` has no "run this closure in-process" fork
/// primitive, so the built-in's own binary is spawned as that child.
fn stage_command(
    resolved: &Resolved,
    pgid: Option<libc::pid_t>,
    stdin_override: Option<Stdio>,
    stdout_override: Option<Stdio>,
    table: &JobTable,
) -> Result<Command, String> {
    if builtins::is_builtin(&resolved.args[0]) {
        Ok(self_exec_builtin(resolved, pgid, stdin_override, stdout_override, table))
    } else {
        exec::build_command(resolved, pgid, stdin_override, stdout_override).map_err(|e| e.to_string())
    }
}

/// Re-invokes this binary with `BUILTIN_REEXEC_FLAG` so a builtin that must
/// run as a genuinely forked child (any pipeline stage, or backgrounded) can
/// join the pipeline's process group the way `std::process::Command` has no
/// "run this closure in-process" primitive for. `execve` replaces the
/// address space, so the live job table can't just be inherited the way a
/// real `fork()` would give for free — `table`'s contents are serialized
/// into `JOB_SNAPSHOT_ENV` for the re-exec'd process to rebuild (see
/// `main::run_reexeced_builtin`).
fn self_exec_builtin(
    resolved: &Resolved,
    pgid: Option<libc::pid_t>,
    stdin_override: Option<Stdio>,
    stdout_override: Option<Stdio>,
    table: &JobTable,
) -> Command {
    let exe = std::env::current_exe().unwrap_or_else(|_| "jobsh".into());
    let mut command = Command::new(exe);
    command.arg(crate::BUILTIN_REEXEC_FLAG);
    command.args(&resolved.args);
    command.env(crate::JOB_SNAPSHOT_ENV, table.encode_snapshot());
    command.stdin(stdin_override.unwrap_or_else(|| match &resolved.input {
        Some(file) => Stdio::from(file.try_clone().expect("stdin fd clone")),
        None => Stdio::inherit(),
    }));
    command.stdout(stdout_override.unwrap_or_else(|| match &resolved.output {
        Some(file) => Stdio::from(file.try_clone().expect("stdout fd clone")),
        None => Stdio::inherit(),
    }));
    command.stderr(Stdio::inherit());
    #[cfg(unix)]
    crate::job_control::install_group_and_signal_reset(&mut command, pgid);
    command
}

fn spawn(command: &mut Command, argv0: &str) -> Result<std::process::Child, String> {
    command.spawn().map_err(|e| format!("{argv0}: {e}"))
}

/// Continues a STOPPED job and either parks it in place in the background
/// (`foreground = false`) or transfers it to the foreground and monitors it
/// (`foreground = true`).
pub fn resumejob(table: &mut JobTable, slot: usize, foreground: bool) -> i32 {
    let Some(before) = table.aggregate(slot) else {
        return 1;
    };

    if before == crate::job::JobState::Stopped {
        if let Some(job) = table.get(slot) {
            let _ = crate::job_control::send_continue_to_group(job.pgid);
        }
        table.mark_running(slot);
    }

    if foreground {
        if !table.movejob(slot, 0) {
            return 1;
        }
        match monitor::run_foreground(table) {
            monitor::Outcome::Exited(code) => code,
            monitor::Outcome::Stopped => 0,
        }
    } else {
        if let Some(job) = table.get(slot) {
            crate::report::msg(crate::job::report_line(slot, job, Some(before), crate::job::JobState::Running));
        }
        0
    }
}
