//! The built-in dispatcher: the seven job-control and shell-lifecycle
//! commands that run in the shell's own process rather than a forked child.
//! Anything else is "not a built-in" — the caller falls through to the
//! external executor.

use crate::exec;
use crate::job::{JobFilter, JobTable};
use crate::pipeline;
use crate::report;

const BUILTINS: &[&str] = &["quit", "cd", "jobs", "fg", "bg", "kill", "history"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub enum Outcome {
    Code(i32),
    Quit(i32),
}

/// Dispatch `argv[0]` to its built-in. Callers have already checked
/// `is_builtin`; an unrecognized name here is a caller bug, not a user
/// error, so it reports rather than panicking.
pub fn execute(argv: &[String], table: &mut JobTable) -> Outcome {
    let args = &argv[1..];
    match argv[0].as_str() {
        "quit" => Outcome::Quit(0),
        "cd" => Outcome::Code(builtin_cd(args)),
        "jobs" => Outcome::Code(builtin_jobs(table)),
        "fg" => Outcome::Code(builtin_fg(args, table)),
        "bg" => Outcome::Code(builtin_bg(args, table)),
        "kill" => Outcome::Code(builtin_kill(args, table)),
        "history" => Outcome::Code(builtin_history()),
        other => {
            eprintln!("jobsh: {other}: not a built-in");
            Outcome::Code(1)
        }
    }
}

fn builtin_cd(args: &[String]) -> i32 {
    let target = match args.first() {
        Some(pattern) => match exec::expand_single_path(pattern) {
            Ok(path) => path,
            Err(msg) => {
                eprintln!("cd: {msg}");
                return 1;
            }
        },
        None => match std::env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                eprintln!("cd: HOME not set");
                return 1;
            }
        },
    };

    match std::env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("cd: {target}: {e}");
            1
        }
    }
}

fn builtin_jobs(table: &mut JobTable) -> i32 {
    for line in table.watchjobs(JobFilter::All) {
        report::msg(line);
    }
    0
}

/// Parses `%n` job-spec syntax; an omitted spec means "the highest-numbered
/// live job".
fn parse_jobspec(args: &[String], table: &JobTable) -> Result<usize, String> {
    match args.first() {
        None => table.highest_live().ok_or_else(|| "job not found".to_string()),
        Some(spec) => spec
            .strip_prefix('%')
            .unwrap_or(spec.as_str())
            .parse::<usize>()
            .map_err(|_| "job not found".to_string()),
    }
}

fn builtin_fg(args: &[String], table: &mut JobTable) -> i32 {
    let slot = match parse_jobspec(args, table) {
        Ok(slot) => slot,
        Err(e) => {
            eprintln!("fg: {e}");
            return 1;
        }
    };
    if table.is_free(slot) {
        eprintln!("fg: job not found");
        return 1;
    }
    pipeline::resumejob(table, slot, true)
}

fn builtin_bg(args: &[String], table: &mut JobTable) -> i32 {
    let slot = match parse_jobspec(args, table) {
        Ok(slot) => slot,
        Err(e) => {
            eprintln!("bg: {e}");
            return 1;
        }
    };
    if table.is_free(slot) {
        eprintln!("bg: job not found");
        return 1;
    }
    pipeline::resumejob(table, slot, false)
}

/// `kill %n` — refuses input not starting with `%`.
fn builtin_kill(args: &[String], table: &mut JobTable) -> i32 {
    let Some(spec) = args.first() else {
        eprintln!("kill: usage: kill %n");
        return 1;
    };
    let Some(digits) = spec.strip_prefix('%') else {
        eprintln!("kill: {spec}: job-spec must start with '%'");
        return 1;
    };
    let Ok(slot) = digits.parse::<usize>() else {
        eprintln!("kill: {spec}: job not found");
        return 1;
    };
    if !table.killjob(slot) {
        eprintln!("kill: %{slot}: job not found");
        return 1;
    }
    0
}

/// `history` — per the recovered `original_source/command.c` behavior,
/// prints `$HOME/.history` by forking `cat` through the external executor
/// (C4) rather than reading and printing the file itself.
fn builtin_history() -> i32 {
    let Ok(home) = std::env::var("HOME") else {
        eprintln!("history: HOME not set");
        return 1;
    };
    let path = std::path::Path::new(&home).join(".history");
    let resolved = crate::redirect::Resolved {
        args: vec!["cat".to_string(), path.to_string_lossy().into_owned()],
        input: None,
        output: None,
    };
    let mut command = match exec::build_command(&resolved, None, None, None) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("history: {e}");
            return 1;
        }
    };
    match command.status() {
        Ok(status) => crate::status::exit_code(status),
        Err(e) => {
            eprintln!("history: {e}");
            1
        }
    }
}
