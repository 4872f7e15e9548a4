//! The REPL loop: prompts, reads a line, tokenizes it, hands it to the
//! pipeline launcher or lets a foreground built-in short-circuit, and
//! sweeps finished background jobs after every command.

use crate::editor::LineEditor;
use crate::job::JobTable;
use crate::pipeline::{self, LineOutcome};
use crate::reaper;
use crate::report;
use crate::tokenizer;

const PROMPT: &str = "# ";

/// Runs until EOF or `quit`, returning the exit code to hand to
/// `std::process::exit`.
pub fn run(table: &mut JobTable) -> i32 {
    let mut editor = LineEditor::new();

    loop {
        let line = match editor.read_line(PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("jobsh: {e}");
                continue;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        editor.add_to_history(trimmed);

        match tokenizer::tokenize(trimmed) {
            Ok(tokens) => match pipeline::run_line(tokens, table) {
                Ok(LineOutcome::Code(_)) => {}
                Ok(LineOutcome::Quit(code)) => {
                    crate::shutdown::run(table);
                    return code;
                }
                Err(message) => eprintln!("jobsh: {message}"),
            },
            Err(e) => eprintln!("jobsh: {e}"),
        }

        // Post-command sweep: drain any SIGCHLD transitions and announce
        // finished background jobs.
        for message in reaper::drain(table) {
            report::msg(message);
        }
    }

    crate::shutdown::run(table);
    0
}
