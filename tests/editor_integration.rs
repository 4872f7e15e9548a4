/// History persistence (C9 + `editor.rs`), each test using its own isolated
/// temp `$HOME` so concurrent test runs cannot race on a shared file.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

fn run_shell_with_home(lines: &[&str], home: &Path) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jobsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("HOME", home)
        .spawn()
        .expect("spawn jobsh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "quit").expect("write quit");
    }

    child.wait_with_output().expect("wait output")
}

struct TempHome(PathBuf);

impl TempHome {
    fn new(label: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("jobsh_test_home_{label}"));
        std::fs::create_dir_all(&dir).expect("create temp home");
        TempHome(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }

    fn history_path(&self) -> PathBuf {
        self.0.join(".history")
    }
}

impl Drop for TempHome {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn history_file_written_after_command() {
    let home = TempHome::new("written");
    let marker = "echo HISTORY_WRITTEN_MARKER";

    let output = run_shell_with_home(&[marker], home.path());
    assert!(output.status.success(), "shell did not exit cleanly");

    let path = home.history_path();
    assert!(path.exists(), ".history was not created");

    let contents = std::fs::read_to_string(&path).expect("read .history");
    assert!(
        contents.contains(marker),
        "expected marker in history; contents:\n{contents}"
    );
}

#[test]
fn history_builtin_prints_persisted_file() {
    let home = TempHome::new("printed");
    let marker = "echo HISTORY_BUILTIN_MARKER";

    let _ = run_shell_with_home(&[marker], home.path());
    let output = run_shell_with_home(&["history"], home.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(marker),
        "expected prior command in `history` output; stdout:\n{stdout}"
    );
}

#[test]
fn empty_commands_not_written_to_history() {
    let home = TempHome::new("empty");
    let _ = run_shell_with_home(&["echo sentinel", "", "   "], home.path());

    let contents = std::fs::read_to_string(home.history_path()).expect("read .history");
    assert!(
        !contents.lines().any(|l| l.trim().is_empty()),
        "blank line found in history file:\n{contents}"
    );
}
