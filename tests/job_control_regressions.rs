use std::io::Write;
use std::process::{Command, Stdio};

fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jobsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
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

#[test]
fn echo_runs_and_exits_cleanly() {
    let output = run_shell(&["echo hello"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello"), "stdout was: {stdout}");
    assert!(output.status.success());
}

#[test]
fn redirected_output_is_written_to_file() {
    let dir = std::env::temp_dir().join(format!("jobsh-it-redirect-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("out.txt");
    let path_str = path.to_str().unwrap();

    run_shell(&[&format!("echo hi > {path_str}")]);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), "hi");
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cat_with_input_redirection_reads_the_file() {
    let dir = std::env::temp_dir().join(format!("jobsh-it-cat-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("in.txt");
    std::fs::write(&path, "from file\n").unwrap();
    let path_str = path.to_str().unwrap();

    let output = run_shell(&[&format!("cat < {path_str}")]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("from file"), "stdout was: {stdout}");
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn pipeline_runs_every_stage() {
    let output = run_shell(&["yes | head -n 3"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let count = stdout.lines().filter(|l| *l == "y").count();
    assert_eq!(count, 3, "stdout was: {stdout}");
}

#[test]
fn background_job_is_announced_and_reaped() {
    let output = run_shell(&["true &"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1]"), "stdout was: {stdout}");
}

#[test]
fn jobs_lists_a_live_background_job() {
    let output = run_shell(&["sleep 2 &", "jobs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1]"), "stdout was: {stdout}");
}

#[test]
fn kill_requires_percent_prefix() {
    let output = run_shell(&["sleep 2 &", "kill 1"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'%'"), "stderr was: {stderr}");
}

#[test]
fn kill_terminates_a_background_job() {
    let output = run_shell(&["sleep 30 &", "kill %1"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("killed") || stdout.contains("[1]"),
        "stdout was: {stdout}"
    );
    assert!(output.status.success());
}

#[test]
fn unknown_command_reports_not_found() {
    let output = run_shell(&["this-command-does-not-exist-xyz"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr was: {stderr}");
}

#[test]
fn malformed_pipeline_reports_structural_error() {
    let output = run_shell(&["ls |"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not well formed"), "stderr was: {stderr}");
}
