//! Shell execution tests. Unix only: they rely on `sh`.
#![cfg(unix)]

use std::cell::RefCell;
use std::time::Duration;

use serial_test::serial;
use tasklane_console::{execute, execute_argv, ExecOptions};

#[test]
fn progress_receives_all_output() {
    let chunks = RefCell::new(String::new());
    let result = execute(
        "printf one; sleep 0.1; printf two",
        ExecOptions::new().on_progress(|chunk| chunks.borrow_mut().push_str(chunk)),
    )
    .unwrap();

    assert_eq!(result.output, "onetwo");
    assert_eq!(chunks.borrow().as_str(), "onetwo");
}

#[test]
fn stdout_and_stderr_are_merged() {
    let result = execute(
        "printf out; sleep 0.1; printf err >&2",
        ExecOptions::new(),
    )
    .unwrap();
    assert_eq!(result.output, "outerr");
    assert_eq!(result.exit_code, 0);
}

#[test]
fn stdin_is_forwarded() {
    let result = execute("tr a-z A-Z", ExecOptions::new().stdin("shout")).unwrap();
    assert_eq!(result.output, "SHOUT");
}

#[test]
fn command_ignoring_stdin_still_completes() {
    let input = "x".repeat(1 << 20);
    let result = execute("true", ExecOptions::new().stdin(input)).unwrap();
    assert_eq!(result.exit_code, 0);
}

#[test]
fn finishing_before_timeout_keeps_output() {
    let result = execute(
        "printf quick",
        ExecOptions::new().timeout(Duration::from_secs(5)),
    )
    .unwrap();
    assert_eq!(result.output, "quick");
    assert_eq!(result.exit_code, 0);
}

#[test]
fn timeout_yields_exit_one_and_no_output() {
    let seen = RefCell::new(String::new());
    let result = execute(
        "printf started; sleep 3",
        ExecOptions::new()
            .timeout(Duration::from_millis(200))
            .on_progress(|chunk| seen.borrow_mut().push_str(chunk)),
    )
    .unwrap();

    assert_eq!(result.exit_code, 1);
    assert!(result.output.is_empty());
}

#[test]
#[serial]
fn environment_is_inherited() {
    std::env::set_var("TASKLANE_EXEC_VAR", "inherited");
    let result = execute("printf %s \"$TASKLANE_EXEC_VAR\"", ExecOptions::new()).unwrap();
    std::env::remove_var("TASKLANE_EXEC_VAR");
    assert_eq!(result.output, "inherited");
}

#[test]
#[serial]
fn unset_variable_expands_empty() {
    std::env::remove_var("TASKLANE_EXEC_VAR");
    let result = execute("printf %s \"$TASKLANE_EXEC_VAR\"", ExecOptions::new()).unwrap();
    assert_eq!(result.output, "");
}

#[test]
fn timeout_is_kept_while_background_job_holds_output() {
    let started = std::time::Instant::now();
    let result = execute(
        "sleep 4 & printf x",
        ExecOptions::new().timeout(Duration::from_millis(500)),
    )
    .unwrap();

    assert_eq!(result.exit_code, 1);
    assert_eq!(result.output, "");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn argv_form_runs_without_shell() {
    let result = execute_argv(&["echo", "hello world"], ExecOptions::new()).unwrap();
    assert_eq!(result.output, "hello world\n");
    assert_eq!(result.exit_code, 0);
}

#[test]
#[serial]
fn argv_form_inherits_environment() {
    std::env::set_var("TASKLANE_EXEC_VAR", "from-parent");
    let result = execute_argv(&["printenv", "TASKLANE_EXEC_VAR"], ExecOptions::new()).unwrap();
    std::env::remove_var("TASKLANE_EXEC_VAR");
    assert_eq!(result.output, "from-parent\n");
}
