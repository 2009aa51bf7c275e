//! Shell command execution with streamed output and a timeout.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::error::ConsoleError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const CHUNK_SIZE: usize = 4096;

/// Exit code reported for a timed-out or signal-terminated command.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Options for [`execute`].
#[derive(Default)]
pub struct ExecOptions<'a> {
    stdin: String,
    timeout: Option<Duration>,
    on_progress: Option<Box<dyn FnMut(&str) + 'a>>,
}

impl<'a> ExecOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text written to the command's stdin before it is closed.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = input.into();
        self
    }

    /// Kills the command once it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Called with each chunk of output as it arrives.
    pub fn on_progress(mut self, callback: impl FnMut(&str) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

/// Result of [`execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Stdout and stderr, interleaved in arrival order.
    pub output: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `command` through the platform shell.
///
/// The command inherits the current environment. When a timeout is set and
/// exceeded the process is killed and the result is exit code 1 with empty
/// output; a non-zero exit is not an error.
///
/// ```rust
/// use tasklane_console::{execute, ExecOptions};
///
/// let result = execute("printf hello", ExecOptions::new())?;
/// assert_eq!(result.output, "hello");
/// assert_eq!(result.exit_code, 0);
/// # Ok::<(), tasklane_console::ConsoleError>(())
/// ```
pub fn execute(command: &str, options: ExecOptions<'_>) -> Result<ExecOutput, ConsoleError> {
    let cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    run(cmd, command, options)
}

/// Runs a program directly, without a shell. `argv[0]` is the program and
/// the remaining items are passed as arguments verbatim.
///
/// Behaves like [`execute`] otherwise. An empty `argv` fails with
/// [`ConsoleError::EmptyCommand`].
pub fn execute_argv<S: AsRef<str>>(
    argv: &[S],
    options: ExecOptions<'_>,
) -> Result<ExecOutput, ConsoleError> {
    let (program, args) = argv.split_first().ok_or(ConsoleError::EmptyCommand)?;
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args.iter().map(|arg| arg.as_ref()));
    let label = argv
        .iter()
        .map(|arg| arg.as_ref())
        .collect::<Vec<&str>>()
        .join(" ");
    run(cmd, &label, options)
}

fn run(mut cmd: Command, command: &str, options: ExecOptions<'_>) -> Result<ExecOutput, ConsoleError> {
    let ExecOptions {
        stdin,
        timeout,
        mut on_progress,
    } = options;

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Own process group: a timeout kills background children too.
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    tracing::debug!(command, ?timeout, "spawning command");
    let mut child = cmd.spawn().map_err(|source| ConsoleError::Spawn {
        command: command.to_string(),
        source,
    })?;

    if let Some(mut pipe) = child.stdin.take() {
        // A command that never reads stdin must not block us.
        thread::spawn(move || {
            let _ = pipe.write_all(stdin.as_bytes());
        });
    }

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone());
    }
    drop(tx);

    let deadline = timeout.map(|limit| Instant::now() + limit);
    let mut output = Vec::new();
    let mut emit = |chunk: Vec<u8>, output: &mut Vec<u8>| {
        if let Some(callback) = on_progress.as_mut() {
            callback(&String::from_utf8_lossy(&chunk));
        }
        output.extend_from_slice(&chunk);
    };

    let status = loop {
        if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
            break status;
        }
        drain(&rx, &mut |chunk| emit(chunk, &mut output));

        if deadline.is_some_and(|d| Instant::now() >= d) {
            return timed_out(&mut child, command);
        }
    };

    // Readers finish once every holder of the pipes has exited, which can
    // outlive the command itself; the deadline still applies.
    loop {
        let next = match deadline {
            Some(d) => rx.recv_timeout(d.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(chunk) => emit(chunk, &mut output),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => return timed_out(&mut child, command),
        }
    }

    let exit_code = status.code().unwrap_or(FAILURE_EXIT_CODE);
    tracing::debug!(command, exit_code, "command finished");

    Ok(ExecOutput {
        output: String::from_utf8_lossy(&output).into_owned(),
        exit_code,
    })
}

fn timed_out(child: &mut Child, command: &str) -> Result<ExecOutput, ConsoleError> {
    tracing::warn!(command, "command timed out; killing it");
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(group) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(group), Signal::SIGKILL);
        }
    }
    // Already reaped or already killed by the group signal.
    let _ = child.kill();
    child.wait()?;
    Ok(ExecOutput {
        output: String::new(),
        exit_code: FAILURE_EXIT_CODE,
    })
}
