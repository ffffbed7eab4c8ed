// obox-core/src/process.rs

//! Runs external programs and normalizes what they produce.
//!
//! Every wrapper tool funnels through [`run`] or [`run_and_format`]. Neither of
//! them fails: spawn errors, broken pipes and timeouts are all folded into a
//! [`ProcessResult`] (or its formatted string), so a tool call always has
//! something to hand back to the agent.

use crate::errors::ProcessError;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Appended to stdout when a command outlives its timeout.
pub const STILL_RUNNING_MARKER: &str = "\n(Still running...)";

/// Prefix used by [`run_and_format`] callers that don't pick their own.
pub const DEFAULT_ERROR_PREFIX: &str = "Error executing";

/// A program invocation: either a line for the platform shell or an
/// argument vector whose first element is the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Shell(String),
    Argv(Vec<String>),
}

impl Command {
    pub fn shell(line: impl Into<String>) -> Self {
        Command::Shell(line.into())
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Argv(args.into_iter().map(Into::into).collect())
    }

    /// The program that will actually be spawned.
    pub fn program(&self) -> &str {
        match self {
            Command::Shell(_) => shell_invocation().0,
            Command::Argv(args) => args.first().map(String::as_str).unwrap_or(""),
        }
    }

    fn to_tokio(&self) -> Result<TokioCommand, ProcessError> {
        match self {
            Command::Shell(line) => {
                let (shell, flag) = shell_invocation();
                let mut cmd = TokioCommand::new(shell);
                cmd.arg(flag).arg(line);
                Ok(cmd)
            }
            Command::Argv(args) => {
                let (program, rest) = args.split_first().ok_or_else(|| ProcessError::Spawn {
                    program: String::new(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
                })?;
                let mut cmd = TokioCommand::new(program);
                cmd.args(rest);
                Ok(cmd)
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Shell(line) => f.write_str(line),
            Command::Argv(args) => f.write_str(&args.join(" ")),
        }
    }
}

fn shell_invocation() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

/// Outcome of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code, or `None` when the process was still running at the timeout.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn timed_out(&self) -> bool {
        self.code.is_none()
    }
}

/// Exit codes that count as "not an error".
///
/// Some tools (ripgrep, fd, fzf) exit with 1 to mean "ran fine, nothing matched".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessPolicy {
    codes: BTreeSet<i32>,
}

impl SuccessPolicy {
    pub fn codes<I: IntoIterator<Item = i32>>(codes: I) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// Accepts 0 and 1.
    pub fn zero_or_one() -> Self {
        Self::codes([0, 1])
    }

    pub fn accepts(&self, code: i32) -> bool {
        self.codes.contains(&code)
    }
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        Self::codes([0])
    }
}

/// Per-call knobs for [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Written to stdin, which is then closed. Without it stdin is null.
    pub input: Option<String>,
    /// Defaults to the caller's current directory.
    pub working_dir: Option<PathBuf>,
    /// A zero duration is treated as no timeout.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }
}

type Buffer = Arc<Mutex<String>>;

/// Reads `stream` until EOF, appending each line (newline included) to `buffer`.
async fn collect_stream<R>(stream: R, buffer: Buffer, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => buffer.lock().await.push_str(&String::from_utf8_lossy(&line)),
            Err(e) => {
                warn!(stream = name, error = %e, "Error reading stream");
                break;
            }
        }
    }
}

async fn snapshot(buffer: &Buffer) -> String {
    buffer.lock().await.clone()
}

fn preview(text: &str) -> String {
    text.lines().take(3).collect::<Vec<_>>().join("\n")
}

/// Runs `command` and reports its exit code and trimmed output.
///
/// stdout and stderr are drained by two separate tasks, so a child that floods
/// one stream while the other stays idle cannot stall the call.
///
/// With a timeout, the call returns once it elapses even if the child is still
/// alive; the child is *not* killed (dev servers are meant to keep running).
/// The result then has `code == None` and stdout ends with
/// [`STILL_RUNNING_MARKER`].
///
/// If spawning or talking to the child fails, the result carries code `-1`,
/// whatever stdout was captured, and the error text followed by any captured
/// stderr.
pub async fn run(command: &Command, options: &RunOptions) -> ProcessResult {
    debug!(command = %command, working_dir = ?options.working_dir, timeout = ?options.timeout, "Running command");

    let stdout = Buffer::default();
    let stderr = Buffer::default();
    let mut collectors = Vec::new();

    match drive(command, options, &stdout, &stderr, &mut collectors).await {
        Ok(result) => result,
        Err(e) => {
            for handle in &collectors {
                handle.abort();
            }
            warn!(command = %command, error = %e, "Command invocation failed");
            let partial_err = snapshot(&stderr).await;
            ProcessResult {
                code: Some(-1),
                stdout: snapshot(&stdout).await,
                stderr: format!("{}\n{}", e, partial_err).trim_end().to_string(),
            }
        }
    }
}

async fn drive(
    command: &Command,
    options: &RunOptions,
    stdout: &Buffer,
    stderr: &Buffer,
    collectors: &mut Vec<JoinHandle<()>>,
) -> Result<ProcessResult, ProcessError> {
    let mut cmd = command.to_tokio()?;
    if let Some(dir) = &options.working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(if options.input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: command.program().to_string(),
        source,
    })?;

    if let Some(out) = child.stdout.take() {
        collectors.push(tokio::spawn(collect_stream(out, stdout.clone(), "stdout")));
    }
    if let Some(err) = child.stderr.take() {
        collectors.push(tokio::spawn(collect_stream(err, stderr.clone(), "stderr")));
    }

    if let (Some(input), Some(mut stdin)) = (&options.input, child.stdin.take()) {
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(ProcessError::Stdin)?;
        stdin.flush().await.map_err(ProcessError::Stdin)?;
        // Dropping the handle closes the pipe so the child sees EOF.
        drop(stdin);
    }

    let status = match options.effective_timeout() {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.map_err(ProcessError::Wait)?,
            Err(_) => {
                info!(
                    command = %command,
                    timeout_secs = limit.as_secs_f64(),
                    "Command still running after timeout, leaving it in the background"
                );
                // Dropping the handles detaches the collectors; they keep
                // draining the pipes so the child never blocks on a full buffer.
                collectors.clear();
                return Ok(ProcessResult {
                    code: None,
                    stdout: format!("{}{}", snapshot(stdout).await.trim(), STILL_RUNNING_MARKER),
                    stderr: snapshot(stderr).await.trim().to_string(),
                });
            }
        },
        None => child.wait().await.map_err(ProcessError::Wait)?,
    };

    for handle in collectors.drain(..) {
        if let Err(e) = handle.await {
            warn!(command = %command, error = %e, "Stream collector did not finish cleanly");
        }
    }

    let code = status.code().unwrap_or(-1);
    let stdout = snapshot(stdout).await.trim().to_string();
    let stderr = snapshot(stderr).await.trim().to_string();

    debug!(
        "Command '{}' exit status: {}\nStdout preview:\n{}\nStderr preview:\n{}",
        command,
        code,
        preview(&stdout),
        preview(&stderr)
    );

    Ok(ProcessResult {
        code: Some(code),
        stdout,
        stderr,
    })
}

/// Runs `command` and returns its stdout, or `"{error_prefix} {command}: {message}"`
/// when the exit code is outside `policy`.
///
/// The message is stderr, or stdout when stderr is empty (plenty of tools
/// print their diagnostics on stdout). A timed-out command returns its partial
/// stdout, marker included.
pub async fn run_and_format(
    command: &Command,
    options: &RunOptions,
    error_prefix: &str,
    policy: &SuccessPolicy,
) -> String {
    let result = run(command, options).await;
    format_result(command, result, error_prefix, policy)
}

/// The classification half of [`run_and_format`].
pub fn format_result(
    command: &Command,
    result: ProcessResult,
    error_prefix: &str,
    policy: &SuccessPolicy,
) -> String {
    match result.code {
        None => result.stdout,
        Some(code) if policy.accepts(code) => result.stdout,
        Some(code) => {
            debug!(command = %command, code, "Command exited with a non-success code");
            let message = if result.stderr.is_empty() {
                result.stdout
            } else {
                result.stderr
            };
            format!("{} {}: {}", error_prefix, command, message)
        }
    }
}

/// Whether an executable called `name` is on `PATH`.
///
/// The lookup touches the filesystem, so it runs on the blocking pool.
pub async fn command_exists(name: &str) -> bool {
    let name = name.to_string();
    match tokio::task::spawn_blocking(move || which::which(&name).is_ok()).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "PATH lookup task failed");
            false
        }
    }
}
