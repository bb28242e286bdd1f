//! External process execution
//!
//! Runs a binary with an explicit environment. When output is captured,
//! stdout and stderr are drained concurrently so a child blocking on a full
//! pipe cannot deadlock the reader.

use crate::error::{Error, Result};
use console::{style, Term};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// How a child process is run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Pipe stdout/stderr into the result instead of inheriting them
    pub capture_output: bool,

    /// Fail with [`Error::ProcessFailed`] on a non-zero return code
    pub check: bool,

    /// Echo captured lines to the parent's streams as they arrive
    pub print_captured_output: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            capture_output: false,
            check: true,
            print_captured_output: false,
        }
    }
}

impl ExecOptions {
    /// Capture output and fail on non-zero exit
    pub fn captured() -> Self {
        Self {
            capture_output: true,
            ..Self::default()
        }
    }

    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn with_print_captured_output(mut self, print: bool) -> Self {
        self.print_captured_output = print;
        self
    }
}

/// Outcome of a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Program followed by its arguments
    pub command: Vec<String>,

    /// Exit code, or the negated signal number when killed by a signal
    pub return_code: i32,

    pub stdout_lines: Vec<String>,

    pub stderr_lines: Vec<String>,
}

impl ProcessResult {
    /// Captured stdout joined by newlines
    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }

    /// Captured stderr joined by newlines
    pub fn stderr(&self) -> String {
        self.stderr_lines.join("\n")
    }

    pub fn success(&self) -> bool {
        self.return_code == 0
    }

    /// Convert a non-zero return code into [`Error::ProcessFailed`]
    pub fn raise_for_status(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }

        Err(Error::ProcessFailed {
            command: self.command.join(" "),
            return_code: self.return_code,
            stdout: self.stdout(),
            stderr: self.stderr(),
        })
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `program` with `args` and exactly the environment in `env`
pub async fn execute<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    env: &HashMap<String, String>,
    options: ExecOptions,
) -> Result<ProcessResult> {
    let program = program.as_ref();
    let command: Vec<String> = std::iter::once(program)
        .chain(args.iter().map(AsRef::as_ref))
        .map(|part| part.to_string_lossy().into_owned())
        .collect();

    debug!("Executing: {}", command.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.env_clear();
    cmd.envs(env);

    let (status, stdout_lines, stderr_lines) = if options.capture_output {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let echo = options.print_captured_output;

        let (stdout_lines, stderr_lines) = tokio::join!(
            read_lines(stdout, Stream::Stdout, echo),
            read_lines(stderr, Stream::Stderr, echo),
        );

        let status = child.wait().await?;
        (status, stdout_lines?, stderr_lines?)
    } else {
        let status = cmd.spawn()?.wait().await?;
        (status, Vec::new(), Vec::new())
    };

    let result = ProcessResult {
        command,
        return_code: return_code(status),
        stdout_lines,
        stderr_lines,
    };
    debug!("Process exited with return code {}", result.return_code);

    if options.check {
        result.raise_for_status()
    } else {
        Ok(result)
    }
}

/// Drain `reader` line by line, trimming trailing whitespace
async fn read_lines<R>(reader: Option<R>, stream: Stream, echo: bool) -> Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };

    let colorize = matches!(stream, Stream::Stderr) && Term::stderr().is_term();
    let mut lines = BufReader::new(reader).lines();
    let mut captured = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end().to_string();

        if echo {
            match stream {
                Stream::Stdout => println!("{}", line),
                Stream::Stderr if colorize => eprintln!("{}", style(&line).red().for_stderr()),
                Stream::Stderr => eprintln!("{}", line),
            }
        }

        captured.push(line);
    }

    Ok(captured)
}

#[cfg(unix)]
fn return_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn return_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
