//! Target execution: spawn the instrumented binary, feed it a byte input on
//! stdin, and decode the address trace it writes to stderr.
//!
//! Level 2 - subprocess execution
//!
//! The instrumented target (produced by `tracejump`/`trace-cc`) writes its
//! basic-block trace to stderr as a sequence of little-endian signed 64-bit
//! integers, one per block entered, and signals a discovered bug by exiting
//! with `bug_return_code`. Stdin and stdout are drained on background
//! threads so a chatty target can't deadlock the pipe while this call
//! blocks - the call itself is still a single synchronous unit of work from
//! the orchestrator's point of view, which is all "no async runtime"
//! requires.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use legion_core::Trace;

use crate::error::RunnerError;

/// The observable outcome of one target execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// The basic-block addresses the target visited, in order.
    pub trace: Trace,
    /// The target's standard output, captured unconditionally - the Runner
    /// does not know in advance whether the sink wants to persist it.
    pub stdout: Vec<u8>,
    /// The target's process exit code.
    pub exit_code: Option<i32>,
    /// Whether the target's exit code matched the configured bug signal.
    pub bug_found: bool,
}

/// Run `binary` once with `input` piped to its stdin, killing it after
/// `timeout` if it has not exited.
pub fn execute(
    binary: &Path,
    input: &[u8],
    timeout: Duration,
    bug_return_code: i32,
) -> Result<ExecutionOutcome, RunnerError> {
    let mut child = Command::new(binary)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RunnerError::Spawn(e.to_string()))?;

    let mut stdin = child.stdin.take().expect("stdin was piped");
    let input = input.to_vec();
    let writer = thread::spawn(move || {
        // The target may exit before consuming all of its input; a broken
        // pipe here is expected and not an error.
        let _ = stdin.write_all(&input);
    });

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let stdout_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    let mut stderr = child.stderr.take().expect("stderr was piped");
    let stderr_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let status = match child
        .wait_timeout(timeout)
        .map_err(|e| RunnerError::Wait(e.to_string()))?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = writer.join();
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();
            return Err(RunnerError::TimedOut);
        }
    };

    let _ = writer.join();
    let stdout_bytes = stdout_reader.join().unwrap_or_default();
    let stderr_bytes = stderr_reader
        .join()
        .map_err(|_| RunnerError::ReadOutput("stderr reader thread panicked".to_string()))?;

    let trace = decode_trace(&stderr_bytes)?;
    let bug_found = status.code() == Some(bug_return_code);

    Ok(ExecutionOutcome {
        trace,
        stdout: stdout_bytes,
        exit_code: status.code(),
        bug_found,
    })
}

fn decode_trace(bytes: &[u8]) -> Result<Trace, RunnerError> {
    if bytes.len() % 8 != 0 {
        return Err(RunnerError::StderrDecode(format!(
            "stderr length {} is not a multiple of 8 bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| i64::from_le_bytes(chunk.try_into().expect("chunk is exactly 8 bytes")))
        .collect())
}
