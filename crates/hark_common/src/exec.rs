//! Command execution for approved verdicts
//!
//! Runs a catalogue-registered `system_call` through the shell and captures
//! the real exit code, output and duration without reinterpretation. Callers
//! must hold a `Verdict` with `approved = true` before reaching this module;
//! nothing here checks intent, matching or confirmation - it only executes.

use serde::{Deserialize, Serialize};
use std::process::Command;
use std::time::Instant;

/// Output capture cap per stream.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Structured outcome of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub system_call: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stdout_truncated: bool,
    pub stderr: String,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute `system_call` via `sh -c`, capturing everything.
pub fn run_system_call(system_call: &str) -> std::io::Result<ExecOutcome> {
    let start = Instant::now();
    tracing::info!(%system_call, "executing approved command");

    let output = Command::new("sh").arg("-c").arg(system_call).output()?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let (stdout, stdout_truncated) = truncate(&output.stdout);
    let (stderr, stderr_truncated) = truncate(&output.stderr);

    Ok(ExecOutcome {
        system_call: system_call.to_string(),
        // Killed-by-signal surfaces as -1 rather than a fake success.
        exit_code: output.status.code().unwrap_or(-1),
        stdout,
        stdout_truncated,
        stderr,
        stderr_truncated,
        duration_ms,
    })
}

fn truncate(bytes: &[u8]) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    if text.len() > MAX_OUTPUT_BYTES {
        let mut cut = MAX_OUTPUT_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        (text[..cut].to_string(), true)
    } else {
        (text.into_owned(), false)
    }
}
