//! Shared subprocess execution for the external media tools.
//!
//! Every tool runs to completion with stdout and stderr captured; on a
//! non-zero exit the combined output is carried in the error so it can be
//! logged next to the video it failed for.

use std::process::Stdio;

use tokio::process::Command;

/// Maximum combined output kept in an error (64 KiB).
const MAX_ERROR_OUTPUT_BYTES: usize = 64 * 1024;

/// Error type for external tool invocations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{program} could not be started: {source}")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} failed (exit code {exit_code:?}): {output}")]
    ExecutionFailed {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("failed to parse {program} output: {message}")]
    Parse { program: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `cmd` to completion and return its stdout.
///
/// `program` is only used to label errors.
pub async fn run_tool(cmd: &mut Command, program: &str) -> Result<String, ToolError> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ToolError::NotFound {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ToolError::ExecutionFailed {
            program: program.to_string(),
            exit_code: output.status.code(),
            output: combined_output(&output.stdout, &output.stderr),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Concatenate stdout and stderr, keeping the tail when too long.
fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    if !text.is_empty() && !stderr.is_empty() {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(stderr));

    if text.len() > MAX_ERROR_OUTPUT_BYTES {
        let mut cut = text.len() - MAX_ERROR_OUTPUT_BYTES;
        while !text.is_char_boundary(cut) {
            cut += 1;
        }
        text = text.split_off(cut);
    }
    text.trim().to_string()
}
