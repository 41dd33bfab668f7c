//! Invocation of the whisper.cpp command-line recogniser.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::process::{run_tool, ToolError};

/// Language value that asks the recogniser to detect the language itself.
pub const AUTO_LANGUAGE: &str = "auto";

/// Arguments for one recogniser run.
#[derive(Debug, Clone)]
pub struct WhisperRequest<'a> {
    pub binary: &'a Path,
    pub model_path: &'a Path,
    pub audio_path: &'a Path,
    /// Output files are written as `<prefix>.vtt` and `<prefix>.json`.
    pub output_prefix: &'a Path,
    pub threads: u16,
    /// Explicit language code, or `None` for auto-detection.
    pub language: Option<&'a str>,
}

/// Files produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperOutputs {
    pub vtt_path: PathBuf,
    pub json_path: PathBuf,
}

impl WhisperRequest<'_> {
    fn args(&self) -> Vec<OsString> {
        vec![
            "-m".into(),
            self.model_path.into(),
            "-f".into(),
            self.audio_path.into(),
            "-of".into(),
            self.output_prefix.into(),
            "-ovtt".into(),
            "-oj".into(),
            "-t".into(),
            self.threads.to_string().into(),
            "-l".into(),
            self.language.unwrap_or(AUTO_LANGUAGE).into(),
            "-np".into(),
        ]
    }

    /// Paths the recogniser writes for this request.
    pub fn outputs(&self) -> WhisperOutputs {
        WhisperOutputs {
            vtt_path: with_suffix(self.output_prefix, "vtt"),
            json_path: with_suffix(self.output_prefix, "json"),
        }
    }
}

/// Run the recogniser and return the paths of its subtitle and JSON outputs.
pub async fn transcribe(request: &WhisperRequest<'_>) -> Result<WhisperOutputs, ToolError> {
    let program = request.binary.to_string_lossy().into_owned();
    run_tool(Command::new(request.binary).args(request.args()), &program).await?;

    let outputs = request.outputs();
    if !tokio::fs::try_exists(&outputs.json_path).await? {
        return Err(ToolError::Parse {
            program,
            message: format!("no JSON output at {}", outputs.json_path.display()),
        });
    }
    Ok(outputs)
}

/// `prefix` + `.ext`, without replacing an existing extension.
fn with_suffix(prefix: &Path, ext: &str) -> PathBuf {
    let mut os = prefix.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}
