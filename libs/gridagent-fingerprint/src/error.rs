use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Errors raised by host probes.
///
/// Probe failures are recoverable: the attribute collector decides per fact
/// whether a missing value blocks node registration or is omitted from the
/// advertised set. A probe never aborts the agent process.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("unexpected output from `{command}`: {reason}")]
    MalformedOutput { command: String, reason: String },

    #[error("uname syscall failed: {0}")]
    Uname(#[source] std::io::Error),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ProbeError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
