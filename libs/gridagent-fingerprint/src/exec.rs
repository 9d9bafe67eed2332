use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::config::DEFAULT_PROBE_TIMEOUT;
use crate::error::ProbeError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Seam for external utility execution, so probes can be exercised without
/// spawning real processes.
///
/// Implementations must be safe for concurrent invocation; independent
/// callers may probe at the same time.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its captured stdout as UTF-8
    /// text, blocking until the process exits.
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;
}

/// Runs utilities as real child processes, bounded by a timeout.
///
/// Expiry kills the child and surfaces as [`ProbeError::Timeout`], a
/// recoverable probe failure rather than an agent abort.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let command = render_command(program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Drain stdout on a helper thread so a child writing more than the
        // pipe buffer holds cannot block while we wait for it to exit.
        let mut stdout = child.stdout.take();
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(out) = stdout.as_mut() {
                let _ = out.read_to_end(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = reader.join();
                    return Err(ProbeError::Internal(format!(
                        "failed to wait on `{command}`: {e}"
                    )));
                }
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.join();
                return Err(ProbeError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = reader.join().unwrap_or_default();
        if !status.success() {
            return Err(ProbeError::CommandFailed { command, status });
        }
        String::from_utf8(stdout).map_err(|_| ProbeError::MalformedOutput {
            command,
            reason: "stdout is not valid UTF-8".to_owned(),
        })
    }
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_owned()
    } else {
        format!("{program} {}", args.join(" "))
    }
}
