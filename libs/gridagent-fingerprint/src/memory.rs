use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::ProbeError;
use crate::exec::{CommandRunner, SystemCommandRunner};
use crate::model::{
    FingerprintResponse, MEMORY_TOTAL_BYTES_ATTR, NodeMemoryResources, NodeResources, Resources,
};

pub(crate) const BYTES_PER_MB: u64 = 1024 * 1024;

const SYSCTL_PROGRAM: &str = "sysctl";
const SYSCTL_KEY: &str = "hw.usermem64";

/// Source of the OS-level total-memory figure.
pub trait MemoryProbe: Send + Sync {
    /// Total physical memory in bytes. Zero means the platform reported
    /// nothing usable.
    fn total_bytes(&self) -> Result<u64, ProbeError>;
}

/// Fingerprints the total usable memory of the node.
///
/// Stateless apart from its probe; each invocation discovers the value from
/// scratch.
pub struct MemoryFingerprint {
    probe: Box<dyn MemoryProbe>,
}

impl MemoryFingerprint {
    /// Fingerprint with the platform-default probe, its external calls
    /// bounded by `config.probe_timeout`.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            probe: default_probe(config.probe_timeout),
        }
    }

    /// Fingerprint with an explicit probe.
    pub fn with_probe(probe: Box<dyn MemoryProbe>) -> Self {
        Self { probe }
    }

    /// Populate total memory in `response`.
    ///
    /// A non-zero `memory_total_mb` override pins the advertised capacity
    /// and skips the OS query entirely. A probe that reports zero bytes sets
    /// nothing and still succeeds; the fact is simply absent. A probe that
    /// cannot run at all returns the error so the collector decides whether
    /// the missing fact matters.
    pub fn fingerprint(
        &self,
        config: &ClientConfig,
        response: &mut FingerprintResponse,
    ) -> Result<(), ProbeError> {
        let total_bytes = if config.memory_total_mb != 0 {
            config.memory_total_mb.saturating_mul(BYTES_PER_MB)
        } else {
            self.probe.total_bytes()?
        };

        if total_bytes == 0 {
            tracing::debug!("memory probe reported no usable total, skipping fact");
            return Ok(());
        }

        response.add_attribute(MEMORY_TOTAL_BYTES_ATTR, total_bytes.to_string());

        let memory_mb = total_bytes / BYTES_PER_MB;
        response.resources = Some(Resources { memory_mb });
        response.node_resources = Some(NodeResources {
            memory: NodeMemoryResources { memory_mb },
        });

        tracing::debug!(total_bytes, memory_mb, "fingerprinted node memory");
        Ok(())
    }
}

fn default_probe(timeout: Duration) -> Box<dyn MemoryProbe> {
    if cfg!(any(target_os = "openbsd", target_os = "netbsd")) {
        Box::new(SysctlMemoryProbe::new(Arc::new(SystemCommandRunner::new(
            timeout,
        ))))
    } else {
        Box::new(SysinfoMemoryProbe)
    }
}

/// Queries the BSD `sysctl` utility for total physical memory.
pub struct SysctlMemoryProbe {
    runner: Arc<dyn CommandRunner>,
}

impl SysctlMemoryProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl MemoryProbe for SysctlMemoryProbe {
    fn total_bytes(&self) -> Result<u64, ProbeError> {
        let output = self.runner.run(SYSCTL_PROGRAM, &[SYSCTL_KEY])?;
        parse_sysctl_total(&output)
    }
}

/// Parses a `hw.usermem64 = <bytes>` response line into a byte count.
fn parse_sysctl_total(output: &str) -> Result<u64, ProbeError> {
    let fields: Vec<&str> = output.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(malformed(format!(
            "expected 3 fields, got {}",
            fields.len()
        )));
    }
    fields[2]
        .parse()
        .map_err(|_| malformed(format!("total is not an unsigned integer: {:?}", fields[2])))
}

fn malformed(reason: String) -> ProbeError {
    ProbeError::MalformedOutput {
        command: format!("{SYSCTL_PROGRAM} {SYSCTL_KEY}"),
        reason,
    }
}

/// Cross-platform probe backed by the `sysinfo` crate, used on targets
/// without the `hw.usermem64` sysctl.
pub struct SysinfoMemoryProbe;

impl MemoryProbe for SysinfoMemoryProbe {
    fn total_bytes(&self) -> Result<u64, ProbeError> {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Ok(sys.total_memory())
    }
}
