use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub(crate) const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side agent configuration consumed by the fingerprinting subsystem.
///
/// The agent loads and owns the full configuration; only the fields the
/// probes read live here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Operator override for total memory, in megabytes. Zero means "ask the
    /// operating system".
    ///
    /// Required in containers and VMs where cgroup limits are invisible to
    /// the OS-level query.
    pub memory_total_mb: u64,

    /// Upper bound for a single external probe command, as a humantime
    /// string (`"5s"`, `"500ms"`). Expiry is a recoverable probe failure.
    #[serde(deserialize_with = "duration_from_humantime")]
    pub probe_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            memory_total_mb: 0,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

fn duration_from_humantime<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}
