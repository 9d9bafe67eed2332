use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Attribute key under which the memory fingerprint reports total bytes.
pub const MEMORY_TOTAL_BYTES_ATTR: &str = "memory.totalbytes";

/// Response a fingerprint populates for the attribute collector.
///
/// Attributes are free-form string facts; resource records carry structured
/// quantities used directly in capacity accounting. The collector owns the
/// response and reads it after each probe; probes only write into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerprintResponse {
    attributes: BTreeMap<String, String>,
    pub resources: Option<Resources>,
    pub node_resources: Option<NodeResources>,
}

impl FingerprintResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a string attribute. Later writes to the same key win.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Legacy resource record, superseded by [`NodeResources`].
///
/// Kept for consumers that still read the flat shape; always populated
/// identically to the node record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    pub memory_mb: u64,
}

/// Current node resource record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeResources {
    pub memory: NodeMemoryResources,
}

/// Memory capacity of a node, in whole megabytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMemoryResources {
    pub memory_mb: u64,
}

/// Kernel identity as reported by the platform, one field per `utsname`
/// member. Each field is the NUL-trimmed contents of a fixed-size byte
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub machine: String,
    pub nodename: String,
    pub release: String,
    pub sysname: String,
    pub version: String,
}

impl fmt::Display for HostIdentity {
    /// Joins the five fields with single spaces, like `uname -a`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.machine, self.nodename, self.release, self.sysname, self.version
        )
    }
}

/// Point-in-time filesystem capacity for one mount path.
///
/// `matched` is false when the disk-usage table had no row for the path; the
/// byte figures then carry over from the previous snapshot (zero before the
/// first match), so callers can tell a miss from a fresh reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesystemCapacity {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub matched: bool,
    pub collected_at: DateTime<Utc>,
}

impl FilesystemCapacity {
    /// State before any probe has run.
    pub(crate) fn unprobed() -> Self {
        Self {
            total_bytes: 0,
            available_bytes: 0,
            matched: false,
            collected_at: Utc::now(),
        }
    }
}
