//! Host Fingerprinting Library
//!
//! This library discovers static facts about the machine the agent runs on:
//! - Total usable memory, from an operator override or the operating system
//! - Kernel identity (the five `utsname` fields joined like `uname -a`)
//! - Network configuration files (hosts file, resolver configuration)
//! - Filesystem capacity for a given mount path, via the `df` utility
//!
//! The results seed the attribute map and resource records the agent
//! advertises to the control plane before workloads are scheduled onto the
//! node.
//!
//! Every probe is a synchronous, one-shot operation. External utilities are
//! bounded by a configurable timeout, and every failure surfaces as a
//! [`ProbeError`] so the attribute collector can decide per fact whether a
//! missing value blocks registration or is simply omitted.

pub mod config;
pub mod error;
pub mod exec;
pub mod model;

mod disk;
mod host;
mod memory;

pub use config::ClientConfig;
pub use disk::DiskUsage;
pub use error::ProbeError;
pub use exec::{CommandRunner, SystemCommandRunner};
pub use host::HostCollector;
pub use memory::{MemoryFingerprint, MemoryProbe, SysctlMemoryProbe, SysinfoMemoryProbe};
pub use model::*;
