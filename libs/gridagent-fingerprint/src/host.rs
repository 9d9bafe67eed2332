use std::path::Path;

use crate::error::ProbeError;
use crate::model::HostIdentity;

const HOSTS_PATH: &str = "/etc/hosts";
const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

/// Collects descriptive host facts: kernel identity and the network
/// configuration files diagnostics tooling expects to see verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCollector;

impl HostCollector {
    pub fn new() -> Self {
        Self
    }

    /// Kernel identity from the `uname(2)` syscall, field-for-field
    /// equivalent to `uname -a` on the reference platform.
    pub fn identity(&self) -> Result<HostIdentity, ProbeError> {
        uname_identity()
    }

    /// Verbatim contents of the hosts file.
    pub fn hosts_file(&self) -> Result<String, ProbeError> {
        slurp(Path::new(HOSTS_PATH))
    }

    /// Verbatim contents of the resolver configuration.
    pub fn resolver_config(&self) -> Result<String, ProbeError> {
        slurp(Path::new(RESOLV_CONF_PATH))
    }
}

fn slurp(path: &Path) -> Result<String, ProbeError> {
    std::fs::read_to_string(path).map_err(|source| ProbeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the bytes strictly before the first NUL, decoded lossily.
///
/// `utsname` fields are fixed-size buffers padded with NULs after the
/// payload; a buffer with no NUL is taken whole.
fn null_trimmed(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn uname_identity() -> Result<HostIdentity, ProbeError> {
    let mut uts = std::mem::MaybeUninit::<libc::utsname>::uninit();
    // SAFETY: uname fills the whole struct on success; we only read it after
    // checking the return code.
    let rc = unsafe { libc::uname(uts.as_mut_ptr()) };
    if rc != 0 {
        return Err(ProbeError::Uname(std::io::Error::last_os_error()));
    }
    let uts = unsafe { uts.assume_init() };

    Ok(HostIdentity {
        machine: null_trimmed(&field_bytes(&uts.machine)),
        nodename: null_trimmed(&field_bytes(&uts.nodename)),
        release: null_trimmed(&field_bytes(&uts.release)),
        sysname: null_trimmed(&field_bytes(&uts.sysname)),
        version: null_trimmed(&field_bytes(&uts.version)),
    })
}

#[cfg(unix)]
#[allow(clippy::unnecessary_cast)] // c_char is i8 or u8 depending on target
fn field_bytes(field: &[libc::c_char]) -> Vec<u8> {
    field.iter().map(|&c| c as u8).collect()
}

#[cfg(not(unix))]
fn uname_identity() -> Result<HostIdentity, ProbeError> {
    Err(ProbeError::Uname(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "uname is only available on unix targets",
    )))
}
