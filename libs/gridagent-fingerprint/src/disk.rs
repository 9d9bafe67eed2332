use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::ProbeError;
use crate::exec::{CommandRunner, SystemCommandRunner};
use crate::model::FilesystemCapacity;

const DF_PROGRAM: &str = "df";
/// POSIX-portable format, 512-byte blocks.
const DF_ARGS: [&str; 2] = ["-P", "-b"];
const DF_BLOCK_SIZE: u64 = 512;
const DF_FIELD_COUNT: usize = 6;

/// Reports total and available bytes for one mount path by probing the
/// platform `df` utility.
///
/// [`DiskUsage::refresh`] is the only operation that spawns a process, one
/// spawn per call. [`DiskUsage::total`] and [`DiskUsage::available`] read
/// the snapshot taken by the most recent refresh.
pub struct DiskUsage {
    mount_path: String,
    runner: Arc<dyn CommandRunner>,
    last: FilesystemCapacity,
}

impl DiskUsage {
    /// Accessor for `mount_path`, probing through a real `df` bounded by
    /// `timeout`.
    pub fn new(mount_path: impl Into<String>, timeout: Duration) -> Self {
        Self::with_runner(mount_path, Arc::new(SystemCommandRunner::new(timeout)))
    }

    /// Accessor with an explicit runner.
    pub fn with_runner(mount_path: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            mount_path: mount_path.into(),
            runner,
            last: FilesystemCapacity::unprobed(),
        }
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    /// Probe `df` once and update the snapshot.
    ///
    /// A table with no row for the mount path keeps the previous byte
    /// figures and marks the snapshot unmatched; it is not an error.
    pub fn refresh(&mut self) -> Result<FilesystemCapacity, ProbeError> {
        let output = self.runner.run(DF_PROGRAM, &DF_ARGS)?;

        self.last = match find_row(&output, &self.mount_path)? {
            Some((total_blocks, available_blocks)) => FilesystemCapacity {
                total_bytes: DF_BLOCK_SIZE.saturating_mul(total_blocks),
                available_bytes: DF_BLOCK_SIZE.saturating_mul(available_blocks),
                matched: true,
                collected_at: Utc::now(),
            },
            None => {
                tracing::warn!(mount_path = %self.mount_path, "df reported no row for mount path");
                FilesystemCapacity {
                    matched: false,
                    collected_at: Utc::now(),
                    ..self.last
                }
            }
        };

        Ok(self.last)
    }

    /// Total bytes from the last snapshot. Zero until a refresh has matched.
    pub fn total(&self) -> u64 {
        self.last.total_bytes
    }

    /// Available bytes from the last snapshot. Zero until a refresh has
    /// matched.
    pub fn available(&self) -> u64 {
        self.last.available_bytes
    }

    pub fn last_snapshot(&self) -> FilesystemCapacity {
        self.last
    }
}

/// Finds the (total, available) 512-byte block counts for `mount_path`.
///
/// The header line is skipped. Rows are split on whitespace runs since `df`
/// pads its columns; a well-formed row has exactly six fields with the mount
/// point last, and only an exact path match counts.
fn find_row(output: &str, mount_path: &str) -> Result<Option<(u64, u64)>, ProbeError> {
    for line in output.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != DF_FIELD_COUNT || fields[5] != mount_path {
            continue;
        }
        let total = parse_blocks(fields[1])?;
        let available = parse_blocks(fields[3])?;
        return Ok(Some((total, available)));
    }
    Ok(None)
}

fn parse_blocks(field: &str) -> Result<u64, ProbeError> {
    field.parse().map_err(|_| ProbeError::MalformedOutput {
        command: format!("{DF_PROGRAM} {}", DF_ARGS.join(" ")),
        reason: format!("block count is not an unsigned integer: {field:?}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const SAMPLE: &str = "Filesystem 1024-blocks Used Available Capacity Mounted\n\
                          /dev/sda1 2000000 500000 1500000 25% /data\n\
                          /dev/sdb1 4000000 1000000 3000000 25% /scratch\n";

    struct ScriptedRunner {
        output: &'static str,
        calls: AtomicUsize,
    }

    impl ScriptedRunner {
        fn new(output: &'static str) -> Arc<Self> {
            Arc::new(Self {
                output,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
            assert_eq!(program, "df");
            assert_eq!(args, ["-P", "-b"]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.to_owned())
        }
    }

    struct SequencedRunner {
        outputs: Mutex<VecDeque<&'static str>>,
    }

    impl SequencedRunner {
        fn new(outputs: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.iter().copied().collect()),
            })
        }
    }

    impl CommandRunner for SequencedRunner {
        fn run(&self, _program: &str, _args: &[&str]) -> Result<String, ProbeError> {
            let mut outputs = self
                .outputs
                .lock()
                .map_err(|e| ProbeError::Internal(e.to_string()))?;
            outputs
                .pop_front()
                .map(str::to_owned)
                .ok_or_else(|| ProbeError::Internal("no scripted output left".to_owned()))
        }
    }

    #[test]
    fn matching_row_yields_block_counts_times_512() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(SAMPLE);
        let mut usage = DiskUsage::with_runner("/data", runner);

        let snapshot = usage.refresh()?;
        assert!(snapshot.matched);
        assert_eq!(usage.total(), 512 * 2_000_000);
        assert_eq!(usage.available(), 512 * 1_500_000);
        Ok(())
    }

    #[test]
    fn second_row_is_found_too() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(SAMPLE);
        let mut usage = DiskUsage::with_runner("/scratch", runner);

        usage.refresh()?;
        assert_eq!(usage.total(), 512 * 4_000_000);
        assert_eq!(usage.available(), 512 * 3_000_000);
        Ok(())
    }

    #[test]
    fn column_aligned_output_parses() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(
            "Filesystem    512-blocks      Used  Available  Capacity  Mounted on\n\
             /dev/sda1        2000000    500000    1500000       25%  /data\n",
        );
        let mut usage = DiskUsage::with_runner("/data", runner);

        usage.refresh()?;
        assert_eq!(usage.total(), 512 * 2_000_000);
        Ok(())
    }

    #[test]
    fn absent_path_keeps_prior_values_and_reports_miss() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(SAMPLE);
        let mut usage = DiskUsage::with_runner("/not-mounted", runner);

        let snapshot = usage.refresh()?;
        assert!(!snapshot.matched);
        assert_eq!(usage.total(), 0);
        assert_eq!(usage.available(), 0);
        Ok(())
    }

    #[test]
    fn miss_after_match_retains_last_figures() -> Result<(), ProbeError> {
        // The mount disappears from the table between probes.
        let runner = SequencedRunner::new(&[
            SAMPLE,
            "Filesystem 1024-blocks Used Available Capacity Mounted\n",
        ]);
        let mut usage = DiskUsage::with_runner("/data", runner);

        usage.refresh()?;
        let snapshot = usage.refresh()?;

        assert!(!snapshot.matched);
        assert_eq!(usage.total(), 512 * 2_000_000);
        assert_eq!(usage.available(), 512 * 1_500_000);
        Ok(())
    }

    #[test]
    fn refresh_probes_exactly_once_and_reads_do_not_probe() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(SAMPLE);
        let shared: Arc<dyn CommandRunner> = runner.clone();
        let mut usage = DiskUsage::with_runner("/data", shared);

        usage.refresh()?;
        assert_eq!(runner.calls(), 1);

        let _ = usage.total();
        let _ = usage.available();
        assert_eq!(runner.calls(), 1);

        usage.refresh()?;
        assert_eq!(runner.calls(), 2);
        Ok(())
    }

    #[test]
    fn repeated_refresh_is_idempotent_for_stable_disks() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(SAMPLE);
        let mut usage = DiskUsage::with_runner("/data", runner);

        usage.refresh()?;
        let first = usage.available();
        usage.refresh()?;
        assert_eq!(usage.available(), first);
        Ok(())
    }

    #[test]
    fn non_numeric_block_count_is_malformed_output() {
        let runner = ScriptedRunner::new(
            "Filesystem 1024-blocks Used Available Capacity Mounted\n\
             /dev/sda1 lots 500000 1500000 25% /data\n",
        );
        let mut usage = DiskUsage::with_runner("/data", runner);

        let err = usage.refresh();
        assert!(matches!(err, Err(ProbeError::MalformedOutput { .. })));
    }

    #[test]
    fn irregular_rows_are_ignored() -> Result<(), ProbeError> {
        let runner = ScriptedRunner::new(
            "Filesystem 1024-blocks Used Available Capacity Mounted\n\
             map auto_home 0 0 0 100% /home\n\
             /dev/sda1 2000000 500000 1500000 25% /data\n",
        );
        let mut usage = DiskUsage::with_runner("/data", runner);

        usage.refresh()?;
        assert_eq!(usage.total(), 512 * 2_000_000);
        Ok(())
    }
}
