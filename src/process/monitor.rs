use crate::error::{BabysitError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the process information filesystem
const DEFAULT_PROC_ROOT: &str = "/proc";

/// Resource usage of a single process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessUsage {
    /// Proportional set size in bytes
    pub pss_bytes: u64,
    /// User-mode CPU time
    pub cpu_time: Duration,
    pub num_threads: u32,
}

/// Reads memory and CPU counters of a process from `/proc`
#[derive(Debug, Clone)]
pub struct ResourceReader {
    proc_root: PathBuf,
    clock_ticks_per_sec: u64,
}

impl ResourceReader {
    /// Create a reader for the real `/proc` with the given kernel tick rate
    pub fn new(clock_ticks_per_sec: u64) -> Self {
        Self::with_proc_root(DEFAULT_PROC_ROOT, clock_ticks_per_sec)
    }

    /// Create a reader rooted somewhere other than `/proc`
    pub fn with_proc_root<P: AsRef<Path>>(proc_root: P, clock_ticks_per_sec: u64) -> Self {
        Self {
            proc_root: proc_root.as_ref().to_path_buf(),
            clock_ticks_per_sec: clock_ticks_per_sec.max(1),
        }
    }

    /// Read the current usage of `pid`
    ///
    /// # Returns
    /// * `Ok(ProcessUsage)` - Counters were read
    /// * `Err(BabysitError::ProcessInfoUnavailable)` - The process is gone or
    ///   its accounting files could not be read or parsed
    pub async fn read(&self, pid: u32) -> Result<ProcessUsage> {
        let unavailable = |reason: String| BabysitError::ProcessInfoUnavailable(pid, reason);

        if pid == 0 {
            return Err(unavailable("no process has been started".to_string()));
        }

        let process_dir = self.proc_root.join(pid.to_string());

        let smaps = tokio::fs::read_to_string(process_dir.join("smaps"))
            .await
            .map_err(|e| unavailable(format!("smaps: {}", e)))?;
        let pss_kb = sum_prefixed_values(&smaps, "Pss:").map_err(unavailable)?;

        let stat = tokio::fs::read_to_string(process_dir.join("stat"))
            .await
            .map_err(|e| unavailable(format!("stat: {}", e)))?;
        let (utime_ticks, num_threads) = parse_stat(&stat).map_err(unavailable)?;

        Ok(ProcessUsage {
            pss_bytes: pss_kb * 1024,
            cpu_time: ticks_to_duration(utime_ticks, self.clock_ticks_per_sec),
            num_threads,
        })
    }
}

/// Sum the numeric value of every line starting with `prefix`
fn sum_prefixed_values(contents: &str, prefix: &str) -> std::result::Result<u64, String> {
    let mut total: u64 = 0;

    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix(prefix) {
            let value = rest
                .split_whitespace()
                .next()
                .ok_or_else(|| format!("missing value after {}", prefix))?;
            let value: u64 = value
                .parse()
                .map_err(|e| format!("invalid {} value '{}': {}", prefix, value, e))?;
            total = total.saturating_add(value);
        }
    }

    Ok(total)
}

/// Extract utime (field 14) and num_threads (field 20) from `/proc/<pid>/stat`
fn parse_stat(stat: &str) -> std::result::Result<(u64, u32), String> {
    // comm (field 2) may contain spaces and parentheses; skip to the last ')'
    let after_comm = stat
        .rfind(')')
        .map(|idx| &stat[idx + 1..])
        .ok_or_else(|| "malformed stat: missing command name".to_string())?;

    // Fields from here on start at field 3 (state)
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let field = |number: usize| {
        fields
            .get(number - 3)
            .copied()
            .ok_or_else(|| format!("malformed stat: missing field {}", number))
    };

    let utime = field(14)?
        .parse::<u64>()
        .map_err(|e| format!("invalid utime: {}", e))?;
    let num_threads = field(20)?
        .parse::<u32>()
        .map_err(|e| format!("invalid thread count: {}", e))?;

    Ok((utime, num_threads))
}

fn ticks_to_duration(ticks: u64, ticks_per_sec: u64) -> Duration {
    let secs = ticks / ticks_per_sec;
    let rem = ticks % ticks_per_sec;
    Duration::from_secs(secs) + Duration::from_nanos(rem * 1_000_000_000 / ticks_per_sec)
}
