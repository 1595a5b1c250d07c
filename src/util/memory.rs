//! Resident-set-size sampling.
//!
//! The seed generator flushes its in-memory buffer to disk when the process
//! RSS crosses a fraction of the configured memory limit, so it needs a cheap
//! way to ask the OS how much memory the process currently holds.

/// Current resident set size of this process in MiB.
///
/// Returns 0 when the value cannot be determined (non-Linux platforms or a
/// missing procfs), which disables RSS-based flushing.
pub fn current_rss_mb() -> usize {
    #[cfg(target_os = "linux")]
    {
        let status = match std::fs::read_to_string("/proc/self/status") {
            Ok(s) => s,
            Err(_) => return 0,
        };
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                let kb: usize = rest
                    .trim()
                    .trim_end_matches("kB")
                    .trim()
                    .parse()
                    .unwrap_or(0);
                return kb / 1024;
            }
        }
        0
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_is_sane() {
        // A running test process occupies at least some memory; on platforms
        // without procfs the probe reports 0.
        let rss = current_rss_mb();
        assert!(rss < 1024 * 1024);
    }
}
