//! Crawl-session progress logging (spec §4.3: "writes a rolling
//! per-session log with a per-line memory-usage prefix").
//!
//! The crawl engine and MCP server must never write non-protocol bytes to
//! stdout, so both log via `tracing` to stderr rather than the CLI's
//! plain `println!` idiom. Every crawl-loop log line carries an
//! `rss_kb=<n>` field read from `/proc/self/status` (falling back to
//! `sysinfo` on platforms without `/proc`).

use std::io;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Install a stderr-only `tracing` subscriber for the crawl engine and MCP
/// server. CLI command output is unaffected — it still goes through
/// `println!`.
pub fn init_stderr_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NONE)
        .try_init();
}

/// Current process resident set size in KiB, best-effort.
pub fn resident_set_kb() -> u64 {
    read_proc_self_status_vmrss().unwrap_or_else(sysinfo_rss_kb)
}

#[cfg(target_os = "linux")]
fn read_proc_self_status_vmrss() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            return rest.split_whitespace().next()?.parse().ok();
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn read_proc_self_status_vmrss() -> Option<u64> {
    None
}

fn sysinfo_rss_kb() -> u64 {
    let mut system = sysinfo::System::new();
    let pid = sysinfo::Pid::from_u32(std::process::id());
    system.refresh_process(pid);
    system
        .process(pid)
        .map(|p| p.memory() / 1024)
        .unwrap_or(0)
}

/// Log a crawl-loop progress line with the memory-usage prefix.
///
/// `page_url` is the page just processed (or about to be); `pages_done`
/// and `pages_total` (when known) give session progress.
pub fn log_crawl_progress(page_url: &str, pages_done: u64, pages_total: Option<u64>) {
    let rss_kb = resident_set_kb();
    match pages_total {
        Some(total) => {
            tracing::info!(rss_kb, pages_done, pages_total = total, url = page_url, "crawl progress");
        }
        None => {
            tracing::info!(rss_kb, pages_done, url = page_url, "crawl progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resident_set_kb_returns_nonzero_on_this_platform() {
        assert!(resident_set_kb() > 0);
    }
}
