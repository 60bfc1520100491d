//! Console output helpers.
//!
//! Report lines themselves go through `tracing`; this module only prints the
//! header and summary around a sweep, plus error and warning messages.

use crate::scanner::{ScanConfig, ScanSummary};
use console::style;
use std::io::{self, Write};

/// Print a scan header before scanning begins.
pub fn print_scan_header(config: &ScanConfig) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("h2sweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Start: {} ({})",
        style("•").dim(),
        style(config.start).white().bold(),
        config.direction
    );
    println!(
        "{} Port: {}   Workers: {}   Timeout: {}s",
        style("•").dim(),
        style(config.port).yellow(),
        config.workers,
        config.timeout.as_secs()
    );
    println!(
        "{} Sweeping {} addresses...",
        style("•").dim(),
        style(config.count).white().bold()
    );
    println!();
}

/// Print the human-readable summary.
pub fn print_summary(summary: &ScanSummary) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    // A closed stdout is not worth failing the scan over.
    let _ = write_summary(&mut out, summary);
}

fn write_summary(out: &mut impl Write, summary: &ScanSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "  {} {} addresses probed in {:.2}s (last: {})",
        style("Statistics:").bold(),
        summary.completed,
        summary.duration_ms as f64 / 1000.0,
        summary.last_address
    )?;
    writeln!(
        out,
        "               {} handshakes, {} reported",
        style(summary.handshakes).cyan(),
        style(summary.reported).green().bold()
    )?;

    if summary.exhausted {
        writeln!(
            out,
            "  {} address space ended after {} of {} addresses",
            style("Note:").yellow().bold(),
            summary.enqueued,
            summary.requested
        )?;
    }
    if summary.sink_failures > 0 {
        writeln!(
            out,
            "  {} {} lines could not be written",
            style("Warning:").yellow().bold(),
            summary.sink_failures
        )?;
    }

    writeln!(out)?;
    Ok(())
}

/// Print the summary as pretty JSON on stdout.
pub fn print_summary_json(summary: &ScanSummary) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Direction, Port};

    fn summary(exhausted: bool) -> ScanSummary {
        ScanSummary {
            start: Address::ZERO,
            direction: Direction::Forward,
            port: Port::HTTPS,
            requested: 10,
            enqueued: if exhausted { 4 } else { 10 },
            completed: if exhausted { 4 } else { 10 },
            handshakes: 2,
            reported: 1,
            sink_failures: 0,
            exhausted,
            last_address: "0.0.0.10".parse().unwrap(),
            duration_ms: 1500,
        }
    }

    #[test]
    fn test_summary_mentions_exhaustion() {
        console::set_colors_enabled(false);

        let mut buf = Vec::new();
        write_summary(&mut buf, &summary(true)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("4 addresses probed in 1.50s"));
        assert!(text.contains("after 4 of 10 addresses"));

        let mut buf = Vec::new();
        write_summary(&mut buf, &summary(false)).unwrap();
        assert!(!String::from_utf8(buf).unwrap().contains("address space ended"));
    }

    #[test]
    fn test_summary_json_fields() {
        let json = serde_json::to_value(summary(false)).unwrap();
        assert_eq!(json["start"], "0.0.0.0");
        assert_eq!(json["direction"], "forward");
        assert_eq!(json["port"], 443);
        assert_eq!(json["reported"], 1);
    }
}
