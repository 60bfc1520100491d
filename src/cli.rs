//! Command-line interface definitions for h2sweep.
//!
//! Uses `clap` derive macros for declarative argument parsing. Flags left
//! unset fall back to the loaded [`AppSettings`].

use crate::config::AppSettings;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::scanner::{run_scan, RustlsTransport, ScanConfig, ScanSummary};
use crate::sink::FileSink;
use crate::types::{Address, Direction, Port};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sweep consecutive IPv4 addresses for TLS servers that negotiate HTTP/2.
#[derive(Parser, Debug)]
#[command(name = "h2sweep")]
#[command(version)]
#[command(about = "Find TLS servers offering HTTP/2 across an IPv4 range", long_about = None)]
pub struct Cli {
    /// Address the sweep starts after
    #[arg(long, value_name = "IPV4", default_value = "0.0.0.0")]
    pub addr: Address,

    /// Port to probe on every address [default: 443]
    #[arg(long)]
    pub port: Option<Port>,

    /// Number of concurrent workers [default: 128]
    #[arg(long, alias = "threads")]
    pub thread: Option<usize>,

    /// Append report lines and domains to the output files
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "true",
        default_missing_value = "true"
    )]
    pub output: bool,

    /// Connect and handshake timeout in seconds [default: 4]
    #[arg(long, alias = "timeOut")]
    pub timeout: Option<u64>,

    /// Also report failed dials, failed handshakes and non-h2 servers
    #[arg(long, alias = "showFail")]
    pub show_fail: bool,

    /// Number of addresses to sweep [default: 10000]
    #[arg(long)]
    pub count: Option<usize>,

    /// Walk the address space downward
    #[arg(long)]
    pub reverse: bool,

    /// Directory holding the results and domains files
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    pub summary_json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Load settings from `--config` or the default location.
    pub fn settings(&self) -> CliResult<AppSettings> {
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load()?,
        };
        Ok(settings)
    }

    /// Build the sweep configuration, preferring flags over settings.
    pub fn scan_config(&self, settings: &AppSettings) -> CliResult<ScanConfig> {
        let direction = if self.reverse {
            Direction::Backward
        } else {
            Direction::Forward
        };
        let timeout_secs = self.timeout.unwrap_or(settings.default_timeout_secs);

        let mut config = ScanConfig::new(self.addr)
            .with_direction(direction)
            .with_count(self.count.unwrap_or(settings.default_count))
            .with_port(self.port.unwrap_or(settings.default_port))
            .with_workers(self.thread.unwrap_or(settings.default_threads))
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_queue_capacity(settings.queue_capacity);

        if self.show_fail {
            config = config.with_failures();
        }
        if self.progress {
            config = config.with_progress();
        }

        config.validate()?;
        Ok(config)
    }

    /// Run the sweep described by these arguments.
    pub async fn execute(&self) -> CliResult<ScanSummary> {
        let settings = self.settings()?;
        let config = self.scan_config(&settings)?;
        debug!("scan config: {:?}", config);

        if !self.output_dir.is_dir() {
            return Err(CliError::Other(format!(
                "output directory does not exist: {}",
                self.output_dir.display()
            )));
        }

        let sink = FileSink::open(
            &self.output_dir.join(&settings.results_file),
            &self.output_dir.join(&settings.domains_file),
            self.output,
        )?;
        let transport = Arc::new(RustlsTransport::new()?);

        if !self.quiet && !self.summary_json {
            output::print_scan_header(&config);
            if self.output {
                output::print_info(&format!(
                    "Appending to {} and {}",
                    sink.results_path().display(),
                    sink.domains_path().display()
                ));
            } else {
                output::print_warning("output disabled, report lines are only logged");
            }
        }

        let summary = run_scan(config, transport, sink).await?;

        if self.summary_json {
            output::print_summary_json(&summary)?;
        } else if !self.quiet {
            output::print_summary(&summary);
        }

        Ok(summary)
    }
}
