//! Result sinks.
//!
//! Workers push [`ReportLine`]s into a channel that a single consumer task
//! drains in arrival order. The consumer hands each line to a
//! [`ResultSink`]; the default [`FileSink`] logs it, appends it to
//! `results.txt` and appends any domain-looking token to `domains.txt`.
//! Sink failures are logged and counted, never fatal.

use crate::error::{SinkError, SinkResult};
use crate::scanner::ReportLine;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Destination for report lines.
pub trait ResultSink: Send {
    /// Take one line. An error means the line was not fully recorded.
    fn accept(&mut self, line: &ReportLine) -> SinkResult<()>;

    /// Called once after the last line.
    fn flush(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// Counters reported by the consumer task when the channel closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub accepted: usize,
    pub failed: usize,
}

/// Drain `rx` into `sink` on a dedicated task until every sender is gone.
pub fn spawn_consumer<S>(mut rx: mpsc::Receiver<ReportLine>, mut sink: S) -> JoinHandle<SinkStats>
where
    S: ResultSink + 'static,
{
    tokio::spawn(async move {
        let mut stats = SinkStats::default();

        while let Some(line) = rx.recv().await {
            match sink.accept(&line) {
                Ok(()) => stats.accepted += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!("{}", e);
                }
            }
        }

        if let Err(e) = sink.flush() {
            error!("{}", e);
        }

        stats
    })
}

/// Pull the first domain-looking token out of a rendered report line.
///
/// The address column is skipped. A candidate contains a dot, is not a
/// version label like `v1.3` and contains no `/` (ALPN ids like
/// `http/1.1`); anything from the first colon on is cut off.
pub fn extract_domain(line: &str) -> Option<&str> {
    line.split_whitespace()
        .skip(1)
        .find(|token| token.contains('.') && !is_version_label(token) && !token.contains('/'))
        .map(|token| token.split_once(':').map_or(token, |(host, _)| host))
        .filter(|domain| !domain.is_empty())
}

fn is_version_label(token: &str) -> bool {
    token
        .strip_prefix('v')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// An append-only output file.
#[derive(Debug)]
struct OutputFile {
    path: PathBuf,
    file: File,
}

impl OutputFile {
    fn open(path: &Path) -> SinkResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn append_line(&mut self, text: &str) -> SinkResult<()> {
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\n');

        self.file
            .write_all(buf.as_bytes())
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn flush(&mut self) -> SinkResult<()> {
        self.file.flush().map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Logs lines and appends them to the results and domains files.
#[derive(Debug)]
pub struct FileSink {
    persist: bool,
    results: OutputFile,
    domains: OutputFile,
}

impl FileSink {
    /// Open (creating if needed) both output files in append mode.
    ///
    /// Both files are opened even when `persist` is off, since domains are
    /// always recorded. Failing to open either one is a setup error.
    pub fn open(results_path: &Path, domains_path: &Path, persist: bool) -> SinkResult<Self> {
        Ok(Self {
            persist,
            results: OutputFile::open(results_path)?,
            domains: OutputFile::open(domains_path)?,
        })
    }

    pub fn results_path(&self) -> &Path {
        &self.results.path
    }

    pub fn domains_path(&self) -> &Path {
        &self.domains.path
    }
}

impl ResultSink for FileSink {
    fn accept(&mut self, line: &ReportLine) -> SinkResult<()> {
        let text = line.to_string();
        info!("{}", text);

        // Attempt both writes; report the first failure.
        let persisted = if self.persist {
            self.results.append_line(&text)
        } else {
            Ok(())
        };

        let recorded = match extract_domain(&text) {
            Some(domain) => self.domains.append_line(domain),
            None => Ok(()),
        };

        persisted.and(recorded)
    }

    fn flush(&mut self) -> SinkResult<()> {
        self.results.flush().and(self.domains.flush())
    }
}

/// Keeps lines and domains in memory; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
    domains: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn domains(&self) -> Vec<String> {
        self.domains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, line: &ReportLine) -> SinkResult<()> {
        let text = line.to_string();
        if let Some(domain) = extract_domain(&text) {
            self.domains
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(domain.to_string());
        }
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn found(cn: &str) -> ReportLine {
        ReportLine::new(
            "93.184.216.34:443",
            format!("---- TLS v1.3    ALPN: h2 ----    {cn}:443"),
        )
    }

    #[test]
    fn test_extract_domain_from_report_line() {
        let line = "93.184.216.34        ---- TLS v1.3    ALPN: h2 ----    example.com:443";
        assert_eq!(extract_domain(line), Some("example.com"));
    }

    #[test]
    fn test_extract_domain_skips_address_and_alpn() {
        let line = "93.184.216.34:443    ---- TLS v1.2    ALPN: http/1.1 ----    good.example:443";
        assert_eq!(extract_domain(line), Some("good.example"));
    }

    #[test]
    fn test_extract_domain_keeps_names_starting_with_v() {
        let line = "151.101.0.217:443    ---- TLS v1.3    ALPN: h2 ----    vimeo.com:443";
        assert_eq!(extract_domain(line), Some("vimeo.com"));

        let line = "87.240.132.72:443    ---- TLS v    ALPN: h2 ----    vk.com:443";
        assert_eq!(extract_domain(line), Some("vk.com"));

        assert!(is_version_label("v1.3"));
        assert!(!is_version_label("v"));
        assert!(!is_version_label("vk.com"));
    }

    #[test]
    fn test_extract_domain_none() {
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("10.0.0.2:443        dial failed: connection refused"), None);
        assert_eq!(extract_domain("10.0.0.2:443 :x.y"), None);
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempdir().unwrap();
        let results = dir.path().join("results.txt");
        let domains = dir.path().join("domains.txt");
        fs::write(&results, "earlier\n").unwrap();

        let mut sink = FileSink::open(&results, &domains, true).unwrap();
        sink.accept(&found("good.example")).unwrap();
        sink.accept(&ReportLine::new("10.0.0.2:443", "dial failed: connection refused"))
            .unwrap();
        sink.flush().unwrap();

        let written = fs::read_to_string(&results).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "earlier");
        assert!(lines[1].ends_with("good.example:443"));

        assert_eq!(fs::read_to_string(&domains).unwrap(), "good.example\n");
    }

    #[test]
    fn test_file_sink_without_persistence_still_records_domains() {
        let dir = tempdir().unwrap();
        let results = dir.path().join("results.txt");
        let domains = dir.path().join("domains.txt");

        let mut sink = FileSink::open(&results, &domains, false).unwrap();
        sink.accept(&found("good.example")).unwrap();

        assert!(results.exists());
        assert_eq!(fs::read_to_string(&results).unwrap(), "");
        assert_eq!(fs::read_to_string(&domains).unwrap(), "good.example\n");
    }

    #[test]
    fn test_file_sink_open_failure() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("results.txt");
        let domains = dir.path().join("domains.txt");

        let err = FileSink::open(&missing, &domains, true).unwrap_err();
        assert!(matches!(err, SinkError::Open { ref path, .. } if path == &missing));
    }

    struct FlakySink {
        calls: usize,
    }

    impl ResultSink for FlakySink {
        fn accept(&mut self, _line: &ReportLine) -> SinkResult<()> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(SinkError::Write {
                    path: PathBuf::from("results.txt"),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_consumer_survives_write_failures() {
        let (tx, rx) = mpsc::channel(8);
        let consumer = spawn_consumer(rx, FlakySink { calls: 0 });

        for i in 0..5 {
            tx.send(found(&format!("host{i}.example"))).await.unwrap();
        }
        drop(tx);

        let stats = consumer.await.unwrap();
        assert_eq!(stats, SinkStats { accepted: 3, failed: 2 });
    }

    #[tokio::test]
    async fn test_consumer_preserves_arrival_order() {
        let sink = MemorySink::new();
        let (tx, rx) = mpsc::channel(8);
        let consumer = spawn_consumer(rx, sink.clone());

        tx.send(found("first.example")).await.unwrap();
        tx.send(found("second.example")).await.unwrap();
        drop(tx);
        consumer.await.unwrap();

        assert_eq!(sink.domains(), vec!["first.example", "second.example"]);
        assert_eq!(sink.lines().len(), 2);
    }
}
