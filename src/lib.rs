//! # h2sweep - HTTP/2 Discovery Across IPv4 Ranges
//!
//! h2sweep walks consecutive IPv4 addresses from a starting point, opens a
//! TLS connection to one port on each, and records the servers whose
//! handshake negotiates `h2` via ALPN together with the common name of the
//! certificate they present.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use h2sweep::scanner::{run_scan, RustlsTransport, ScanConfig};
//! use h2sweep::sink::MemorySink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig::new("192.0.2.0".parse().unwrap()).with_count(256);
//!     let transport = Arc::new(RustlsTransport::new().unwrap());
//!     let sink = MemorySink::new();
//!
//!     let summary = run_scan(config, transport, sink.clone()).await.unwrap();
//!     println!("{} reported", summary.reported);
//!     for line in sink.lines() {
//!         println!("{}", line);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - `Address`, `Direction` and `Port` newtypes
//! - [`scanner`] - address cursor, probe/classify, worker pool and `run_scan`
//! - [`sink`] - the single consumer that persists report lines and domains
//! - [`config`] - settings file handling
//! - [`error`] - error types
//! - [`cli`], [`logging`], [`output`] - the binary's surface

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod sink;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError, SinkError};
pub use scanner::{run_scan, ReportLine, ScanConfig, ScanSummary};
pub use sink::{FileSink, MemorySink, ResultSink};
pub use types::{Address, Direction, Port};
