//! TCP dialing.
//!
//! Performs a plain connect() through the operating system's socket API,
//! bounded by the configured timeout. Errors are sorted into the few kinds
//! the report lines care about.

use crate::error::{ScanError, ScanResult};
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Render an address as the host part of a `host:port` dial target.
///
/// IPv6 literals are bracket-wrapped so the port separator stays unambiguous.
pub fn dial_target(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{v4}:{port}"),
        IpAddr::V6(v6) => format!("[{v6}]:{port}"),
    }
}

/// Open a TCP connection to `target`, giving up after `limit`.
///
/// Dropping the returned future (or hitting the timeout) abandons the
/// in-flight connect without affecting any other attempt.
pub async fn connect(target: &str, limit: Duration) -> ScanResult<TcpStream> {
    match timeout(limit, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(classify_io_error(e)),
        Err(_) => Err(ScanError::Timeout),
    }
}

fn classify_io_error(e: io::Error) -> ScanError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => ScanError::ConnectionRefused,
        io::ErrorKind::TimedOut => ScanError::Timeout,
        _ => ScanError::Dial(e.to_string()),
    }
}
