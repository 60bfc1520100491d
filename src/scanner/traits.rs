//! Transport abstraction and handshake outcome types.
//!
//! The prober only talks to a [`Transport`], so the network can be swapped
//! for an in-memory fake in tests. A [`Connection`] is consumed by its
//! handshake, which means the underlying stream is dropped, and therefore
//! closed, on every path out of a probe.

use crate::error::ScanError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Negotiated TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
    /// Anything else the peer negotiated, by wire code.
    Unknown(u16),
}

impl TlsVersion {
    /// Map a wire-format version code (`0x0301`..=`0x0304`).
    pub const fn from_wire(code: u16) -> Self {
        match code {
            0x0301 => Self::Tls10,
            0x0302 => Self::Tls11,
            0x0303 => Self::Tls12,
            0x0304 => Self::Tls13,
            other => Self::Unknown(other),
        }
    }

    /// Short label used in report lines; empty for unknown versions.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tls10 => "1.0",
            Self::Tls11 => "1.1",
            Self::Tls12 => "1.2",
            Self::Tls13 => "1.3",
            Self::Unknown(_) => "",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "TLS 0x{code:04x}"),
            known => write!(f, "TLS {}", known.label()),
        }
    }
}

/// What a completed handshake told us about the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSession {
    /// Negotiated protocol version, `None` if the library did not report one.
    pub version: Option<TlsVersion>,
    /// Negotiated ALPN protocol, if any.
    pub alpn: Option<String>,
    /// Subject common name of the leaf certificate; empty when absent.
    pub common_name: String,
}

impl TlsSession {
    pub fn new(version: TlsVersion, alpn: Option<&str>, common_name: impl Into<String>) -> Self {
        Self {
            version: Some(version),
            alpn: alpn.map(str::to_string),
            common_name: common_name.into(),
        }
    }
}

/// Outcome of probing a single address.
#[derive(Debug)]
pub enum HandshakeResult {
    /// TCP connect failed or timed out.
    DialFailed { target: String, error: ScanError },
    /// TCP connected, TLS did not complete.
    HandshakeFailed { remote: SocketAddr, error: ScanError },
    /// TLS completed.
    Completed {
        remote: SocketAddr,
        session: TlsSession,
    },
}

impl HandshakeResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// An established connection that has not yet negotiated TLS.
#[async_trait]
pub trait Connection: Send {
    /// Remote address as observed on the socket.
    fn peer_addr(&self) -> Result<SocketAddr, ScanError>;

    /// Run the TLS client handshake, bounded by `timeout`.
    ///
    /// Consumes the connection: whatever the outcome, the stream is closed
    /// by the time this returns.
    async fn handshake(self, timeout: Duration) -> Result<TlsSession, ScanError>;
}

/// Something that can open connections to scan targets.
///
/// # Example
///
/// ```ignore
/// use h2sweep::scanner::{probe, RustlsTransport};
///
/// let transport = RustlsTransport::new()?;
/// let result = probe(&transport, address, port, timeout).await;
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    type Connection: Connection;

    /// Connect to `target` (a `host:port` string), bounded by `timeout`.
    async fn dial(&self, target: &str, timeout: Duration) -> Result<Self::Connection, ScanError>;
}
