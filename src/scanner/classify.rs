//! Connect, handshake, and decide what is worth reporting.
//!
//! [`probe`] runs the network side for one address and always yields a
//! [`HandshakeResult`]. [`classify`] is the pure decision step that turns a
//! result into an optional [`ReportLine`]:
//!
//! - failures are only surfaced when failure reporting is on;
//! - successful handshakes must pass the report gate (TLS 1.3 with `h2`,
//!   unless failure reporting is on) and the certificate plausibility filter.

use super::tcp::dial_target;
use super::traits::{Connection, HandshakeResult, TlsVersion, Transport};
use crate::types::Port;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tracing::trace;

/// Stand-in for a missing ALPN value, two columns wide like `h2`.
pub const ALPN_PLACEHOLDER: &str = "  ";

/// Width of the address column in report lines.
pub const ADDRESS_WIDTH: usize = 20;

/// Certificate names that appliances and default installs ship with.
pub const PLACEHOLDER_CERT_NAMES: [&str; 2] = ["invalid2.invalid", "OPNsense.localdomain"];

/// Decides which results leave the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPolicy {
    /// Report dial/handshake failures and bypass the TLS 1.3 + h2 gate.
    pub show_failures: bool,
    /// The scanned port, echoed at the end of success lines.
    pub port: Port,
}

/// One formatted result, aligned on the address column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    address: String,
    detail: String,
}

impl ReportLine {
    pub fn new(address: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            detail: detail.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<width$} {}",
            self.address,
            self.detail,
            width = ADDRESS_WIDTH
        )
    }
}

/// Dial `ip:port` and, if that works, run the TLS handshake.
///
/// Both phases get the full `limit`; the handshake clock starts when the
/// TLS layer begins, not when the dial did.
pub async fn probe<T>(transport: &T, ip: IpAddr, port: Port, limit: Duration) -> HandshakeResult
where
    T: Transport + ?Sized,
{
    let target = dial_target(ip, port.as_u16());

    let conn = match transport.dial(&target, limit).await {
        Ok(conn) => conn,
        Err(error) => {
            trace!(%target, %error, "dial failed");
            return HandshakeResult::DialFailed { target, error };
        }
    };

    let remote = match conn.peer_addr() {
        Ok(remote) => remote,
        Err(error) => return HandshakeResult::DialFailed { target, error },
    };

    match conn.handshake(limit).await {
        Ok(session) => HandshakeResult::Completed { remote, session },
        Err(error) => {
            trace!(%remote, %error, "handshake failed");
            HandshakeResult::HandshakeFailed { remote, error }
        }
    }
}

/// Turn a probe outcome into a report line, or `None` if it is not reported.
pub fn classify(result: &HandshakeResult, policy: &ReportPolicy) -> Option<ReportLine> {
    match result {
        HandshakeResult::DialFailed { target, error } => policy
            .show_failures
            .then(|| ReportLine::new(target.as_str(), format!("dial failed: {error}"))),

        HandshakeResult::HandshakeFailed { remote, error } => policy.show_failures.then(|| {
            ReportLine::new(remote.to_string(), format!("TLS handshake failed: {error}"))
        }),

        HandshakeResult::Completed { remote, session } => {
            let alpn = session
                .alpn
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(ALPN_PLACEHOLDER);

            if !passes_report_gate(policy.show_failures, session.version, alpn) {
                return None;
            }
            if is_placeholder_certificate(&session.common_name) {
                trace!(%remote, cn = %session.common_name, "certificate filtered");
                return None;
            }

            let label = session.version.map(TlsVersion::label).unwrap_or_default();
            Some(ReportLine::new(
                remote.to_string(),
                format!(
                    "---- TLS v{}    ALPN: {} ----    {}:{}",
                    label, alpn, session.common_name, policy.port
                ),
            ))
        }
    }
}

/// The report gate: everything when failures are shown, otherwise only
/// TLS 1.3 sessions that negotiated `h2`.
pub fn passes_report_gate(show_failures: bool, version: Option<TlsVersion>, alpn: &str) -> bool {
    show_failures || (version == Some(TlsVersion::Tls13) && alpn == "h2")
}

/// Whether a subject CN looks like a default or throwaway certificate.
///
/// Only names with exactly one dot survive (`example.com`, not `localhost`
/// or `www.example.com`), and wildcards and known placeholders are dropped.
pub fn is_placeholder_certificate(common_name: &str) -> bool {
    common_name.starts_with('*')
        || common_name == "localhost"
        || common_name.matches('.').count() != 1
        || PLACEHOLDER_CERT_NAMES.contains(&common_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::scanner::traits::TlsSession;
    use std::net::SocketAddr;

    fn policy(show_failures: bool) -> ReportPolicy {
        ReportPolicy {
            show_failures,
            port: Port::HTTPS,
        }
    }

    fn remote() -> SocketAddr {
        "93.184.216.34:443".parse().unwrap()
    }

    fn completed(version: TlsVersion, alpn: Option<&str>, cn: &str) -> HandshakeResult {
        HandshakeResult::Completed {
            remote: remote(),
            session: TlsSession::new(version, alpn, cn),
        }
    }

    #[test]
    fn test_report_gate_table() {
        let cases = [
            (Some(TlsVersion::Tls13), "h2", true),
            (Some(TlsVersion::Tls13), "http/1.1", false),
            (Some(TlsVersion::Tls12), "h2", false),
            (Some(TlsVersion::Tls12), "http/1.1", false),
        ];

        for (version, alpn, expected) in cases {
            assert_eq!(
                passes_report_gate(false, version, alpn),
                expected,
                "version={version:?} alpn={alpn}"
            );
            assert!(passes_report_gate(true, version, alpn));
        }

        assert!(!passes_report_gate(false, None, "h2"));
        assert!(!passes_report_gate(false, Some(TlsVersion::Tls13), ALPN_PLACEHOLDER));
    }

    #[test]
    fn test_certificate_filter() {
        for rejected in [
            "*.example.com",
            "localhost",
            "a.b.c",
            "invalid2.invalid",
            "OPNsense.localdomain",
            "",
            "router",
        ] {
            assert!(is_placeholder_certificate(rejected), "{rejected} should be rejected");
        }

        assert!(!is_placeholder_certificate("good.example"));
    }

    #[test]
    fn test_success_line_format() {
        let line = classify(
            &completed(TlsVersion::Tls13, Some("h2"), "good.example"),
            &policy(false),
        )
        .unwrap();

        assert_eq!(line.address(), "93.184.216.34:443");
        assert_eq!(
            line.to_string(),
            "93.184.216.34:443    ---- TLS v1.3    ALPN: h2 ----    good.example:443"
        );
    }

    #[test]
    fn test_gate_rejects_without_show_failures() {
        let result = completed(TlsVersion::Tls12, Some("h2"), "good.example");
        assert!(classify(&result, &policy(false)).is_none());

        let result = completed(TlsVersion::Tls13, None, "good.example");
        assert!(classify(&result, &policy(false)).is_none());
    }

    #[test]
    fn test_show_failures_reports_other_versions_with_placeholder() {
        let result = completed(TlsVersion::Tls12, None, "good.example");
        let line = classify(&result, &policy(true)).unwrap();
        assert_eq!(
            line.detail(),
            "---- TLS v1.2    ALPN:    ----    good.example:443"
        );

        let result = completed(TlsVersion::Unknown(0x7f1c), Some("h2"), "good.example");
        let line = classify(&result, &policy(true)).unwrap();
        assert!(line.detail().starts_with("---- TLS v    ALPN: h2"));
    }

    #[test]
    fn test_certificate_filter_applies_with_show_failures() {
        let result = completed(TlsVersion::Tls13, Some("h2"), "localhost");
        assert!(classify(&result, &policy(true)).is_none());
        assert!(classify(&result, &policy(false)).is_none());
    }

    #[test]
    fn test_failures_only_with_show_failures() {
        let dial = HandshakeResult::DialFailed {
            target: "10.0.0.2:443".to_string(),
            error: ScanError::ConnectionRefused,
        };
        assert!(classify(&dial, &policy(false)).is_none());
        let line = classify(&dial, &policy(true)).unwrap();
        assert_eq!(line.address(), "10.0.0.2:443");
        assert_eq!(line.detail(), "dial failed: connection refused");

        let handshake = HandshakeResult::HandshakeFailed {
            remote: remote(),
            error: ScanError::HandshakeTimeout,
        };
        assert!(classify(&handshake, &policy(false)).is_none());
        let line = classify(&handshake, &policy(true)).unwrap();
        assert_eq!(line.detail(), "TLS handshake failed: handshake timed out");
    }

    #[test]
    fn test_long_address_keeps_separator() {
        let line = ReportLine::new("[2001:db8::1]:443", "x");
        assert_eq!(line.to_string(), "[2001:db8::1]:443    x");

        let line = ReportLine::new("255.255.255.255:65535", "x");
        assert_eq!(line.to_string(), "255.255.255.255:65535 x");
    }
}
