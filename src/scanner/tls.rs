//! TLS probing over real sockets.
//!
//! [`RustlsTransport`] dials with [`tcp::connect`](super::tcp::connect) and
//! runs a rustls client handshake that offers `h2` then `http/1.1` and
//! accepts any certificate chain. Handshake signatures are still checked so
//! the negotiated parameters are genuine; only the chain of trust and the
//! hostname binding are skipped.

use super::tcp;
use super::traits::{Connection, TlsSession, TlsVersion, Transport};
use crate::error::{ScanError, ScanResult};
use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, ProtocolVersion, SignatureScheme};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

/// ALPN identifiers offered during the handshake, in preference order.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// Certificate verifier that trusts every chain.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build the client configuration shared by every probe.
pub fn client_config() -> ScanResult<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(rustls::ALL_VERSIONS)
        .map_err(|e| ScanError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
        .with_no_client_auth();
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    Ok(Arc::new(config))
}

/// Production transport: TCP via tokio, TLS via rustls.
#[derive(Clone)]
pub struct RustlsTransport {
    connector: TlsConnector,
}

impl RustlsTransport {
    pub fn new() -> ScanResult<Self> {
        Ok(Self {
            connector: TlsConnector::from(client_config()?),
        })
    }
}

#[async_trait]
impl Transport for RustlsTransport {
    type Connection = TcpConnection;

    async fn dial(&self, target: &str, limit: Duration) -> ScanResult<TcpConnection> {
        let stream = tcp::connect(target, limit).await?;
        Ok(TcpConnection {
            stream,
            connector: self.connector.clone(),
        })
    }
}

/// A connected socket waiting for its TLS handshake.
pub struct TcpConnection {
    stream: TcpStream,
    connector: TlsConnector,
}

#[async_trait]
impl Connection for TcpConnection {
    fn peer_addr(&self) -> ScanResult<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    async fn handshake(self, limit: Duration) -> ScanResult<TlsSession> {
        let peer = self.stream.peer_addr()?;
        // Targets are bare IPs: no SNI is sent, the certificate is read as-is.
        let server_name = ServerName::from(peer.ip());

        let tls = match timeout(limit, self.connector.connect(server_name, self.stream)).await {
            Ok(Ok(tls)) => tls,
            Ok(Err(e)) => return Err(ScanError::Handshake(e.to_string())),
            Err(_) => return Err(ScanError::HandshakeTimeout),
        };

        let (_, session) = tls.get_ref();
        Ok(TlsSession {
            version: session.protocol_version().map(map_protocol_version),
            alpn: session
                .alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
            common_name: leaf_common_name(session.peer_certificates()),
        })
    }
}

fn map_protocol_version(version: ProtocolVersion) -> TlsVersion {
    TlsVersion::from_wire(u16::from(version))
}

/// Subject CN of the first (leaf) certificate, or an empty string.
pub fn leaf_common_name(chain: Option<&[CertificateDer<'_>]>) -> String {
    let Some(leaf) = chain.and_then(|certs| certs.first()) else {
        return String::new();
    };

    match X509Certificate::from_der(leaf.as_ref()) {
        Ok((_, cert)) => cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string(),
        Err(e) => {
            debug!("unparseable peer certificate: {}", e);
            String::new()
        }
    }
}
