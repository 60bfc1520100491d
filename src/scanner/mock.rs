//! In-memory transport for tests.
//!
//! Each dial asks a behavior function what the target should do. Opened
//! connections are counted on dial and closed ones on drop, so tests can
//! check that every connection is released exactly once.

use super::traits::{Connection, TlsSession, TlsVersion, Transport};
use crate::error::{ScanError, ScanResult};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Behavior {
    RefuseDial,
    FailHandshake,
    Complete(TlsSession),
}

impl Behavior {
    pub fn complete_h2(common_name: &str) -> Self {
        Self::Complete(TlsSession::new(TlsVersion::Tls13, Some("h2"), common_name))
    }
}

#[derive(Debug, Default)]
struct Counters {
    dials: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

type BehaviorFn = dyn Fn(Ipv4Addr) -> Behavior + Send + Sync;

pub struct MockTransport {
    behavior: Box<BehaviorFn>,
    counters: Arc<Counters>,
}

impl MockTransport {
    pub fn new(behavior: impl Fn(Ipv4Addr) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn always(behavior: Behavior) -> Self {
        Self::new(move |_| behavior.clone())
    }

    pub fn dials(&self) -> usize {
        self.counters.dials.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Connection = MockConnection;

    async fn dial(&self, target: &str, _timeout: Duration) -> ScanResult<MockConnection> {
        self.counters.dials.fetch_add(1, Ordering::SeqCst);

        let peer: SocketAddr = target
            .parse()
            .map_err(|_| ScanError::Dial(format!("unparseable target {target}")))?;
        let IpAddr::V4(ip) = peer.ip() else {
            return Err(ScanError::Dial("mock only speaks IPv4".to_string()));
        };

        match (self.behavior)(ip) {
            Behavior::RefuseDial => Err(ScanError::ConnectionRefused),
            outcome => {
                self.counters.opened.fetch_add(1, Ordering::SeqCst);
                Ok(MockConnection {
                    peer,
                    outcome,
                    counters: Arc::clone(&self.counters),
                })
            }
        }
    }
}

pub struct MockConnection {
    peer: SocketAddr,
    outcome: Behavior,
    counters: Arc<Counters>,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn peer_addr(&self) -> ScanResult<SocketAddr> {
        Ok(self.peer)
    }

    async fn handshake(self, _timeout: Duration) -> ScanResult<TlsSession> {
        match &self.outcome {
            Behavior::Complete(session) => Ok(session.clone()),
            _ => Err(ScanError::Handshake("mock handshake failure".to_string())),
        }
    }
}
