//! Identity queries: asking a reachable host for its configured name.
//!
//! The production client speaks SNMP v2c and fetches `sysName.0`. A session is
//! a connected UDP socket, released when it goes out of scope on every path.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use scout_common::config::DiscoveryConfig;
use scout_protocols::snmp::{self, GetResponse};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace};

const MAX_DATAGRAM: usize = 65_507;
const DEFAULT_RETRIES: u32 = 1;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not open SNMP session with {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("SNMP query to {addr} failed: {reason}")]
    Query { addr: SocketAddr, reason: String },
    #[error("{addr} returned no string value for sysName.0")]
    UnexpectedType { addr: SocketAddr },
}

#[async_trait]
pub trait IdentityQuery: Send + Sync {
    /// Returns the human-readable name `addr` reports for itself.
    async fn query(&self, addr: Ipv4Addr) -> Result<String, QueryError>;
}

/// Fetches `sysName.0` over SNMP v2c with a single retry.
#[derive(Debug, Clone)]
pub struct SnmpIdentityClient {
    community: String,
    port: u16,
    timeout: Duration,
    retries: u32,
}

impl SnmpIdentityClient {
    pub fn new(community: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            community: community.into(),
            port,
            timeout,
            retries: DEFAULT_RETRIES,
        }
    }

    pub fn from_config(cfg: &DiscoveryConfig) -> Self {
        Self::new(cfg.community.clone(), cfg.snmp_port, cfg.snmp_timeout())
    }
}

#[async_trait]
impl IdentityQuery for SnmpIdentityClient {
    async fn query(&self, addr: Ipv4Addr) -> Result<String, QueryError> {
        let session = Session::open(SocketAddr::from((addr, self.port))).await?;
        let response = session
            .get(self.community.as_bytes(), self.timeout, self.retries)
            .await?;

        if response.error_status != 0 {
            return Err(session.query_error(format!(
                "agent reported error-status {} at index {}",
                response.error_status, response.error_index
            )));
        }

        let name = response.text.ok_or(QueryError::UnexpectedType {
            addr: session.target,
        })?;

        Ok(String::from_utf8_lossy(&name).into_owned())
    }
}

struct Session {
    socket: UdpSocket,
    target: SocketAddr,
}

impl Session {
    async fn open(target: SocketAddr) -> Result<Self, QueryError> {
        let connect = |source| QueryError::Connect {
            addr: target,
            source,
        };
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(connect)?;
        socket.connect(target).await.map_err(connect)?;
        Ok(Self { socket, target })
    }

    fn query_error(&self, reason: impl Into<String>) -> QueryError {
        QueryError::Query {
            addr: self.target,
            reason: reason.into(),
        }
    }

    /// Sends a GetRequest and waits for the matching response, resending up to `retries` times.
    async fn get(
        &self,
        community: &[u8],
        timeout: Duration,
        retries: u32,
    ) -> Result<GetResponse, QueryError> {
        let request_id: i32 = rand::random_range(1..i32::MAX);
        let packet = snmp::create_get_request(community, request_id, snmp::SYS_NAME);

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut last_failure = String::from("no attempt made");

        for attempt in 0..=retries {
            if attempt > 0 {
                debug!("retrying SNMP request to {} ({last_failure})", self.target);
            }
            match self.attempt(&packet, request_id, timeout, &mut buf).await {
                Ok(response) => return Ok(response),
                Err(reason) => last_failure = reason,
            }
        }

        Err(self.query_error(format!("{last_failure} after {} attempts", retries + 1)))
    }

    async fn attempt(
        &self,
        packet: &[u8],
        request_id: i32,
        timeout: Duration,
        buf: &mut [u8],
    ) -> Result<GetResponse, String> {
        self.socket
            .send(packet)
            .await
            .map_err(|e| format!("send failed: {e}"))?;

        let deadline = Instant::now() + timeout;
        loop {
            let len = match tokio::time::timeout_at(deadline, self.socket.recv(buf)).await {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => return Err(format!("receive failed: {e}")),
                Err(_elapsed) => return Err(format!("timed out after {timeout:?}")),
            };

            match snmp::parse_response(&buf[..len]) {
                Ok(response) if response.request_id == request_id => return Ok(response),
                Ok(response) => trace!(
                    "ignoring response {} from {} while waiting for {request_id}",
                    response.request_id, self.target
                ),
                Err(e) => trace!("ignoring datagram from {}: {e}", self.target),
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use ::snmp::{SnmpPdu, Value, pdu};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Binds a fake agent on loopback. `reply` sees the request number (from 0)
    /// and the raw request and returns the datagrams to answer with.
    async fn spawn_agent<F>(reply: F) -> (u16, Arc<AtomicUsize>)
    where
        F: Fn(usize, &[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                for bytes in reply(n, &buf[..len]) {
                    socket.send_to(&bytes, peer).await.unwrap();
                }
            }
        });

        (port, seen)
    }

    fn request_id(request: &[u8]) -> i32 {
        SnmpPdu::from_bytes(request).unwrap().req_id
    }

    fn respond(request_id: i32, value: Value) -> Vec<u8> {
        let mut buf = pdu::Buf::default();
        pdu::build_response(b"public", request_id, &[(snmp::SYS_NAME, value)], &mut buf);
        buf.to_vec()
    }

    /// Overwrites the error-status of a response built by `respond`.
    fn with_error_status(mut bytes: Vec<u8>, status: u8) -> Vec<u8> {
        // error-status, error-index, then the varbind list
        let marker = [0x02, 0x01, 0x00, 0x02, 0x01, 0x00, 0x30];
        let at = bytes
            .windows(marker.len())
            .position(|w| w == &marker[..])
            .unwrap();
        bytes[at + 2] = status;
        bytes
    }

    fn client(port: u16) -> SnmpIdentityClient {
        SnmpIdentityClient::new("public", port, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn returns_sys_name() {
        let (port, seen) = spawn_agent(|_, req| {
            let id = request_id(req);
            assert_eq!(req.to_vec(), snmp::create_get_request(b"public", id, snmp::SYS_NAME));
            vec![respond(id, Value::OctetString(b"core-sw-01"))]
        })
        .await;

        let name = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap();
        assert_eq!(name, "core-sw-01");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_after_lost_request() {
        let (port, seen) = spawn_agent(|n, req| match n {
            0 => vec![],
            _ => vec![respond(request_id(req), Value::OctetString(b"late"))],
        })
        .await;

        let name = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap();
        assert_eq!(name, "late");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let (port, seen) = spawn_agent(|_, _| vec![]).await;

        let err = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap_err();
        assert!(matches!(err, QueryError::Query { .. }), "got {err:?}");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ignores_responses_for_other_requests() {
        let (port, seen) = spawn_agent(|_, req| {
            let id = request_id(req);
            vec![
                respond(id.wrapping_add(1), Value::OctetString(b"stale")),
                respond(id, Value::OctetString(b"fresh")),
            ]
        })
        .await;

        let name = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap();
        assert_eq!(name, "fresh");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn garbage_does_not_use_up_the_retry() {
        let (port, seen) = spawn_agent(|_, req| {
            vec![
                b"not snmp at all".to_vec(),
                respond(request_id(req), Value::OctetString(b"after-junk")),
            ]
        })
        .await;

        let name = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap();
        assert_eq!(name, "after-junk");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn only_garbage_is_a_query_error() {
        let (port, seen) = spawn_agent(|_, _| vec![vec![0x30, 0x03, 0x02, 0x01]]).await;

        let err = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap_err();
        assert!(matches!(err, QueryError::Query { .. }), "got {err:?}");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_string_value_is_unexpected_type() {
        let (port, _) =
            spawn_agent(|_, req| vec![respond(request_id(req), Value::Integer(1234))]).await;

        let err = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedType { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn agent_error_status_is_query_error() {
        let (port, _) = spawn_agent(|_, req| {
            let reply = respond(request_id(req), Value::OctetString(b"unused"));
            vec![with_error_status(reply, 5)]
        })
        .await;

        let err = client(port).query(Ipv4Addr::LOCALHOST).await.unwrap_err();
        match err {
            QueryError::Query { reason, .. } => assert!(reason.contains("error-status 5")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn client_follows_config() {
        let cfg = DiscoveryConfig::from_json(
            r#"{ "community": "secret", "snmp_timeout": 4, "snmp_port": 1161 }"#,
        )
        .unwrap();
        let client = SnmpIdentityClient::from_config(&cfg);

        assert_eq!(client.community, "secret");
        assert_eq!(client.port, 1161);
        assert_eq!(client.timeout, Duration::from_secs(4));
        assert_eq!(client.retries, 1);
    }
}
