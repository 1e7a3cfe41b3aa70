#![cfg(test)]
use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scout_common::config::DiscoveryConfig;
use scout_core::discovery::DiscoveryService;
use scout_core::identity::SnmpIdentityClient;
use scout_core::prober::ReachabilityProber;
use scout_core::registrar::{HostRecord, HostRegistrar, RegistrationError};
use scout_protocols::snmp::{create_get_request, SYS_NAME};
use snmp::{pdu, SnmpPdu, Value};
use tokio::net::UdpSocket;

/// Everything on loopback answers the ping.
struct LoopbackProber;

#[async_trait]
impl ReachabilityProber for LoopbackProber {
    async fn probe(&self, addr: Ipv4Addr, _timeout: Duration) -> bool {
        addr.is_loopback()
    }
}

#[derive(Default)]
struct RecordingRegistrar {
    hosts: Mutex<Vec<(HostRecord, String, String)>>,
}

#[async_trait]
impl HostRegistrar for RecordingRegistrar {
    async fn register(
        &self,
        record: &HostRecord,
        group_id: &str,
        proxy_id: &str,
    ) -> Result<(), RegistrationError> {
        self.hosts
            .lock()
            .unwrap()
            .push((record.clone(), group_id.to_string(), proxy_id.to_string()));
        Ok(())
    }
}

/// Starts one SNMP agent per `127.0.0.<octet>`, all sharing a port. Each agent
/// answers with `lo-<octet>` as its name.
async fn spawn_agents(community: &'static str, octets: &[u8]) -> u16 {
    let mut port = 0;
    for octet in octets {
        let ip = Ipv4Addr::new(127, 0, 0, *octet);
        let socket = UdpSocket::bind((ip, port)).await.unwrap();
        port = socket.local_addr().unwrap().port();
        tokio::spawn(serve(socket, community, format!("lo-{octet}")));
    }
    port
}

async fn serve(socket: UdpSocket, community: &'static str, name: String) {
    let mut buf = vec![0u8; 2048];
    let mut reply = pdu::Buf::default();
    while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
        let request = &buf[..len];
        let Ok(request_id) = SnmpPdu::from_bytes(request).map(|msg| msg.req_id) else {
            continue;
        };
        // Only a sysName.0 GetRequest carrying our community gets an answer.
        if request != create_get_request(community.as_bytes(), request_id, SYS_NAME).as_slice() {
            continue;
        }
        pdu::build_response(
            community.as_bytes(),
            request_id,
            &[(SYS_NAME, Value::OctetString(name.as_bytes()))],
            &mut reply,
        );
        let _ = socket.send_to(&reply, peer).await;
    }
}

fn write_config(port: u16, ranges: &[&str]) -> tempfile::NamedTempFile {
    let ranges: Vec<String> = ranges.iter().map(|r| format!("\"{r}\"")).collect();
    let json = format!(
        r#"{{
            "zabbix_url": "http://monitor.local/api_jsonrpc.php",
            "zabbix_group_id": "22",
            "zabbix_proxy_id": "10501",
            "snmp_community": "public",
            "snmp_port": {port},
            "snmp_timeout": 1,
            "workers": 3,
            "ranges": [{}]
        }}"#,
        ranges.join(", ")
    );
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

/// This test drives the whole pipeline: a configuration file on disk, the real
/// SNMP client talking to a local agent, and a registrar that records its calls.
#[tokio::test]
async fn discovery_registers_loopback_agent() {
    let port = spawn_agents("public", &[1]).await;
    let file = write_config(port, &["127.0.0.1"]);
    let cfg = Arc::new(DiscoveryConfig::load(file.path()).unwrap());

    let registrar = Arc::new(RecordingRegistrar::default());
    let service = DiscoveryService::new(
        cfg.clone(),
        Arc::new(LoopbackProber),
        Arc::new(SnmpIdentityClient::from_config(&cfg)),
        registrar.clone(),
    );

    service.run().await;

    let hosts = registrar.hosts.lock().unwrap().clone();
    assert_eq!(
        hosts,
        vec![(
            HostRecord::new("lo-1", Ipv4Addr::new(127, 0, 0, 1)),
            "22".to_string(),
            "10501".to_string()
        )]
    );
}

#[tokio::test]
#[cfg(target_os = "linux")]
async fn discovery_range_loopback() {
    let port = spawn_agents("public", &[1, 2, 4]).await;
    let file = write_config(port, &["10.255.255.0/33", "127.0.0.1-4", "192.0.2.1"]);
    let cfg = Arc::new(DiscoveryConfig::load(file.path()).unwrap());

    let registrar = Arc::new(RecordingRegistrar::default());
    let service = DiscoveryService::new(
        cfg.clone(),
        Arc::new(LoopbackProber),
        Arc::new(SnmpIdentityClient::from_config(&cfg)),
        registrar.clone(),
    );

    service.run().await;

    let mut names: Vec<String> = registrar
        .hosts
        .lock()
        .unwrap()
        .iter()
        .map(|(record, _, _)| record.name.clone())
        .collect();
    names.sort();

    // 127.0.0.3 never answers SNMP, 192.0.2.1 never answers the ping.
    assert_eq!(names, vec!["lo-1", "lo-2", "lo-4"]);
}

#[tokio::test]
async fn wrong_community_registers_nothing() {
    let port = spawn_agents("private", &[1]).await;
    let file = write_config(port, &["127.0.0.1"]);
    let cfg = Arc::new(DiscoveryConfig::load(file.path()).unwrap());

    let registrar = Arc::new(RecordingRegistrar::default());
    let service = DiscoveryService::new(
        cfg.clone(),
        Arc::new(LoopbackProber),
        Arc::new(SnmpIdentityClient::from_config(&cfg)),
        registrar.clone(),
    );

    service.run().await;

    assert!(registrar.hosts.lock().unwrap().is_empty());
}

/// Uses the system `ping` and the stub registrar; needs a host that allows ICMP.
#[tokio::test]
#[ignore]
async fn production_wiring_runs_against_localhost() {
    let port = spawn_agents("public", &[1]).await;
    let file = write_config(port, &["127.0.0.1-2"]);
    let cfg = Arc::new(DiscoveryConfig::load(file.path()).unwrap());

    // Two probes and at most two SNMP attempts of one second each.
    let service = DiscoveryService::from_config(cfg);
    let run = service.run();
    let finished = tokio::time::timeout(Duration::from_secs(10), run).await;

    assert!(finished.is_ok(), "discovery did not finish within 10s");
}
