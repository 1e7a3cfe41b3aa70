use anyhow::bail;
use snmp::{SnmpMessageType, SnmpPdu, Value, pdu};

/// `SNMPv2-MIB::sysName.0`
pub const SYS_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

/// The parts of a GetResponse-PDU the identity query looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponse {
    pub request_id: i32,
    pub error_status: u32,
    pub error_index: u32,
    /// First OCTET STRING among the varbinds, if any.
    pub text: Option<Vec<u8>>,
}

/// Builds a v2c GetRequest for a single `oid`.
pub fn create_get_request(community: &[u8], request_id: i32, oid: &[u32]) -> Vec<u8> {
    let mut buf = pdu::Buf::default();
    pdu::build_get(community, request_id, oid, &mut buf);
    buf.to_vec()
}

pub fn parse_response(payload: &[u8]) -> anyhow::Result<GetResponse> {
    let response = match SnmpPdu::from_bytes(payload) {
        Ok(response) => response,
        Err(e) => bail!("Failed to parse SNMP message: {e:?}"),
    };
    if !matches!(response.message_type, SnmpMessageType::Response) {
        bail!("Not a GetResponse-PDU");
    }

    let mut varbinds = response.varbinds;
    let text = varbinds.find_map(|(_oid, value)| match value {
        Value::OctetString(bytes) => Some(bytes.to_vec()),
        _ => None,
    });

    Ok(GetResponse {
        request_id: response.req_id,
        error_status: response.error_status,
        error_index: response.error_index,
        text,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
