//! KRPC message construction and parsing.
//!
//! A KRPC message is a bencoded dictionary with a transaction id `t`, a
//! message type `y` (`q` query, `r` response, `e` error) and either the query
//! name `q` plus arguments `a`, or the response values `r`. The compact
//! binary fields inside responses (`nodes`, `values`, `samples`) are parsed
//! here too.
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use magnetite_bencode::{decode, encode, Value};
use magnetite_primitives::info_hash::InfoHash;
use magnetite_primitives::NodeId;
use tracing::warn;

use super::{COMPACT_NODE_LEN, COMPACT_PEER_LEN};
use crate::core::error::Error;

/// Transaction id attached to every outgoing query. The client never has two
/// queries in flight on one socket, so a constant is enough.
pub const TRANSACTION_ID: &[u8] = b"aa";

/// A `get_peers` response carries either peers for the infohash or the
/// closest nodes the queried node knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetPeersResponse {
    Peers(Vec<String>),
    Nodes(Vec<String>),
}

/// A `sample_infohashes` response (BEP 51). Besides the samples it usually
/// carries closest nodes, which are worth crawling too.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleInfohashesResponse {
    pub samples: Vec<InfoHash>,
    pub nodes: Vec<String>,
}

/// Builds a `find_node` query datagram.
#[must_use]
pub fn find_node_request(node_id: &NodeId, target: &NodeId) -> Vec<u8> {
    let mut arguments = BTreeMap::new();
    arguments.insert(b"id".to_vec(), Value::from(&node_id[..]));
    arguments.insert(b"target".to_vec(), Value::from(&target[..]));

    encode(&query("find_node", arguments))
}

/// Builds a `get_peers` query datagram.
#[must_use]
pub fn get_peers_request(node_id: &NodeId, info_hash: &InfoHash) -> Vec<u8> {
    let mut arguments = BTreeMap::new();
    arguments.insert(b"id".to_vec(), Value::from(&node_id[..]));
    arguments.insert(b"info_hash".to_vec(), Value::from(&info_hash.bytes()[..]));

    encode(&query("get_peers", arguments))
}

/// Builds a `sample_infohashes` query datagram (BEP 51).
#[must_use]
pub fn sample_infohashes_request(node_id: &NodeId, target: &NodeId) -> Vec<u8> {
    let mut arguments = BTreeMap::new();
    arguments.insert(b"id".to_vec(), Value::from(&node_id[..]));
    arguments.insert(b"target".to_vec(), Value::from(&target[..]));

    encode(&query("sample_infohashes", arguments))
}

fn query(name: &str, arguments: BTreeMap<Vec<u8>, Value>) -> Value {
    let mut message = BTreeMap::new();
    message.insert(b"t".to_vec(), Value::from(TRANSACTION_ID));
    message.insert(b"y".to_vec(), Value::from("q"));
    message.insert(b"q".to_vec(), Value::from(name));
    message.insert(b"a".to_vec(), Value::from(arguments));

    Value::from(message)
}

/// Parses a `find_node` response into the node addresses it carries.
///
/// # Errors
///
/// Will return a `Protocol` error if the datagram is not a KRPC response or
/// carries no `nodes` field.
pub fn parse_find_node_response(datagram: &[u8]) -> Result<Vec<String>, Error> {
    let values = response_values(datagram)?;

    let nodes = values
        .get(b"nodes")
        .ok_or_else(|| Error::Protocol("find_node response carries no nodes".to_string()))?
        .as_bytes()?;

    Ok(parse_compact_nodes(nodes))
}

/// Parses a `get_peers` response into peers or closest nodes.
///
/// # Errors
///
/// Will return a `Protocol` error if the datagram is not a KRPC response or
/// carries neither `values` nor `nodes`.
pub fn parse_get_peers_response(datagram: &[u8]) -> Result<GetPeersResponse, Error> {
    let values = response_values(datagram)?;

    if let Some(peers) = values.get(b"values") {
        return Ok(GetPeersResponse::Peers(parse_compact_peers(peers.as_list()?)));
    }

    if let Some(nodes) = values.get(b"nodes") {
        return Ok(GetPeersResponse::Nodes(parse_compact_nodes(nodes.as_bytes()?)));
    }

    Err(Error::Protocol(
        "get_peers response carries neither values nor nodes".to_string(),
    ))
}

/// Parses a `sample_infohashes` response.
///
/// Both fields are optional on the wire; a node that has nothing to sample
/// still responds.
///
/// # Errors
///
/// Will return a `Protocol` error if the datagram is not a KRPC response.
pub fn parse_sample_infohashes_response(datagram: &[u8]) -> Result<SampleInfohashesResponse, Error> {
    let values = response_values(datagram)?;

    let samples = match values.get(b"samples") {
        Some(samples) => parse_samples(samples.as_bytes()?),
        None => Vec::new(),
    };

    let nodes = match values.get(b"nodes") {
        Some(nodes) => parse_compact_nodes(nodes.as_bytes()?),
        None => Vec::new(),
    };

    Ok(SampleInfohashesResponse { samples, nodes })
}

/// Decodes a datagram and extracts the `r` dictionary of a response.
///
/// KRPC errors (`y` = `e`) surface as `Protocol` errors with the remote code
/// and message.
fn response_values(datagram: &[u8]) -> Result<Value, Error> {
    let message = decode(datagram)?;

    match message.get(b"y").map(Value::as_bytes).transpose()? {
        Some(b"r") => {}
        Some(b"e") => {
            let detail = message.get(b"e").map_or_else(String::new, describe_krpc_error);
            return Err(Error::Protocol(format!("krpc error response{detail}")));
        }
        _ => return Err(Error::Protocol("datagram is not a krpc response".to_string())),
    }

    message
        .get(b"r")
        .cloned()
        .ok_or_else(|| Error::Protocol("krpc response carries no return values".to_string()))
}

fn describe_krpc_error(error: &Value) -> String {
    let Ok(items) = error.as_list() else {
        return String::new();
    };

    let code = items.first().and_then(|code| code.as_int().ok());
    let message = items.get(1).and_then(|message| message.as_str().ok());

    match (code, message) {
        (Some(code), Some(message)) => format!(": {code} {message}"),
        (Some(code), None) => format!(": {code}"),
        _ => String::new(),
    }
}

/// Parses packed 26-byte compact node records into `host:port` addresses.
///
/// A trailing partial record is dropped with a warning.
#[must_use]
pub fn parse_compact_nodes(compact: &[u8]) -> Vec<String> {
    if compact.len() % COMPACT_NODE_LEN != 0 {
        warn!(
            "compact node info length {} is not a multiple of {COMPACT_NODE_LEN}; truncating",
            compact.len()
        );
    }

    compact
        .chunks_exact(COMPACT_NODE_LEN)
        .map(|record| {
            let ip = Ipv4Addr::new(record[20], record[21], record[22], record[23]);
            let port = u16::from_be_bytes([record[24], record[25]]);
            format!("{ip}:{port}")
        })
        .collect()
}

/// Parses the `values` list of a `get_peers` response: each element is one
/// 6-byte compact peer record. Records of the wrong size are dropped with a
/// warning.
#[must_use]
pub fn parse_compact_peers(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|peer| {
            let record = peer.as_bytes().ok()?;
            if record.len() != COMPACT_PEER_LEN {
                warn!("compact peer record has length {}, expected {COMPACT_PEER_LEN}", record.len());
                return None;
            }
            let ip = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
            let port = u16::from_be_bytes([record[4], record[5]]);
            Some(format!("{ip}:{port}"))
        })
        .collect()
}

/// Parses packed 20-byte infohash samples (BEP 51).
///
/// A trailing partial record is dropped with a warning.
#[must_use]
pub fn parse_samples(samples: &[u8]) -> Vec<InfoHash> {
    if samples.len() % 20 != 0 {
        warn!("samples length {} is not a multiple of 20 bytes; truncating", samples.len());
    }

    samples
        .chunks_exact(20)
        .map(|record| {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(record);
            InfoHash::from(bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {

    mod query_construction {
        use crate::shared::bit_torrent::dht::messages::find_node_request;

        #[test]
        fn it_should_encode_a_find_node_query_canonically() {
            let datagram = find_node_request(b"abcdefghij0123456789", b"mnopqrstuvwxyz123456");

            assert_eq!(
                datagram,
                &b"d1:ad2:id20:abcdefghij01234567896:target20:mnopqrstuvwxyz123456e1:q9:find_node1:t2:aa1:y1:qe"[..]
            );
        }
    }

    mod compact_node_parsing {
        use crate::shared::bit_torrent::dht::messages::parse_compact_nodes;

        #[test]
        fn it_should_parse_one_record_into_host_and_port() {
            let mut compact = vec![0xaau8; 20];
            compact.extend_from_slice(&[127, 0, 0, 1]);
            compact.extend_from_slice(&0x1ae1u16.to_be_bytes());

            assert_eq!(parse_compact_nodes(&compact), vec!["127.0.0.1:6881".to_string()]);
        }

        #[test]
        fn it_should_return_k_records_for_an_input_of_26_k_bytes() {
            let compact = vec![0u8; 26 * 3];

            assert_eq!(parse_compact_nodes(&compact).len(), 3);
        }

        #[test]
        fn it_should_truncate_a_trailing_partial_record() {
            let compact = vec![0u8; 26 * 2 + 7];

            assert_eq!(parse_compact_nodes(&compact).len(), 2);
        }
    }

    mod sample_parsing {
        use crate::shared::bit_torrent::dht::messages::parse_samples;

        #[test]
        fn it_should_split_the_packed_field_into_20_byte_infohashes() {
            let mut samples = vec![0x11u8; 20];
            samples.extend_from_slice(&[0x22u8; 20]);

            let parsed = parse_samples(&samples);

            assert_eq!(parsed.len(), 2);
            assert_eq!(parsed[0].to_hex_string(), "11".repeat(20));
        }

        #[test]
        fn it_should_truncate_to_the_largest_multiple_of_20() {
            let samples = vec![0u8; 47];

            assert_eq!(parse_samples(&samples).len(), 2);
        }
    }

    mod response_parsing {
        use crate::core::error::Error;
        use crate::shared::bit_torrent::dht::messages::{
            parse_find_node_response, parse_get_peers_response, parse_sample_infohashes_response, GetPeersResponse,
        };

        #[test]
        fn it_should_extract_nodes_from_a_find_node_response() {
            let mut datagram = b"d1:rd2:id20:abcdefghij01234567895:nodes26:".to_vec();
            datagram.extend_from_slice(&[0xaa; 20]);
            datagram.extend_from_slice(&[127, 0, 0, 1, 0x1a, 0xe1]);
            datagram.extend_from_slice(b"e1:t2:aa1:y1:re");

            let nodes = parse_find_node_response(&datagram).unwrap();

            assert_eq!(nodes, vec!["127.0.0.1:6881".to_string()]);
        }

        #[test]
        fn it_should_prefer_peer_values_over_nodes_in_a_get_peers_response() {
            let mut datagram = b"d1:rd2:id20:abcdefghij01234567895:nodes0:6:valuesl6:".to_vec();
            datagram.extend_from_slice(&[10, 0, 0, 7, 0x00, 0x50]);
            datagram.extend_from_slice(b"ee1:t2:aa1:y1:re");

            let response = parse_get_peers_response(&datagram).unwrap();

            assert_eq!(response, GetPeersResponse::Peers(vec!["10.0.0.7:80".to_string()]));
        }

        #[test]
        fn it_should_fall_back_to_nodes_when_a_get_peers_response_has_no_values() {
            let mut datagram = b"d1:rd2:id20:abcdefghij01234567895:nodes26:".to_vec();
            datagram.extend_from_slice(&[0xbb; 20]);
            datagram.extend_from_slice(&[192, 0, 2, 1, 0x1a, 0xe1]);
            datagram.extend_from_slice(b"e1:t2:aa1:y1:re");

            let response = parse_get_peers_response(&datagram).unwrap();

            assert_eq!(response, GetPeersResponse::Nodes(vec!["192.0.2.1:6881".to_string()]));
        }

        #[test]
        fn it_should_collect_samples_and_nodes_from_a_sample_infohashes_response() {
            let mut datagram = b"d1:rd2:id20:abcdefghij01234567895:nodes26:".to_vec();
            datagram.extend_from_slice(&[0xcc; 20]);
            datagram.extend_from_slice(&[127, 0, 0, 1, 0x1a, 0xe1]);
            datagram.extend_from_slice(b"7:samples20:");
            datagram.extend_from_slice(&[0x42; 20]);
            datagram.extend_from_slice(b"e1:t2:aa1:y1:re");

            let response = parse_sample_infohashes_response(&datagram).unwrap();

            assert_eq!(response.samples.len(), 1);
            assert_eq!(response.samples[0].to_hex_string(), "42".repeat(20));
            assert_eq!(response.nodes, vec!["127.0.0.1:6881".to_string()]);
        }

        #[test]
        fn it_should_surface_a_krpc_error_response_as_a_protocol_error() {
            let datagram = b"d1:eli201e23:A Generic Error Ocurrede1:t2:aa1:y1:ee";

            let err = parse_find_node_response(datagram).unwrap_err();

            assert!(matches!(err, Error::Protocol(_)));
        }
    }
}
