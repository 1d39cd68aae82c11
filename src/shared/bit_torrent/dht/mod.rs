//! KRPC: the bencoded UDP query/response protocol spoken by DHT nodes (BEP 5).
//!
//! The crawler is an impolite DHT citizen: it issues one-shot queries and
//! never answers any. There is no receive loop and no routing table; every
//! query opens a fresh socket, sends one datagram, reads one datagram and
//! closes. Failures bubble up to the scheduler, which tracks node health.
pub mod client;
pub mod messages;

/// Receive buffer for one KRPC datagram.
pub const MAX_PACKET_SIZE: usize = 65536;

/// Size of one compact node record: 20-byte node id, IPv4 and port (BEP 5).
pub const COMPACT_NODE_LEN: usize = 26;

/// Size of one compact peer record: IPv4 and port.
pub const COMPACT_PEER_LEN: usize = 6;
