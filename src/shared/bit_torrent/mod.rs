//! `BitTorrent` protocol plumbing.
//!
//! The crawler speaks two wire protocols:
//!
//! - [`dht`]: KRPC (BEP 5) over UDP, used to walk the Mainline DHT and to
//! sample infohashes (BEP 51).
//! - [`peer_wire`]: the `BitTorrent` peer protocol over TCP, used only far
//! enough to pull info dictionaries through the extension protocol (BEP 10)
//! and `ut_metadata` (BEP 9).
pub mod dht;
pub mod peer_wire;
