//! Modules with generic logic used by several modules.
//!
//! - [`bit_torrent`]: `BitTorrent` protocols: KRPC over UDP and the peer wire
//! protocol over TCP.
pub mod bit_torrent;
