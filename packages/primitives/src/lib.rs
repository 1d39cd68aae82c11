//! Primitive types shared by the magnetite packages.
//!
//! The central type is the [`InfoHash`](info_hash::InfoHash): the SHA-1 of a
//! torrent's info dictionary, which identifies a torrent on the DHT and keys
//! everything the crawler persists.
pub mod info_hash;

/// The id of a DHT node: 20 arbitrary bytes in the same space as infohashes.
pub type NodeId = [u8; 20];
