//! The fixed 68-byte `BitTorrent` handshake (BEP 3), with the extension
//! protocol bit of BEP 10.
use magnetite_primitives::info_hash::InfoHash;

use crate::core::error::Error;

/// The protocol identifier sent in every handshake.
pub const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";

/// Total size of a handshake on the wire.
pub const HANDSHAKE_LEN: usize = 68;

/// Bit in `reserved[5]` advertising extension protocol support (BEP 10).
pub const EXTENSION_PROTOCOL_BIT: u8 = 0x10;

/// Peer id presented by the crawler. Arbitrary, but stable so operators can
/// recognize it in peer lists.
pub const PEER_ID: &[u8; 20] = b"-MG0100-000000000000";

/// Builds the handshake for one torrent.
#[must_use]
pub fn encode_handshake(info_hash: &InfoHash, peer_id: &[u8; 20]) -> [u8; HANDSHAKE_LEN] {
    let mut handshake = [0u8; HANDSHAKE_LEN];

    handshake[0] = 19;
    handshake[1..20].copy_from_slice(PROTOCOL);
    handshake[25] |= EXTENSION_PROTOCOL_BIT;
    handshake[28..48].copy_from_slice(&info_hash.bytes());
    handshake[48..68].copy_from_slice(peer_id);

    handshake
}

/// Checks the handshake a peer sent back.
///
/// The only hard requirement is the extension protocol bit: without it the
/// peer cannot speak `ut_metadata` and the session is pointless.
///
/// # Errors
///
/// Will return a `NotSupported` error when the peer does not advertise the
/// extension protocol.
pub fn validate_handshake(handshake: &[u8; HANDSHAKE_LEN]) -> Result<(), Error> {
    if handshake[25] & EXTENSION_PROTOCOL_BIT == 0 {
        return Err(Error::NotSupported);
    }

    Ok(())
}

#[cfg(test)]
mod tests {

    mod the_handshake {
        use magnetite_primitives::info_hash::InfoHash;

        use crate::core::error::Error;
        use crate::shared::bit_torrent::peer_wire::handshake::{encode_handshake, validate_handshake, PEER_ID};

        fn sample_info_hash() -> InfoHash {
            InfoHash::from([0xabu8; 20])
        }

        #[test]
        fn it_should_be_68_bytes_with_the_protocol_string_up_front() {
            let handshake = encode_handshake(&sample_info_hash(), PEER_ID);

            assert_eq!(handshake[0], 19);
            assert_eq!(&handshake[1..20], b"BitTorrent protocol");
            assert_eq!(&handshake[28..48], &[0xabu8; 20]);
            assert_eq!(&handshake[48..68], PEER_ID);
        }

        #[test]
        fn it_should_advertise_the_extension_protocol() {
            let handshake = encode_handshake(&sample_info_hash(), PEER_ID);

            assert_eq!(handshake[25] & 0x10, 0x10);
        }

        #[test]
        fn it_should_accept_a_remote_handshake_with_the_extension_bit() {
            let handshake = encode_handshake(&sample_info_hash(), PEER_ID);

            assert!(validate_handshake(&handshake).is_ok());
        }

        #[test]
        fn it_should_reject_a_remote_handshake_without_the_extension_bit() {
            let mut handshake = encode_handshake(&sample_info_hash(), PEER_ID);
            handshake[25] = 0;

            assert!(matches!(validate_handshake(&handshake).unwrap_err(), Error::NotSupported));
        }
    }
}
