//! The extension protocol (BEP 10) and the `ut_metadata` messages riding on
//! it (BEP 9).
//!
//! Extension messages share the `BitTorrent` message id 20; the byte after it
//! selects the extension. Id 0 is the extension handshake, in which each side
//! publishes the ids it listens on in the `m` dictionary. The crawler
//! registers `ut_metadata` under [`LOCAL_UT_METADATA_ID`], so data messages
//! arrive tagged with that id, while requests go out tagged with whatever id
//! the peer published.
use std::collections::BTreeMap;

use magnetite_bencode::{decode, decode_prefix, encode, Value};

use crate::core::error::Error;

/// `BitTorrent` message id shared by all extension messages.
pub const EXTENSION_MESSAGE_ID: u8 = 20;

/// Extension id of the extension handshake itself.
pub const EXTENSION_HANDSHAKE_ID: u8 = 0;

/// The id under which the crawler registers `ut_metadata` in its handshake.
pub const LOCAL_UT_METADATA_ID: u8 = 1;

/// Metadata is exchanged in pieces of this many bytes; the last piece may be
/// shorter (BEP 9).
pub const METADATA_PIECE_SIZE: usize = 16384;

/// `ut_metadata` message types.
pub mod msg_type {
    pub const REQUEST: i64 = 0;
    pub const DATA: i64 = 1;
    pub const REJECT: i64 = 2;
}

/// What a peer declared in its extension handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionHandshake {
    /// The peer's id for `ut_metadata` messages.
    pub ut_metadata_id: u8,
    /// Total size of the info dictionary in bytes.
    pub metadata_size: usize,
}

/// One `ut_metadata` data message: the piece number and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPiece {
    pub piece: u32,
    pub data: Vec<u8>,
}

/// Builds the frame payload of the crawler's extension handshake:
/// `{"m": {"ut_metadata": 1}}`.
#[must_use]
pub fn extension_handshake_payload() -> Vec<u8> {
    let mut ids = BTreeMap::new();
    ids.insert(b"ut_metadata".to_vec(), Value::from(i64::from(LOCAL_UT_METADATA_ID)));

    let mut handshake = BTreeMap::new();
    handshake.insert(b"m".to_vec(), Value::from(ids));

    frame_payload(EXTENSION_HANDSHAKE_ID, &encode(&Value::from(handshake)))
}

/// Builds the frame payload requesting one metadata piece from a peer.
#[must_use]
pub fn metadata_request_payload(peer_ut_metadata_id: u8, piece: u32) -> Vec<u8> {
    let mut request = BTreeMap::new();
    request.insert(b"msg_type".to_vec(), Value::from(msg_type::REQUEST));
    request.insert(b"piece".to_vec(), Value::from(i64::from(piece)));

    frame_payload(peer_ut_metadata_id, &encode(&Value::from(request)))
}

fn frame_payload(extension_id: u8, bencoded: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(bencoded.len() + 2);
    payload.push(EXTENSION_MESSAGE_ID);
    payload.push(extension_id);
    payload.extend_from_slice(bencoded);
    payload
}

/// Parses the bencoded body of a peer's extension handshake.
///
/// # Errors
///
/// Will return a `NotSupported` error when the peer does not publish a
/// non-zero `ut_metadata` id and a `Protocol` error when `metadata_size` is
/// missing, zero or implausible.
pub fn parse_extension_handshake(body: &[u8]) -> Result<ExtensionHandshake, Error> {
    let handshake = decode(body)?;

    let ut_metadata_id = handshake
        .get(b"m")
        .and_then(|ids| ids.get(b"ut_metadata"))
        .map(Value::as_int)
        .transpose()?
        .filter(|id| *id != 0)
        .and_then(|id| u8::try_from(id).ok())
        .ok_or(Error::NotSupported)?;

    let metadata_size = handshake
        .get(b"metadata_size")
        .map(Value::as_int)
        .transpose()?
        .filter(|size| *size > 0)
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| Error::Protocol("extension handshake carries no usable metadata_size".to_string()))?;

    Ok(ExtensionHandshake {
        ut_metadata_id,
        metadata_size,
    })
}

/// Parses the body of a `ut_metadata` message: a bencoded header dictionary
/// immediately followed by the raw piece bytes.
///
/// # Errors
///
/// Will return a `Protocol` error when the peer rejects the request
/// (`msg_type` 2), sends an unknown message type, or sends an oversized
/// piece.
pub fn parse_metadata_piece(body: &[u8]) -> Result<MetadataPiece, Error> {
    let (header, piece_offset) = decode_prefix(body)?;

    let message_type = header
        .get(b"msg_type")
        .map(Value::as_int)
        .transpose()?
        .ok_or_else(|| Error::Protocol("ut_metadata message carries no msg_type".to_string()))?;

    match message_type {
        msg_type::DATA => {}
        msg_type::REJECT => return Err(Error::Protocol("peer rejected the metadata request".to_string())),
        other => return Err(Error::Protocol(format!("unexpected ut_metadata msg_type {other}"))),
    }

    let piece = header
        .get(b"piece")
        .map(Value::as_int)
        .transpose()?
        .and_then(|piece| u32::try_from(piece).ok())
        .ok_or_else(|| Error::Protocol("ut_metadata data message carries no piece number".to_string()))?;

    let data = body[piece_offset..].to_vec();
    if data.len() > METADATA_PIECE_SIZE {
        return Err(Error::Protocol(format!("metadata piece of {} bytes exceeds the piece size", data.len())));
    }

    Ok(MetadataPiece { piece, data })
}

#[cfg(test)]
mod tests {

    mod the_extension_handshake {
        use crate::core::error::Error;
        use crate::shared::bit_torrent::peer_wire::extension::{extension_handshake_payload, parse_extension_handshake};

        #[test]
        fn it_should_register_ut_metadata_under_id_1() {
            assert_eq!(extension_handshake_payload(), b"\x14\x00d1:md11:ut_metadatai1eee".to_vec());
        }

        #[test]
        fn it_should_parse_the_peer_id_and_metadata_size() {
            let handshake = parse_extension_handshake(b"d1:md11:ut_metadatai3ee13:metadata_sizei31235ee").unwrap();

            assert_eq!(handshake.ut_metadata_id, 3);
            assert_eq!(handshake.metadata_size, 31235);
        }

        #[test]
        fn it_should_reject_peers_without_ut_metadata() {
            let err = parse_extension_handshake(b"d1:md6:ut_pexi2eee").unwrap_err();

            assert!(matches!(err, Error::NotSupported));
        }

        #[test]
        fn it_should_reject_a_zero_ut_metadata_id() {
            let err = parse_extension_handshake(b"d1:md11:ut_metadatai0eee").unwrap_err();

            assert!(matches!(err, Error::NotSupported));
        }

        #[test]
        fn it_should_reject_a_missing_or_zero_metadata_size() {
            assert!(matches!(
                parse_extension_handshake(b"d1:md11:ut_metadatai3eee").unwrap_err(),
                Error::Protocol(_)
            ));
            assert!(matches!(
                parse_extension_handshake(b"d1:md11:ut_metadatai3ee13:metadata_sizei0ee").unwrap_err(),
                Error::Protocol(_)
            ));
        }
    }

    mod the_metadata_messages {
        use crate::core::error::Error;
        use crate::shared::bit_torrent::peer_wire::extension::{metadata_request_payload, parse_metadata_piece};

        #[test]
        fn it_should_encode_a_piece_request_for_the_peers_id() {
            assert_eq!(metadata_request_payload(3, 0), b"\x14\x03d8:msg_typei0e5:piecei0ee".to_vec());
        }

        #[test]
        fn it_should_split_a_data_message_into_header_and_raw_piece_bytes() {
            let mut body = b"d8:msg_typei1e5:piecei0e10:total_sizei14ee".to_vec();
            body.extend_from_slice(b"raw piece data");

            let piece = parse_metadata_piece(&body).unwrap();

            assert_eq!(piece.piece, 0);
            assert_eq!(piece.data, b"raw piece data");
        }

        #[test]
        fn it_should_treat_a_reject_as_a_hard_failure() {
            let err = parse_metadata_piece(b"d8:msg_typei2e5:piecei0ee").unwrap_err();

            assert!(matches!(err, Error::Protocol(_)));
        }
    }
}
