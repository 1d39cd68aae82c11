//! The peer metadata session.
//!
//! One session pulls a whole info dictionary from one peer:
//!
//! ```text
//! Init -> BtHandshakeSent -> BtHandshakeVerified -> ExtHandshakeSent
//!      -> ExtHandshakeVerified -> PieceLoop(i) -> Complete
//! ```
//!
//! Every read or parse failure in any state is terminal for the session; the
//! state machine never moves backwards. Peers are plentiful, so the caller
//! simply tries the next one.
use std::time::Duration;

use magnetite_primitives::info_hash::InfoHash;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use super::extension::{
    extension_handshake_payload, metadata_request_payload, parse_extension_handshake, parse_metadata_piece,
    EXTENSION_HANDSHAKE_ID, EXTENSION_MESSAGE_ID, LOCAL_UT_METADATA_ID, METADATA_PIECE_SIZE,
};
use super::handshake::{encode_handshake, validate_handshake, HANDSHAKE_LEN, PEER_ID};
use super::{read_frame, write_frame};
use crate::core::error::Error;

/// Peers may send unrelated chatter (bitfield, have, pex) between the frames
/// the session cares about; at most this many frames are skipped per step.
const MAX_SKIPPED_FRAMES: usize = 32;

/// Upper bound for a plausible info dictionary.
const MAX_METADATA_SIZE: usize = 8 * 1024 * 1024;

/// A client that runs metadata sessions against peers.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    connect_timeout: Duration,
    read_timeout: Duration,
    strict: bool,
}

impl MetadataClient {
    #[must_use]
    pub fn new(connect_timeout: Duration, read_timeout: Duration, strict: bool) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            strict,
        }
    }

    /// Pulls the raw info dictionary for `info_hash` from one peer.
    ///
    /// # Errors
    ///
    /// Will return a `Network` error on dial/read failures or timeouts, a
    /// `NotSupported` error when the peer cannot exchange metadata, and a
    /// `Protocol` error for anything malformed, including (in strict mode) a
    /// dictionary that does not hash to the requested infohash.
    pub async fn fetch_metadata(&self, address: &str, info_hash: &InfoHash) -> Result<Vec<u8>, Error> {
        let mut stream = time::timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| Error::timed_out("tcp connect"))??;

        // BtHandshakeSent
        stream.write_all(&encode_handshake(info_hash, PEER_ID)).await?;

        // BtHandshakeVerified
        let mut remote_handshake = [0u8; HANDSHAKE_LEN];
        time::timeout(self.read_timeout, stream.read_exact(&mut remote_handshake))
            .await
            .map_err(|_| Error::timed_out("handshake read"))??;
        validate_handshake(&remote_handshake)?;

        // ExtHandshakeSent
        write_frame(&mut stream, &extension_handshake_payload()).await?;

        // ExtHandshakeVerified
        let body = self.await_extension_frame(&mut stream, EXTENSION_HANDSHAKE_ID).await?;
        let handshake = parse_extension_handshake(&body)?;
        if handshake.metadata_size > MAX_METADATA_SIZE {
            return Err(Error::Protocol(format!(
                "peer declared an implausible metadata_size of {} bytes",
                handshake.metadata_size
            )));
        }

        debug!(
            target: "PEER WIRE",
            "{address} serves {} bytes of metadata under extension id {}",
            handshake.metadata_size, handshake.ut_metadata_id
        );

        // PieceLoop(i)
        let total_pieces = handshake.metadata_size.div_ceil(METADATA_PIECE_SIZE);
        let mut metadata = Vec::with_capacity(handshake.metadata_size);

        for piece in 0..total_pieces {
            let piece = u32::try_from(piece).expect("piece count is bounded by MAX_METADATA_SIZE");

            write_frame(&mut stream, &metadata_request_payload(handshake.ut_metadata_id, piece)).await?;

            let body = self.await_extension_frame(&mut stream, LOCAL_UT_METADATA_ID).await?;
            let data = parse_metadata_piece(&body)?;
            if data.piece != piece {
                return Err(Error::Protocol(format!("peer answered piece {} to a request for piece {piece}", data.piece)));
            }

            metadata.extend_from_slice(&data.data);
        }

        // Complete
        self.validate_metadata(info_hash, handshake.metadata_size, metadata)
    }

    fn validate_metadata(&self, info_hash: &InfoHash, expected_size: usize, metadata: Vec<u8>) -> Result<Vec<u8>, Error> {
        if metadata.len() != expected_size {
            return Err(Error::Protocol(format!(
                "assembled metadata is {} bytes, peer declared {expected_size}",
                metadata.len()
            )));
        }

        if metadata.first() != Some(&b'd') {
            return Err(Error::Protocol("assembled metadata is not a bencoded dictionary".to_string()));
        }

        if self.strict {
            let digest: [u8; 20] = Sha1::digest(&metadata).into();
            if digest != info_hash.bytes() {
                return Err(Error::Protocol("assembled metadata does not hash to the infohash".to_string()));
            }
        }

        Ok(metadata)
    }

    /// Reads frames until one carries the wanted extension id, skipping the
    /// regular peer-protocol chatter in between.
    async fn await_extension_frame(&self, stream: &mut TcpStream, extension_id: u8) -> Result<Vec<u8>, Error> {
        for _ in 0..MAX_SKIPPED_FRAMES {
            let frame = time::timeout(self.read_timeout, read_frame(stream))
                .await
                .map_err(|_| Error::timed_out("frame read"))??;

            if frame[0] == EXTENSION_MESSAGE_ID && frame.get(1) == Some(&extension_id) {
                return Ok(frame[2..].to_vec());
            }

            debug!(target: "PEER WIRE", "skipping message id {} while waiting for extension id {extension_id}", frame[0]);
        }

        Err(Error::Protocol("peer flooded the session with unrelated messages".to_string()))
    }
}

#[cfg(test)]
mod tests {

    mod a_metadata_session {
        use std::time::Duration;

        use magnetite_primitives::info_hash::InfoHash;
        use sha1::{Digest, Sha1};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        use crate::core::error::Error;
        use crate::shared::bit_torrent::peer_wire::client::MetadataClient;
        use crate::shared::bit_torrent::peer_wire::extension::METADATA_PIECE_SIZE;
        use crate::shared::bit_torrent::peer_wire::handshake::{encode_handshake, HANDSHAKE_LEN, PEER_ID};
        use crate::shared::bit_torrent::peer_wire::{read_frame, write_frame};

        fn client(strict: bool) -> MetadataClient {
            MetadataClient::new(Duration::from_secs(5), Duration::from_secs(5), strict)
        }

        /// An info dictionary large enough to need two pieces.
        fn sample_metadata() -> Vec<u8> {
            let name = "a".repeat(20_000);
            format!("d4:name{}:{name}e", name.len()).into_bytes()
        }

        fn sample_info_hash(metadata: &[u8]) -> InfoHash {
            InfoHash::from(<[u8; 20]>::from(Sha1::digest(metadata)))
        }

        /// A minimal peer: answers the handshakes and serves `metadata` piece
        /// by piece, preceded by some unrelated chatter.
        async fn serve_one_session(listener: TcpListener, metadata: Vec<u8>, info_hash: InfoHash) {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut handshake = [0u8; HANDSHAKE_LEN];
            stream.read_exact(&mut handshake).await.unwrap();
            stream.write_all(&encode_handshake(&info_hash, PEER_ID)).await.unwrap();

            // the crawler's extension handshake
            let _ = read_frame(&mut stream).await.unwrap();

            // keep-alive plus a bitfield, which the session must skip
            stream.write_all(&0u32.to_be_bytes()).await.unwrap();
            write_frame(&mut stream, &[5, 0xff]).await.unwrap();

            let handshake_body = format!("d1:md11:ut_metadatai3ee13:metadata_sizei{}ee", metadata.len());
            let mut frame = vec![20u8, 0u8];
            frame.extend_from_slice(handshake_body.as_bytes());
            write_frame(&mut stream, &frame).await.unwrap();

            loop {
                let Ok(request) = read_frame(&mut stream).await else {
                    break;
                };
                assert_eq!(request[0], 20);
                assert_eq!(request[1], 3, "requests must use the id the peer published");

                let header = magnetite_bencode::decode(&request[2..]).unwrap();
                let piece = usize::try_from(header.get(b"piece").unwrap().as_int().unwrap()).unwrap();

                let start = piece * METADATA_PIECE_SIZE;
                let end = (start + METADATA_PIECE_SIZE).min(metadata.len());

                let mut response = vec![20u8, 1u8];
                response.extend_from_slice(
                    format!("d8:msg_typei1e5:piecei{piece}e10:total_sizei{}ee", metadata.len()).as_bytes(),
                );
                response.extend_from_slice(&metadata[start..end]);
                write_frame(&mut stream, &response).await.unwrap();
            }
        }

        #[tokio::test]
        async fn it_should_assemble_a_multi_piece_info_dictionary() {
            let metadata = sample_metadata();
            let info_hash = sample_info_hash(&metadata);

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap().to_string();
            let peer = tokio::spawn(serve_one_session(listener, metadata.clone(), info_hash));

            let fetched = client(true).fetch_metadata(&address, &info_hash).await.unwrap();

            assert_eq!(fetched, metadata);
            peer.abort();
        }

        #[tokio::test]
        async fn it_should_reject_metadata_that_does_not_hash_to_the_infohash_in_strict_mode() {
            let metadata = sample_metadata();
            let wrong_info_hash = InfoHash::from([0x99u8; 20]);

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap().to_string();
            let peer = tokio::spawn(serve_one_session(listener, metadata.clone(), wrong_info_hash));

            let err = client(true).fetch_metadata(&address, &wrong_info_hash).await.unwrap_err();

            assert!(matches!(err, Error::Protocol(_)));
            peer.abort();
        }

        #[tokio::test]
        async fn it_should_accept_unverifiable_metadata_when_strict_mode_is_off() {
            let metadata = sample_metadata();
            let wrong_info_hash = InfoHash::from([0x99u8; 20]);

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap().to_string();
            let peer = tokio::spawn(serve_one_session(listener, metadata.clone(), wrong_info_hash));

            let fetched = client(false).fetch_metadata(&address, &wrong_info_hash).await.unwrap();

            assert_eq!(fetched, metadata);
            peer.abort();
        }

        #[tokio::test]
        async fn it_should_reject_a_peer_without_the_extension_bit() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap().to_string();

            let peer = tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut handshake = [0u8; HANDSHAKE_LEN];
                stream.read_exact(&mut handshake).await.unwrap();

                let mut reply = encode_handshake(&InfoHash::from([0u8; 20]), PEER_ID);
                reply[25] = 0;
                stream.write_all(&reply).await.unwrap();
            });

            let err = client(true)
                .fetch_metadata(&address, &InfoHash::from([0u8; 20]))
                .await
                .unwrap_err();

            assert!(matches!(err, Error::NotSupported));
            peer.abort();
        }
    }
}
