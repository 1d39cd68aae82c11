//! The `BitTorrent` peer wire protocol, reduced to metadata retrieval.
//!
//! After the fixed-size [`handshake`], every message on the wire is a frame:
//! a 4-byte big-endian length prefix followed by `length` payload bytes. The
//! helpers here read and write whole frames; a frame read loops until the
//! declared length has been consumed, it never trusts a single `read()` call
//! to return a full frame.
pub mod client;
pub mod extension;
pub mod handshake;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::core::error::Error;

/// Upper bound for one frame. Metadata pieces are at most 16 KiB plus a small
/// bencoded header; anything larger than this is a peer misbehaving.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Reads one length-prefixed frame. Zero-length keep-alive frames are
/// swallowed and the next real frame is returned.
///
/// # Errors
///
/// Will return a `Network` error when the stream ends early and a `Protocol`
/// error when the declared length exceeds [`MAX_FRAME_SIZE`].
pub async fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, Error> {
    loop {
        let mut length_prefix = [0u8; 4];
        stream.read_exact(&mut length_prefix).await?;

        let length = u32::from_be_bytes(length_prefix) as usize;
        if length == 0 {
            // keep-alive
            continue;
        }
        if length > MAX_FRAME_SIZE {
            return Err(Error::Protocol(format!("peer declared an oversized frame of {length} bytes")));
        }

        let mut payload = vec![0u8; length];
        stream.read_exact(&mut payload).await?;

        return Ok(payload);
    }
}

/// Writes one length-prefixed frame.
///
/// # Errors
///
/// Will return a `Network` error when the stream rejects the write.
pub async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> Result<(), Error> {
    let length = u32::try_from(payload.len()).map_err(|_| Error::Protocol("frame payload too large".to_string()))?;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(payload).await?;

    Ok(())
}
