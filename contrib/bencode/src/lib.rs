//! Bencode encoding and decoding.
//!
//! Bencode is the serialization format used everywhere in the `BitTorrent`
//! protocol family: KRPC datagrams (BEP 5), extension handshakes (BEP 10),
//! `ut_metadata` messages (BEP 9) and the info dictionary itself.
//!
//! Values are modeled as a tagged union, [`Value`], instead of a map of
//! strings to "anything": byte strings stay raw bytes end to end, which
//! matters because fields like `nodes`, `samples`, `values` and `pieces`
//! carry arbitrary binary data that is not valid UTF-8.
//!
//! The encoder always emits dictionary keys in lexicographic order (the only
//! canonical form). The decoder is lenient about key order by default and can
//! be switched to strict checking via [`DecodeOpt`].
//!
//! ```rust
//! use magnetite_bencode::{decode, encode, Value};
//!
//! let value = Value::from(vec![Value::from(42), Value::from("spam")]);
//! let bytes = encode(&value);
//!
//! assert_eq!(bytes, b"li42e4:spame");
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```
pub mod decode;
pub mod encode;
pub mod error;
pub mod value;

pub use decode::{decode, decode_prefix, decode_with, DecodeOpt};
pub use encode::encode;
pub use error::Error;
pub use value::Value;

/// First byte of a bencoded integer.
pub(crate) const INT_START: u8 = b'i';
/// First byte of a bencoded list.
pub(crate) const LIST_START: u8 = b'l';
/// First byte of a bencoded dictionary.
pub(crate) const DICT_START: u8 = b'd';
/// Terminator for integers, lists and dictionaries.
pub(crate) const BEN_END: u8 = b'e';
/// Separator between a byte string length and its payload.
pub(crate) const BYTE_LEN_END: u8 = b':';
