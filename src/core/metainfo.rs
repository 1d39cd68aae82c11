//! Extraction of `name` and file paths from a raw info dictionary.
//!
//! The blob is not fully decoded up front: the interesting fields sit in
//! front of the binary `pieces` field, so the parser locates them with byte
//! scans and only decodes the slices it needs. The `files` list is decoded
//! with the bencode codec, which keeps byte strings raw and is therefore
//! immune to the binary noise that trips naive text-based parsers. When the
//! scan-based route fails on an oddly shaped dictionary, the parser falls
//! back to a full decode.
use magnetite_bencode::{decode, decode_prefix, Value};

use super::error::Error;

/// Marker of the `files` key in a bencoded info dictionary.
const FILES_KEY: &[u8] = b"5:files";

/// Marker of the `name` key in a bencoded info dictionary.
const NAME_KEY: &[u8] = b"4:name";

/// The two fields of an info dictionary the indexer cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TorrentMetainfo {
    /// The torrent name.
    pub name: String,
    /// Path components of all files, flattened. Empty for single-file
    /// torrents.
    pub files: Vec<String>,
}

/// Parses a raw info dictionary.
///
/// # Errors
///
/// Will return a `Protocol` error when the blob carries no readable `name`,
/// or when a present `files` list cannot be decoded either in place or via a
/// full decode of the blob.
pub fn parse(metadata: &[u8]) -> Result<TorrentMetainfo, Error> {
    let name_pos = find(metadata, NAME_KEY).ok_or_else(|| Error::Protocol("info dictionary has no name field".to_string()))?;

    let (name_value, _) = decode_prefix(&metadata[name_pos + NAME_KEY.len()..])?;
    let name = String::from_utf8_lossy(name_value.as_bytes()?).into_owned();

    let files = match find(metadata, FILES_KEY) {
        // Multi-file torrents carry `files` in front of `name`.
        Some(files_pos) if files_pos < name_pos => parse_files(metadata, files_pos, name_pos)?,
        _ => Vec::new(),
    };

    Ok(TorrentMetainfo { name, files })
}

/// Decodes the `files` list by wrapping the slice between the `files` key and
/// the `name` key back into a dictionary. Falls back to decoding the whole
/// blob when the slice is not self-contained.
fn parse_files(metadata: &[u8], files_pos: usize, name_pos: usize) -> Result<Vec<String>, Error> {
    let mut wrapped = Vec::with_capacity(name_pos - files_pos + 2);
    wrapped.push(b'd');
    wrapped.extend_from_slice(&metadata[files_pos..name_pos]);
    wrapped.push(b'e');

    let decoded = match decode(&wrapped) {
        Ok(value) => value,
        Err(_) => decode(metadata)?,
    };

    let files = decoded
        .get(b"files")
        .ok_or_else(|| Error::Protocol("info dictionary has no decodable files list".to_string()))?
        .as_list()?;

    let mut paths = Vec::new();
    for file in files {
        let components = file
            .get(b"path")
            .ok_or_else(|| Error::Protocol("file entry has no path".to_string()))?
            .as_list()?;

        for component in components {
            paths.push(String::from_utf8_lossy(component.as_bytes()?).into_owned());
        }
    }

    Ok(paths)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {

    mod the_metainfo_parser {
        use crate::core::error::Error;
        use crate::core::metainfo::parse;

        #[test]
        fn it_should_extract_the_name_of_a_single_file_torrent() {
            let metadata = b"d6:lengthi42e4:name5:hello12:piece lengthi16384e6:pieces0:e";

            let metainfo = parse(metadata).unwrap();

            assert_eq!(metainfo.name, "hello");
            assert!(metainfo.files.is_empty());
        }

        #[test]
        fn it_should_flatten_the_paths_of_a_multi_file_torrent() {
            let metadata = b"d5:filesld6:lengthi1e4:pathl1:a5:b.txteed6:lengthi2e4:pathl5:c.mkveee4:name6:bundle12:piece lengthi16384e6:pieces0:e";

            let metainfo = parse(metadata).unwrap();

            assert_eq!(metainfo.name, "bundle");
            assert_eq!(metainfo.files, vec!["a".to_string(), "b.txt".to_string(), "c.mkv".to_string()]);
        }

        #[test]
        fn it_should_survive_binary_pieces_data() {
            let mut metadata = b"d6:lengthi42e4:name5:hello12:piece lengthi16384e6:pieces20:".to_vec();
            metadata.extend_from_slice(&[0xffu8; 20]);
            metadata.push(b'e');

            let metainfo = parse(&metadata).unwrap();

            assert_eq!(metainfo.name, "hello");
        }

        #[test]
        fn it_should_reject_a_blob_without_a_name() {
            let err = parse(b"d6:lengthi42ee").unwrap_err();

            assert!(matches!(err, Error::Protocol(_)));
        }

        #[test]
        fn it_should_reject_a_truncated_name() {
            let err = parse(b"d4:name99:hello").unwrap_err();

            assert!(matches!(err, Error::Protocol(_)));
        }

        #[test]
        fn it_should_keep_non_utf8_names_readable() {
            let metadata = b"d4:name4:h\xffi!e";

            let metainfo = parse(metadata).unwrap();

            assert_eq!(metainfo.name, "h\u{fffd}i!");
        }
    }
}
