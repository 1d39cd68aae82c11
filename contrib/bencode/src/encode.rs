//! The bencode encoder.
use crate::Value;

/// Encodes a value into its canonical bencode form.
///
/// Dictionary keys are emitted in lexicographic byte order.
#[must_use]
pub fn encode(value: &Value) -> Vec<u8> {
    let mut output = Vec::new();
    encode_into(value, &mut output);
    output
}

fn encode_into(value: &Value, output: &mut Vec<u8>) {
    match value {
        Value::Int(n) => {
            output.push(crate::INT_START);
            output.extend_from_slice(n.to_string().as_bytes());
            output.push(crate::BEN_END);
        }
        Value::Bytes(bytes) => {
            output.extend_from_slice(bytes.len().to_string().as_bytes());
            output.push(crate::BYTE_LEN_END);
            output.extend_from_slice(bytes);
        }
        Value::List(items) => {
            output.push(crate::LIST_START);
            for item in items {
                encode_into(item, output);
            }
            output.push(crate::BEN_END);
        }
        Value::Dict(entries) => {
            output.push(crate::DICT_START);
            for (key, item) in entries {
                output.extend_from_slice(key.len().to_string().as_bytes());
                output.push(crate::BYTE_LEN_END);
                output.extend_from_slice(key);
                encode_into(item, output);
            }
            output.push(crate::BEN_END);
        }
    }
}

#[cfg(test)]
mod tests {

    mod the_encoder {
        use std::collections::BTreeMap;

        use crate::{encode, Value};

        #[test]
        fn it_should_encode_integers() {
            assert_eq!(encode(&Value::from(0)), b"i0e");
            assert_eq!(encode(&Value::from(42)), b"i42e");
            assert_eq!(encode(&Value::from(-3)), b"i-3e");
        }

        #[test]
        fn it_should_encode_byte_strings_with_their_length_prefix() {
            assert_eq!(encode(&Value::from("spam")), b"4:spam");
            assert_eq!(encode(&Value::from("")), b"0:");
            assert_eq!(encode(&Value::from(vec![0u8, 255])), b"2:\x00\xff");
        }

        #[test]
        fn it_should_encode_lists() {
            let list = Value::from(vec![Value::from("spam"), Value::from(42)]);

            assert_eq!(encode(&list), b"l4:spami42ee");
        }

        #[test]
        fn it_should_encode_dictionary_keys_in_lexicographic_order() {
            let mut entries = BTreeMap::new();
            entries.insert(b"zebra".to_vec(), Value::from(1));
            entries.insert(b"apple".to_vec(), Value::from(2));
            entries.insert(b"mango".to_vec(), Value::from(3));

            assert_eq!(encode(&Value::from(entries)), b"d5:applei2e5:mangoi3e5:zebrai1ee");
        }

        #[test]
        fn it_should_encode_nested_structures() {
            let mut inner = BTreeMap::new();
            inner.insert(b"id".to_vec(), Value::from("abcdefghij0123456789"));
            let value = Value::from(vec![Value::from(inner), Value::Bytes(Vec::new())]);

            assert_eq!(encode(&value), b"ld2:id20:abcdefghij0123456789e0:e");
        }
    }
}
