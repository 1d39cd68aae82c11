//! The bencode value union and its typed accessors.
use std::collections::BTreeMap;
use std::str;

use crate::error::Error;

/// A decoded bencode value.
///
/// Dictionaries use a `BTreeMap` keyed by raw bytes so that encoding emits
/// keys in lexicographic order without an extra sorting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    /// The variant name, used in [`Error::TypeMismatch`] messages.
    #[must_use]
    pub fn variant(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bytes(_) => "byte string",
            Value::List(_) => "list",
            Value::Dict(_) => "dictionary",
        }
    }

    /// # Errors
    ///
    /// Will return a `TypeMismatch` error if the value is not an integer.
    pub fn as_int(&self) -> Result<i64, Error> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(Error::TypeMismatch {
                expected: "integer",
                found: other.variant(),
            }),
        }
    }

    /// # Errors
    ///
    /// Will return a `TypeMismatch` error if the value is not a byte string.
    pub fn as_bytes(&self) -> Result<&[u8], Error> {
        match self {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(Error::TypeMismatch {
                expected: "byte string",
                found: other.variant(),
            }),
        }
    }

    /// The value as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Will return a `TypeMismatch` error if the value is not a byte string
    /// holding valid UTF-8.
    pub fn as_str(&self) -> Result<&str, Error> {
        let bytes = self.as_bytes()?;
        str::from_utf8(bytes).map_err(|_| Error::TypeMismatch {
            expected: "utf-8 string",
            found: "binary byte string",
        })
    }

    /// # Errors
    ///
    /// Will return a `TypeMismatch` error if the value is not a list.
    pub fn as_list(&self) -> Result<&[Value], Error> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Error::TypeMismatch {
                expected: "list",
                found: other.variant(),
            }),
        }
    }

    /// # Errors
    ///
    /// Will return a `TypeMismatch` error if the value is not a dictionary.
    pub fn as_dict(&self) -> Result<&BTreeMap<Vec<u8>, Value>, Error> {
        match self {
            Value::Dict(entries) => Ok(entries),
            other => Err(Error::TypeMismatch {
                expected: "dictionary",
                found: other.variant(),
            }),
        }
    }

    /// Looks up a dictionary key. Returns `None` when the value is not a
    /// dictionary or the key is absent.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Bytes(text.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Bytes(text.into_bytes())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<Vec<u8>, Value>> for Value {
    fn from(entries: BTreeMap<Vec<u8>, Value>) -> Self {
        Value::Dict(entries)
    }
}
