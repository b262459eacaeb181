//! Opaque 64-bit identifiers
//!
//! The canonical form of an [`Id`] is the big-endian value rendered as exactly
//! sixteen lowercase hexadecimal characters. That form is used both as the
//! primary-bucket key and on the wire.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Exact length of an encoded [`Id`]
pub const ID_LENGTH: usize = 16;

/// Unique identifier; zero is never valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(u64);

impl Id {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn valid(&self) -> bool {
        self.0 != 0
    }

    /// Encode into the fixed-length hex form; fails on the zero id
    pub fn encode(&self) -> Result<Vec<u8>> {
        if !self.valid() {
            return Err(Error::invalid("invalid ID"));
        }
        Ok(format!("{:016x}", self.0).into_bytes())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ID_LENGTH {
            return Err(Error::invalid(format!(
                "id must have length {}, got {}",
                ID_LENGTH,
                bytes.len()
            )));
        }

        if !bytes.iter().all(u8::is_ascii_hexdigit) {
            return Err(Error::invalid("id must be hexadecimal"));
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::invalid("id is not valid utf-8").with_source(e))?;
        let value = u64::from_str_radix(text, 16)
            .map_err(|e| Error::invalid(format!("id {:?} is not hexadecimal", text)).with_source(e))?;

        let id = Id(value);
        if !id.valid() {
            return Err(Error::invalid("invalid ID"));
        }
        Ok(id)
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Id(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Id::decode(s.as_bytes())
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Id::decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
