//! 12-byte object identifiers rendered as 24 hex characters

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Length of the textual form
pub const OBJECT_ID_HEX_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectIdError {
    #[error("expected 24 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("non-hex character in object identifier")]
    InvalidCharacter,
}

/// Channel identifier
///
/// Layout: 4 bytes big-endian seconds since the epoch, 5 bytes fixed per
/// process, 3 bytes of a wrapping counter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

fn process_unique() -> &'static [u8; 5] {
    static UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    UNIQUE.get_or_init(|| {
        let mut bytes = [0u8; 5];
        rand::rng().fill_bytes(&mut bytes);
        bytes
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::rng().next_u32()))
        .fetch_add(1, Ordering::Relaxed)
        & 0x00ff_ffff
}

impl ObjectId {
    /// Create a fresh identifier
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let counter = next_counter();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Seconds since the epoch encoded in the leading bytes
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Whether `s` has the textual form of an object identifier
    pub fn is_valid(s: &str) -> bool {
        s.len() == OBJECT_ID_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Parse the 24 hex character form (either case)
    pub fn parse(s: &str) -> Result<Self, ObjectIdError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(ObjectIdError::InvalidLength(s.len()));
        }

        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ObjectIdError::InvalidCharacter)?;
        Ok(ObjectId(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_examples() {
        assert!(ObjectId::is_valid("60f1a2b3c4d5e6f7a8b9c0d1"));
        assert!(ObjectId::is_valid("60F1A2B3C4D5E6F7A8B9C0D1"));
        assert!(!ObjectId::is_valid("not-an-id"));
        assert!(!ObjectId::is_valid(""));
        assert!(!ObjectId::is_valid("60f1a2b3c4d5e6f7a8b9c0d"));
        assert!(!ObjectId::is_valid("60f1a2b3c4d5e6f7a8b9c0dz"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ObjectId::parse("abc"), Err(ObjectIdError::InvalidLength(3)));
        assert_eq!(
            ObjectId::parse("zzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(ObjectIdError::InvalidCharacter)
        );
    }

    #[test]
    fn test_display_is_lowercase() {
        let id = ObjectId::parse("60F1A2B3C4D5E6F7A8B9C0D1").unwrap();
        assert_eq!(id.to_string(), "60f1a2b3c4d5e6f7a8b9c0d1");
    }

    #[test]
    fn test_generate_is_unique_and_valid() {
        let a = ObjectId::generate();
        let b = ObjectId::generate();
        assert_ne!(a, b);
        assert!(ObjectId::is_valid(&a.to_string()));
        // Same process, same middle bytes
        assert_eq!(a.as_bytes()[4..9], b.as_bytes()[4..9]);
    }

    #[test]
    fn test_generate_embeds_current_time() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as u32;
        let id = ObjectId::generate();
        assert!(id.timestamp_secs().abs_diff(now) <= 1);
    }

    #[test]
    fn test_serde_as_string() {
        let id = ObjectId::parse("60f1a2b3c4d5e6f7a8b9c0d1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"60f1a2b3c4d5e6f7a8b9c0d1\"");
        assert!(serde_json::from_str::<ObjectId>("\"bogus\"").is_err());
    }
}
