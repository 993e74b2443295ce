//! Element identifiers.
//!
//! An [`Id`] is opaque to the index engine: it is only compared, hashed, stored under index
//! entries and handed back to callers. Equality, ordering and hashing depend only on the
//! variant and its value.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

/// Length in bytes of an encoded [`Id::Uuid`].
pub const UUID_LENGTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Id {
    Number(i64),
    Uuid(Uuid),
    String(SmolStr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum IdType {
    Number,
    Uuid,
    String,
}

impl Id {
    /// The smallest id under the derived ordering, used as a lower sentinel in range scans.
    pub const MIN: Id = Id::Number(i64::MIN);

    #[inline]
    pub fn id_type(&self) -> IdType {
        match self {
            Id::Number(_) => IdType::Number,
            Id::Uuid(_) => IdType::Uuid,
            Id::String(_) => IdType::String,
        }
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Id::Number(_))
    }

    #[inline]
    pub fn is_uuid(&self) -> bool {
        matches!(self, Id::Uuid(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Id::String(_))
    }

    /// Returns the numeric value of a [`Id::Number`].
    #[inline]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Id::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// Native byte representation: big-endian for numbers, the 16 raw bytes for uuids and
    /// UTF-8 for strings.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Id::Number(n) => n.to_be_bytes().to_vec(),
            Id::Uuid(u) => u.as_bytes().to_vec(),
            Id::String(s) => s.as_bytes().to_vec(),
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Id::Number(_) => size_of::<i64>(),
            Id::Uuid(_) => UUID_LENGTH,
            Id::String(s) => s.len(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{n}"),
            Id::Uuid(u) => write!(f, "{u}"),
            Id::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    #[inline]
    fn from(value: i64) -> Self {
        Id::Number(value)
    }
}

impl From<i32> for Id {
    #[inline]
    fn from(value: i32) -> Self {
        Id::Number(i64::from(value))
    }
}

impl From<Uuid> for Id {
    #[inline]
    fn from(value: Uuid) -> Self {
        Id::Uuid(value)
    }
}

impl From<&str> for Id {
    #[inline]
    fn from(value: &str) -> Self {
        Id::String(SmolStr::new(value))
    }
}

impl From<String> for Id {
    #[inline]
    fn from(value: String) -> Self {
        Id::String(SmolStr::from(value))
    }
}
