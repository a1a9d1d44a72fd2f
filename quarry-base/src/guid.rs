use std::fmt;
use std::str::FromStr;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use uuid::Uuid;

/// A stable 128-bit identifier for one asset. Survives renames and moves.
///
/// If using a human-readable format, serializes to a 32-character lowercase
/// hex string. Otherwise, serializes to and from a `[u32; 4]`.
#[derive(PartialEq, Eq, Clone, Copy, Default, Hash, Ord, PartialOrd)]
pub struct Guid(pub [u32; 4]);

impl Guid {
    /// The all-zero guid is reserved and means "no asset" / root sentinel.
    pub const NULL: Guid = Guid([0; 4]);

    pub fn new_unique() -> Self {
        Guid::from_uuid(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Guid([
            (value >> 96) as u32,
            (value >> 64) as u32,
            (value >> 32) as u32,
            value as u32,
        ])
    }

    pub fn as_u128(&self) -> u128 {
        ((self.0[0] as u128) << 96)
            | ((self.0[1] as u128) << 64)
            | ((self.0[2] as u128) << 32)
            | self.0[3] as u128
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Guid::from_u128(uuid.as_u128())
    }

    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_u128(self.as_u128())
    }

    pub fn is_null(&self) -> bool {
        *self == Guid::NULL
    }

    /// Constant guids are reserved/well-known identifiers (root and singleton
    /// assets) that never get a parent. They are recognizable by their upper
    /// two words being the only non-zero part.
    pub fn is_constant(&self) -> bool {
        !self.is_null() && self.0[2] == 0 && self.0[3] == 0
    }
}

impl fmt::Debug for Guid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "Guid({:08x}{:08x}{:08x}{:08x})",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for Guid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{:08x}{:08x}{:08x}{:08x}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept anything the uuid crate accepts (hyphenated or simple hex)
        Ok(Guid::from_uuid(Uuid::parse_str(s)?))
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

struct GuidVisitor;

impl<'a> Visitor<'a> for GuidVisitor {
    type Value = Guid;

    fn expecting(
        &self,
        fmt: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(fmt, "a 32-character hex string")
    }

    fn visit_str<E: de::Error>(
        self,
        s: &str,
    ) -> Result<Self::Value, E> {
        Guid::from_str(s).map_err(|_| de::Error::invalid_value(de::Unexpected::Str(s), &self))
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_string(GuidVisitor)
        } else {
            Ok(Guid(<[u32; 4]>::deserialize(deserializer)?))
        }
    }
}
