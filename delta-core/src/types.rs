//! Data models for storage layouts.
//!
//! Two families of types live here: the raw records exactly as the Solidity
//! compiler emits them in its `storageLayout` output, and the byte-addressed
//! items the comparison works on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// A byte position, size or slot number in contract storage.
///
/// Slots go up to 2^256 - 1 (`layout at` bases included), so byte positions
/// need a few bits more than 256.
pub type Position = ruint::aliases::U320;

/// Size of one storage slot in bytes.
pub const SLOT_SIZE: Position = Position::from_limbs([32, 0, 0, 0, 0]);

/// Serde adapter writing a [`Position`] as a decimal string.
pub mod decimal {
    use super::Position;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Position, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Position, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Raw compiler output
// ============================================================================

/// A numeric field that may be encoded as a JSON number or a numeric string.
///
/// solc writes slots as decimal strings (`"0"`) and offsets as numbers (`0`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Int(u64),
    Text(String),
}

impl NumberLike {
    /// Parse the value with `parseInt`-like leniency.
    ///
    /// Surrounding whitespace is ignored, a `0x` prefix selects hexadecimal,
    /// and otherwise the leading run of decimal digits is used (`"12abc"` is 12).
    /// Returns `None` when there are no leading digits or the value overflows.
    pub fn parse(&self) -> Option<Position> {
        match self {
            NumberLike::Int(n) => Some(Position::from(*n)),
            NumberLike::Text(s) => {
                let s = s.trim();
                if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    let digits: String = hex.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
                    if digits.is_empty() {
                        return None;
                    }
                    return Position::from_str_radix(&digits, 16).ok();
                }
                let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return None;
                }
                Position::from_str_radix(&digits, 10).ok()
            }
        }
    }
}

impl fmt::Display for NumberLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberLike::Int(n) => write!(f, "{}", n),
            NumberLike::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for NumberLike {
    fn from(value: u64) -> Self {
        NumberLike::Int(value)
    }
}

/// One entry of the compiler's `storage` array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStorageEntry {
    #[serde(rename = "astId", default, skip_serializing_if = "Option::is_none")]
    pub ast_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    pub label: String,
    pub offset: NumberLike,
    pub slot: NumberLike,
    #[serde(rename = "type")]
    pub type_key: String,
}

/// A struct member inside a raw type definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMember {
    #[serde(rename = "astId", default, skip_serializing_if = "Option::is_none")]
    pub ast_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    pub label: String,
    pub offset: NumberLike,
    pub slot: NumberLike,
    #[serde(rename = "type")]
    pub type_key: String,
}

/// A raw entry of the compiler's `types` dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawType {
    pub encoding: String,
    pub label: String,
    #[serde(rename = "numberOfBytes")]
    pub number_of_bytes: NumberLike,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<RawMember>>,
}

/// A complete `storageLayout` document.
///
/// `types` is `null` in compiler output for contracts without state variables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLayout {
    #[serde(default)]
    pub storage: Vec<RawStorageEntry>,
    #[serde(default)]
    pub types: Option<HashMap<String, RawType>>,
}

impl RawLayout {
    /// Parse a `storageLayout` JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A layout without any variables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a type definition by key.
    pub fn resolve_type(&self, type_key: &str) -> Option<&RawType> {
        self.types.as_ref()?.get(type_key)
    }
}

// ============================================================================
// Normalized layout
// ============================================================================

/// A half-open byte range `[start, end)` in the linear storage address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    #[serde(with = "decimal")]
    pub start: Position,
    #[serde(with = "decimal")]
    pub end: Position,
}

impl ByteRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered (zero for empty or inverted ranges).
    pub fn width(&self) -> Position {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Half-open interval intersection.
    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Slot containing the first byte.
    pub fn slot(&self) -> Position {
        self.start / SLOT_SIZE
    }

    /// Offset of the first byte within its slot.
    pub fn offset(&self) -> u64 {
        // Below 32, so the low limb is the whole value.
        (self.start % SLOT_SIZE).as_limbs()[0]
    }
}

/// A struct member with provenance (`astId`, `contract`) stripped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    pub label: String,
    pub type_key: String,
    pub slot: NumberLike,
    pub offset: NumberLike,
}

impl From<&RawMember> for MemberDescriptor {
    fn from(member: &RawMember) -> Self {
        Self {
            label: member.label.clone(),
            type_key: member.type_key.clone(),
            slot: member.slot.clone(),
            offset: member.offset.clone(),
        }
    }
}

/// Type information attached to a storage item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub label: String,
    pub encoding: String,
    #[serde(with = "decimal")]
    pub number_of_bytes: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberDescriptor>,
}

/// A storage variable bound to a byte range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageItem {
    pub label: String,
    #[serde(with = "decimal")]
    pub start: Position,
    #[serde(with = "decimal")]
    pub end: Position,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(with = "decimal")]
    pub slot: Position,
    pub offset: u64,
}

impl StorageItem {
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }

    /// Position-independent equality on label, type label, size and encoding.
    pub fn is_structurally_identical(&self, other: &StorageItem) -> bool {
        self.label == other.label
            && self.ty.label == other.ty.label
            && self.ty.number_of_bytes == other.ty.number_of_bytes
            && self.ty.encoding == other.ty.encoding
    }

    /// True if any byte of this item is also covered by `range`.
    pub fn overlaps(&self, range: &ByteRange) -> bool {
        self.range().overlaps(range)
    }
}

/// An ordered, read-only sequence of storage items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layout {
    items: Vec<StorageItem>,
}

impl Layout {
    /// Build a layout, stably sorting the items by start position.
    pub fn new(mut items: Vec<StorageItem>) -> Self {
        items.sort_by_key(|item| item.start);
        Self { items }
    }

    pub fn items(&self) -> &[StorageItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StorageItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True if some item is structurally identical to `item`, wherever it sits.
    pub fn contains_identical(&self, item: &StorageItem) -> bool {
        self.items.iter().any(|other| other.is_structurally_identical(item))
    }

    /// True if some item shares at least one byte with `range`.
    pub fn overlaps(&self, range: &ByteRange) -> bool {
        self.items.iter().any(|other| other.overlaps(range))
    }
}

impl<'a> IntoIterator for &'a Layout {
    type Item = &'a StorageItem;
    type IntoIter = std::slice::Iter<'a, StorageItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
