//! Converts raw compiler records into byte-addressed storage items.

use tracing::debug;

use crate::error::{DeltaError, Result};
use crate::types::{
    Layout, MemberDescriptor, NumberLike, Position, RawLayout, RawStorageEntry, RawType,
    StorageItem, TypeDescriptor, SLOT_SIZE,
};

/// Largest slot number the EVM can address.
const MAX_SLOT_BITS: usize = 256;

fn parse_field(value: &NumberLike, label: &str, field: &'static str) -> Result<Position> {
    value.parse().ok_or_else(|| DeltaError::InvalidNumber {
        label: label.to_string(),
        field,
        value: value.to_string(),
    })
}

/// Strip provenance from a raw type so identical types from different contracts compare equal.
fn describe_type(raw: &RawType, label: &str) -> Result<TypeDescriptor> {
    Ok(TypeDescriptor {
        label: raw.label.clone(),
        encoding: raw.encoding.clone(),
        number_of_bytes: parse_field(&raw.number_of_bytes, label, "numberOfBytes")?,
        members: raw
            .members
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(MemberDescriptor::from)
            .collect(),
    })
}

fn normalize_entry(entry: &RawStorageEntry, layout: &RawLayout) -> Result<StorageItem> {
    let raw_type = layout
        .resolve_type(&entry.type_key)
        .ok_or_else(|| DeltaError::MissingType {
            label: entry.label.clone(),
            type_key: entry.type_key.clone(),
        })?;
    let ty = describe_type(raw_type, &entry.label)?;

    let slot = parse_field(&entry.slot, &entry.label, "slot")?;
    let offset = parse_field(&entry.offset, &entry.label, "offset")?;

    if slot.bit_len() > MAX_SLOT_BITS {
        return Err(DeltaError::InvalidNumber {
            label: entry.label.clone(),
            field: "slot",
            value: entry.slot.to_string(),
        });
    }
    let start = slot
        .checked_mul(SLOT_SIZE)
        .and_then(|base| base.checked_add(offset))
        .ok_or_else(|| DeltaError::InvalidNumber {
            label: entry.label.clone(),
            field: "offset",
            value: entry.offset.to_string(),
        })?;
    let end = start
        .checked_add(ty.number_of_bytes)
        .ok_or_else(|| DeltaError::InvalidNumber {
            label: entry.label.clone(),
            field: "numberOfBytes",
            value: raw_type.number_of_bytes.to_string(),
        })?;
    let offset = match offset.as_limbs() {
        [low, rest @ ..] if rest.iter().all(|limb| *limb == 0) => *low,
        _ => {
            return Err(DeltaError::InvalidNumber {
                label: entry.label.clone(),
                field: "offset",
                value: entry.offset.to_string(),
            })
        }
    };

    Ok(StorageItem {
        label: entry.label.clone(),
        start,
        end,
        ty,
        slot,
        offset,
    })
}

/// Normalize a raw `storageLayout` document into an ascending [`Layout`].
///
/// Each item starts at `slot * 32 + offset` and ends `numberOfBytes` later.
/// Fails on the first record whose type is missing or whose numbers don't parse.
pub fn normalize(raw: &RawLayout) -> Result<Layout> {
    let items = raw
        .storage
        .iter()
        .map(|entry| normalize_entry(entry, raw))
        .collect::<Result<Vec<_>>>()?;

    if items.windows(2).any(|pair| pair[0].start > pair[1].start) {
        debug!(
            count = items.len(),
            "storage records were not ascending, reordering by start"
        );
    }

    Ok(Layout::new(items))
}
