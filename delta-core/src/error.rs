//! Error types for delta-core.

use thiserror::Error;

use crate::types::Position;

/// Result type alias for delta-core operations.
pub type Result<T> = std::result::Result<T, DeltaError>;

/// Errors that can occur while normalizing or comparing storage layouts.
///
/// A layout that changed is never an error. Moved, removed and dirty
/// variables are ordinary classification results.
#[derive(Error, Debug)]
pub enum DeltaError {
    /// A storage record references a type key that is absent from the type dictionary.
    #[error("Malformed input: type '{type_key}' referenced by '{label}' is missing from the type dictionary")]
    MissingType {
        /// Label of the storage variable.
        label: String,
        /// Type key that could not be resolved.
        type_key: String,
    },

    /// A slot, offset or size field is not a number, or does not fit the address space.
    #[error("Malformed input: {field} of '{label}' is not a usable number: {value:?}")]
    InvalidNumber {
        /// Label of the storage variable (or type) carrying the field.
        label: String,
        /// Field name (`slot`, `offset`, `numberOfBytes`).
        field: &'static str,
        /// Raw value as found in the input.
        value: String,
    },

    /// The aligned overlay and old sequences ended up with different lengths.
    #[error("Internal invariant violated: aligned lengths differ (overlay {overlay}, old {old}). This is a bug, please report it")]
    AlignmentMismatch {
        /// Length of the aligned overlay sequence.
        overlay: usize,
        /// Length of the aligned old sequence.
        old: usize,
    },

    /// Both aligned sides at a position are placeholders.
    #[error("Internal invariant violated: no entry on either side at byte {start}. This is a bug, please report it")]
    UnalignedPosition {
        /// Byte position of the empty row.
        start: Position,
    },

    /// A directory handed to the pair scanner does not exist.
    #[error("Path does not exist: {path}")]
    ScanRootMissing {
        /// Path as given by the caller.
        path: String,
    },

    /// I/O error while reading layout files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error for raw layout documents.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeltaError {
    /// True for errors caused by bad input rather than a bug.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            DeltaError::MissingType { .. } | DeltaError::InvalidNumber { .. }
        )
    }

    /// True for failed internal invariants.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            DeltaError::AlignmentMismatch { .. } | DeltaError::UnalignedPosition { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeltaError::MissingType {
            label: "owner".to_string(),
            type_key: "t_address".to_string(),
        };
        assert!(err.to_string().contains("t_address"));
        assert!(err.to_string().contains("owner"));

        let err = DeltaError::AlignmentMismatch {
            overlay: 3,
            old: 4,
        };
        assert!(err.to_string().contains("overlay 3"));
        assert!(err.to_string().contains("bug"));
    }

    #[test]
    fn test_error_grouping() {
        let malformed = DeltaError::InvalidNumber {
            label: "x".to_string(),
            field: "slot",
            value: "abc".to_string(),
        };
        assert!(malformed.is_malformed_input());
        assert!(!malformed.is_internal());

        let internal = DeltaError::UnalignedPosition {
            start: Position::from(64u64),
        };
        assert!(internal.is_internal());
        assert!(!internal.is_malformed_input());
    }
}
