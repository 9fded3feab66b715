//! Decoder and walker error taxonomy.
//!
//! None of these abort an analysis: the walker turns each one into "stop this region, keep
//! what was found so far" (or, for [`DecodeError::NotAMarker`], a one-byte skip).

#[cfg(feature = "serde")]
use serde::Serialize;
use thiserror::Error;

/// Why a decode step or a (sub)walk could not continue.
///
/// Offsets are relative to the buffer that was being walked when the condition occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum DecodeError {
    /// The bytes at `offset` are not a segment-introducing marker (fill byte, stuffed zero,
    /// restart marker or reserved code). The walker skips one byte and retries.
    #[error("no marker at offset {offset:#x}")]
    NotAMarker { offset: usize },

    /// A declared segment length is smaller than its own 2-byte length field.
    #[error("segment at offset {offset:#x} declares length {length}, below the 2-byte minimum")]
    MalformedLength { offset: usize, length: u16 },

    /// A read of `needed` bytes at `offset` would run past the end of the data.
    #[error("read of {needed} byte(s) at offset {offset:#x} runs past the end of the data")]
    TruncatedBuffer { offset: usize, needed: usize },

    /// A nested walk at `offset` was skipped because it would exceed the nesting limits.
    #[error("nested stream at offset {offset:#x} skipped: depth {depth} exceeds the nesting limit")]
    TooDeeplyNested { offset: usize, depth: usize },
}

impl DecodeError {
    /// Offset the condition refers to.
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::NotAMarker { offset }
            | DecodeError::MalformedLength { offset, .. }
            | DecodeError::TruncatedBuffer { offset, .. }
            | DecodeError::TooDeeplyNested { offset, .. } => offset,
        }
    }

    /// Same condition with its offset shifted by `base` (local to absolute position).
    pub fn rebased(self, base: usize) -> Self {
        match self {
            DecodeError::NotAMarker { offset } => DecodeError::NotAMarker {
                offset: offset + base,
            },
            DecodeError::MalformedLength { offset, length } => DecodeError::MalformedLength {
                offset: offset + base,
                length,
            },
            DecodeError::TruncatedBuffer { offset, needed } => DecodeError::TruncatedBuffer {
                offset: offset + base,
                needed,
            },
            DecodeError::TooDeeplyNested { offset, depth } => DecodeError::TooDeeplyNested {
                offset: offset + base,
                depth,
            },
        }
    }
}
