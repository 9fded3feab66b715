//! Bounds-checked byte view used by the segment decoder.
//! Every read fails closed with [`DecodeError::TruncatedBuffer`]; nothing here panics.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::jpeg::error::DecodeError;

/// Byte order declared by an MPF directory header. Scoped to that directory only; the
/// marker stream's own length fields are always big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// `II` selects little-endian; any other flag is read as big-endian.
    #[inline]
    pub fn from_flag(flag: [u8; 2]) -> Self {
        if flag == *b"II" {
            Endian::Little
        } else {
            Endian::Big
        }
    }
}

/// Read-only window onto part of a buffer.
///
/// `origin` is the window's position in the buffer being walked, so errors name offsets a
/// reader can find in the file rather than offsets inside the window.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
    origin: usize,
}

impl<'a> ByteView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, origin: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of this window in the walked buffer.
    #[inline]
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Raw bytes of the window.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    fn truncated(&self, offset: usize, needed: usize) -> DecodeError {
        DecodeError::TruncatedBuffer {
            offset: self.origin.saturating_add(offset),
            needed,
        }
    }

    /// `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| self.truncated(offset, len))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| self.truncated(offset, len))
    }

    /// Sub-window of `len` bytes starting at `offset`.
    pub fn window(&self, offset: usize, len: usize) -> Result<ByteView<'a>, DecodeError> {
        Ok(ByteView {
            data: self.bytes(offset, len)?,
            origin: self.origin + offset,
        })
    }

    /// Everything from `offset` to the end of the window.
    pub fn tail(&self, offset: usize) -> Result<ByteView<'a>, DecodeError> {
        let len = self
            .data
            .len()
            .checked_sub(offset)
            .ok_or_else(|| self.truncated(offset, 0))?;
        self.window(offset, len)
    }

    #[inline]
    pub fn u8_at(&self, offset: usize) -> Result<u8, DecodeError> {
        self.data
            .get(offset)
            .copied()
            .ok_or_else(|| self.truncated(offset, 1))
    }

    /// Big-endian u16, the layout of every marker-stream length field.
    #[inline]
    pub fn be_u16(&self, offset: usize) -> Result<u16, DecodeError> {
        self.u16_at(Endian::Big, offset)
    }

    #[inline]
    pub fn be_u32(&self, offset: usize) -> Result<u32, DecodeError> {
        self.u32_at(Endian::Big, offset)
    }

    #[inline]
    pub fn u16_at(&self, bo: Endian, offset: usize) -> Result<u16, DecodeError> {
        let b = self.bytes(offset, 2)?;
        Ok(match bo {
            Endian::Little => u16::from_le_bytes([b[0], b[1]]),
            Endian::Big => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    #[inline]
    pub fn u32_at(&self, bo: Endian, offset: usize) -> Result<u32, DecodeError> {
        let b = self.bytes(offset, 4)?;
        Ok(match bo {
            Endian::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            Endian::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }

    /// True when the window starts with `prefix`.
    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data.starts_with(prefix)
    }
}

/// Printable text from `bytes`, stopping at the first NUL, LF or CR.
pub fn text_until_terminator(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == 0 || b == b'\n' || b == b'\r')
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
