//! Multi-Picture Format (CIPA DC-007) directory in APP2.
//!
//! Layout after the `MPF\0` signature is a TIFF-style header (byte order, magic, offset of
//! the MP Index IFD). All offsets are relative to that header, and every multi-byte field
//! uses the header's byte order. The outer marker stream is unaffected.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::jpeg::error::DecodeError;
use crate::jpeg::view::{ByteView, Endian};
use crate::result::Finding;

/// Offset of the TIFF-style header inside the APP2 payload (after `MPF\0`).
pub const MPF_HEADER_OFFSET: usize = 4;

/// MPFVersion.
pub const TAG_MPF_VERSION: u16 = 0xB000;
/// NumberOfImages.
pub const TAG_NUMBER_OF_IMAGES: u16 = 0xB001;
/// MPEntry: offset of the 16-byte MP entry table.
pub const TAG_MP_ENTRY: u16 = 0xB002;
/// MPIndividualNum (attribute IFD): stereo role of this image.
pub const TAG_MP_INDIVIDUAL_NUM: u16 = 0xB101;

/// Size of one IFD entry in bytes.
pub const IFD_ENTRY_LEN: usize = 12;
/// Size of one MP entry in bytes.
pub const MP_ENTRY_LEN: usize = 16;

/// Caps on table sizes taken from the file.
const MAX_IFD_ENTRIES: usize = 512;
const MAX_MP_ENTRIES: usize = 256;

/// Single IFD entry (tag, type, count, value/offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value_offset: u32,
}

impl IfdEntry {
    /// Tags of the MP Index IFD live in 0xB0xx.
    #[inline]
    pub fn is_index_tag(&self) -> bool {
        self.tag & 0xFF00 == 0xB000
    }
}

/// Stereo role from MPIndividualNum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StereoRole {
    Left,
    Right,
    Unspecified,
}

impl StereoRole {
    pub fn from_value(value: u32) -> Self {
        match value {
            1 => StereoRole::Left,
            2 => StereoRole::Right,
            _ => StereoRole::Unspecified,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StereoRole::Left => "LEFT",
            StereoRole::Right => "RIGHT",
            StereoRole::Unspecified => "unspecified",
        }
    }
}

/// MP type code (low 24 bits of the individual image attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MpImageType {
    BaselinePrimary,
    LargeThumbnailVga,
    LargeThumbnailFullHd,
    Panorama,
    Disparity,
    MultiAngle,
    Undefined(u32),
}

impl MpImageType {
    pub fn from_attribute(attribute: u32) -> Self {
        match attribute & 0x00FF_FFFF {
            0x03_0000 => MpImageType::BaselinePrimary,
            0x01_0001 => MpImageType::LargeThumbnailVga,
            0x01_0002 => MpImageType::LargeThumbnailFullHd,
            0x02_0001 => MpImageType::Panorama,
            0x02_0002 => MpImageType::Disparity,
            0x02_0003 => MpImageType::MultiAngle,
            other => MpImageType::Undefined(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MpImageType::BaselinePrimary => "primary",
            MpImageType::LargeThumbnailVga => "thumbnail (VGA)",
            MpImageType::LargeThumbnailFullHd => "thumbnail (Full HD)",
            MpImageType::Panorama => "panorama",
            MpImageType::Disparity => "disparity",
            MpImageType::MultiAngle => "multi-angle",
            MpImageType::Undefined(_) => "undefined",
        }
    }
}

/// Where an MP entry's image lives in the walked buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum MpRegion {
    /// Offset 0: the image that contains this directory.
    Primary,
    /// In-bounds region following the directory's own segment.
    Embedded { start: usize, len: usize },
    /// Region extends past the end of the buffer.
    OutOfBounds { start: usize, len: usize },
    /// Region starts inside or before the directory's own segment.
    Backward { start: usize },
}

/// One image listed in the MP entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MpImage {
    pub index: usize,
    pub attribute: u32,
    pub image_type: MpImageType,
    pub size: u32,
    /// Data offset as stored (relative to the MPF header).
    pub offset: u32,
    pub region: MpRegion,
    /// Walk of an `Embedded` region, filled in by the walker.
    pub child: Option<Box<Finding>>,
}

/// Decoded MPF directory. Read failures are kept in `error`; whatever was read before the
/// failure stays available.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MpfDirectory {
    pub byte_order: Endian,
    /// MPFVersion as ASCII (usually "0100").
    pub version: Option<String>,
    pub image_count: Option<u32>,
    pub images: Vec<MpImage>,
    pub stereo_role: Option<StereoRole>,
    pub error: Option<DecodeError>,
}

impl MpfDirectory {
    fn note(&mut self, err: DecodeError) {
        log::debug!("MPF directory: {}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// Read one IFD entry at `offset` of `header`.
pub fn read_ifd_entry(
    bo: Endian,
    header: ByteView<'_>,
    offset: usize,
) -> Result<IfdEntry, DecodeError> {
    Ok(IfdEntry {
        tag: header.u16_at(bo, offset)?,
        field_type: header.u16_at(bo, offset + 2)?,
        count: header.u32_at(bo, offset + 4)?,
        value_offset: header.u32_at(bo, offset + 8)?,
    })
}

/// Parse the MPF directory of an APP2 segment.
///
/// `data` is the walked buffer; `payload` is the segment payload (starting at `MPF\0`) as a
/// window of `data`. Never fails.
pub fn parse_mpf(data: &[u8], payload: ByteView<'_>) -> MpfDirectory {
    let mut dir = MpfDirectory {
        byte_order: Endian::Big,
        version: None,
        image_count: None,
        images: Vec::new(),
        stereo_role: None,
        error: None,
    };
    if let Err(err) = read_directory(data, payload, &mut dir) {
        dir.note(err);
    }
    dir
}

fn read_directory(
    data: &[u8],
    payload: ByteView<'_>,
    dir: &mut MpfDirectory,
) -> Result<(), DecodeError> {
    let header = payload.tail(MPF_HEADER_OFFSET)?;
    let flag = header.bytes(0, 2)?;
    let bo = Endian::from_flag([flag[0], flag[1]]);
    dir.byte_order = bo;
    let segment_end = payload.origin() + payload.len();

    let index_ifd = header.u32_at(bo, 4)? as usize;
    let count = header.u16_at(bo, index_ifd)? as usize;
    if count > MAX_IFD_ENTRIES {
        return Err(DecodeError::TruncatedBuffer {
            offset: header.origin() + index_ifd,
            needed: count * IFD_ENTRY_LEN,
        });
    }
    let entries_start = index_ifd + 2;
    for i in 0..count {
        let entry = read_ifd_entry(bo, header, entries_start + i * IFD_ENTRY_LEN)?;
        if !entry.is_index_tag() {
            break;
        }
        match entry.tag {
            TAG_MPF_VERSION => {
                let raw = match bo {
                    Endian::Little => entry.value_offset.to_le_bytes(),
                    Endian::Big => entry.value_offset.to_be_bytes(),
                };
                dir.version = Some(String::from_utf8_lossy(&raw).into_owned());
            }
            TAG_NUMBER_OF_IMAGES => dir.image_count = Some(entry.value_offset),
            TAG_MP_ENTRY => {
                if let Err(err) = read_mp_entries(data, header, bo, segment_end, entry, dir) {
                    dir.note(err);
                }
            }
            _ => {}
        }
    }

    let next_ifd = header.u32_at(bo, entries_start + count * IFD_ENTRY_LEN)? as usize;
    if next_ifd != 0 {
        dir.stereo_role = find_stereo_role(header, bo, next_ifd)?;
    }
    Ok(())
}

/// Resolve each 16-byte MP entry to a region of `data`. A region that does not fit is
/// recorded as such; the remaining entries are still read.
fn read_mp_entries(
    data: &[u8],
    header: ByteView<'_>,
    bo: Endian,
    segment_end: usize,
    entry: IfdEntry,
    dir: &mut MpfDirectory,
) -> Result<(), DecodeError> {
    let n = (entry.count as usize / MP_ENTRY_LEN).min(MAX_MP_ENTRIES);
    let table = entry.value_offset as usize;
    for i in 0..n {
        let at = table + i * MP_ENTRY_LEN;
        let attribute = header.u32_at(bo, at)?;
        let size = header.u32_at(bo, at + 4)?;
        let offset = header.u32_at(bo, at + 8)?;
        let region = resolve_region(data.len(), header.origin(), segment_end, offset, size);
        dir.images.push(MpImage {
            index: i,
            attribute,
            image_type: MpImageType::from_attribute(attribute),
            size,
            offset,
            region,
            child: None,
        });
    }
    Ok(())
}

fn resolve_region(
    data_len: usize,
    header_origin: usize,
    segment_end: usize,
    offset: u32,
    size: u32,
) -> MpRegion {
    if offset == 0 {
        return MpRegion::Primary;
    }
    let start = header_origin.saturating_add(offset as usize);
    let len = size as usize;
    if start < segment_end {
        return MpRegion::Backward { start };
    }
    match start.checked_add(len) {
        Some(end) if end <= data_len => MpRegion::Embedded { start, len },
        _ => MpRegion::OutOfBounds { start, len },
    }
}

/// Look up MPIndividualNum in the MP Attribute IFD.
fn find_stereo_role(
    header: ByteView<'_>,
    bo: Endian,
    ifd: usize,
) -> Result<Option<StereoRole>, DecodeError> {
    let count = (header.u16_at(bo, ifd)? as usize).min(MAX_IFD_ENTRIES);
    for i in 0..count {
        let entry = read_ifd_entry(bo, header, ifd + 2 + i * IFD_ENTRY_LEN)?;
        if entry.tag == TAG_MP_INDIVIDUAL_NUM {
            return Ok(Some(StereoRole::from_value(entry.value_offset)));
        }
    }
    Ok(None)
}
