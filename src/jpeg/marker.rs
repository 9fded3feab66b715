//! Marker classification and the single-segment decoder.
//!
//! `decode` looks at exactly one segment: it never scans ahead for markers and never looks
//! inside entropy-coded data. Recursion into embedded streams is the walker's job.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::jpeg::app::parse_application;
use crate::jpeg::error::DecodeError;
use crate::jpeg::view::{text_until_terminator, ByteView};
use crate::result::{Segment, SegmentKind};

/// Marker prefix byte.
pub const MARKER_PREFIX: u8 = 0xFF;
/// Start of image.
pub const SOI: u8 = 0xD8;
/// End of image.
pub const EOI: u8 = 0xD9;
/// Start of scan.
pub const SOS: u8 = 0xDA;
/// Comment.
pub const COM: u8 = 0xFE;
/// First and last application markers (APP0, APP15).
pub const APP0: u8 = 0xE0;
pub const APP15: u8 = 0xEF;

/// Start-of-image signature as it appears in a buffer.
pub const SOI_SIGNATURE: [u8; 2] = [MARKER_PREFIX, SOI];

/// Marker bytes plus length field.
pub const SEGMENT_HEADER_LEN: usize = 4;

/// Second byte of a marker code (`0xFF` prefix implied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Marker(pub u8);

impl Marker {
    /// True for codes that never introduce a segment: fill bytes, stuffed zeros, the
    /// reserved low range and restart markers.
    #[inline]
    pub fn is_reserved(self) -> bool {
        self.0 == MARKER_PREFIX || self.0 <= 0xBF || (0xD0..=0xD7).contains(&self.0)
    }

    /// SOI and EOI carry no length field.
    #[inline]
    pub fn has_length(self) -> bool {
        self.0 != SOI && self.0 != EOI
    }

    #[inline]
    pub fn is_frame(self) -> bool {
        matches!(self.0, 0xC0..=0xCF) && !matches!(self.0, 0xC4 | 0xC8 | 0xCC)
    }

    /// APPn index (0..=15) for application markers.
    #[inline]
    pub fn app_index(self) -> Option<u8> {
        (APP0..=APP15).contains(&self.0).then(|| self.0 - APP0)
    }

    /// Short name as printed in segment listings (e.g. "SOF2", "DQT", "APP1").
    pub fn name(self) -> String {
        match self.0 {
            0xC4 => "DHT".to_string(),
            0xC8 => "JPG".to_string(),
            0xCC => "DAC".to_string(),
            n @ 0xC0..=0xCF => format!("SOF{}", n - 0xC0),
            SOI => "SOI".to_string(),
            EOI => "EOI".to_string(),
            SOS => "SOS".to_string(),
            0xDB => "DQT".to_string(),
            0xDC => "DNL".to_string(),
            0xDD => "DRI".to_string(),
            0xDE => "DHP".to_string(),
            0xDF => "EXP".to_string(),
            n @ APP0..=APP15 => format!("APP{}", n - APP0),
            n @ 0xF0..=0xFD => format!("JPG{}", n - 0xF0),
            COM => "COM".to_string(),
            n => format!("0x{:02X}", n),
        }
    }

    /// Long description shown in verbose listings.
    pub fn description(self) -> Option<&'static str> {
        Some(match self.0 {
            0xC4 => "Huffman Table",
            0xC8 => "JPEG Extension",
            0xCC => "Arithmetic Coding",
            0xC0..=0xCF => "Start Of Frame",
            SOI => "Start Of Image",
            EOI => "End Of Image",
            SOS => "Start Of Scan",
            0xDB => "Quantization Table",
            0xDC => "Number of Lines",
            0xDD => "Restart Interval",
            0xDE => "Hierarchical Progression",
            0xDF => "Expand Reference Component",
            APP0..=APP15 => "Application Segment",
            0xF0..=0xFD => "JPEG Extension",
            COM => "Comment",
            _ => return None,
        })
    }
}

/// Coding process named by a frame marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FrameVariant {
    Baseline,
    ExtendedSequential,
    Progressive,
    Lossless,
    /// Frame codes without a well-established label (differential processes). Carries the
    /// raw marker byte.
    Unclassified(u8),
}

impl FrameVariant {
    pub fn from_marker(code: u8) -> Self {
        match code {
            0xC0 => FrameVariant::Baseline,
            0xC1 | 0xC9 => FrameVariant::ExtendedSequential,
            0xC2 | 0xCA => FrameVariant::Progressive,
            0xC3 | 0xCB => FrameVariant::Lossless,
            other => FrameVariant::Unclassified(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FrameVariant::Baseline => "Baseline",
            FrameVariant::ExtendedSequential => "Extended sequential",
            FrameVariant::Progressive => "Progressive",
            FrameVariant::Lossless => "Lossless",
            FrameVariant::Unclassified(_) => "Unclassified",
        }
    }
}

/// One component of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FrameComponent {
    pub id: u8,
    /// Horizontal sampling factor (high nibble).
    pub h: u8,
    /// Vertical sampling factor (low nibble).
    pub v: u8,
    pub quant_table: u8,
}

impl FrameComponent {
    #[inline]
    pub fn sampling_byte(&self) -> u8 {
        (self.h << 4) | (self.v & 0x0F)
    }

    /// Display name for well-known component ids (1..=5 are Y, Cb, Cr, I, Q).
    pub fn channel_name(&self) -> Option<&'static str> {
        match self.id {
            1 => Some("Y"),
            2 => Some("Cb"),
            3 => Some("Cr"),
            4 => Some("I"),
            5 => Some("Q"),
            _ => None,
        }
    }
}

/// Canonical chroma subsampling labels.
///
/// The `*Intel` variants are the same patterns on component ids 0, 1, 2 instead of 1, 2, 3,
/// as written by some encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ChromaSubsampling {
    #[cfg_attr(feature = "serde", serde(rename = "420"))]
    Yuv420,
    #[cfg_attr(feature = "serde", serde(rename = "422"))]
    Yuv422,
    #[cfg_attr(feature = "serde", serde(rename = "444"))]
    Yuv444,
    #[cfg_attr(feature = "serde", serde(rename = "420-intel"))]
    Yuv420Intel,
    #[cfg_attr(feature = "serde", serde(rename = "422-intel"))]
    Yuv422Intel,
    #[cfg_attr(feature = "serde", serde(rename = "444-intel"))]
    Yuv444Intel,
}

impl ChromaSubsampling {
    pub fn label(self) -> &'static str {
        match self {
            ChromaSubsampling::Yuv420 => "420",
            ChromaSubsampling::Yuv422 => "422",
            ChromaSubsampling::Yuv444 => "444",
            ChromaSubsampling::Yuv420Intel => "420-intel",
            ChromaSubsampling::Yuv422Intel => "422-intel",
            ChromaSubsampling::Yuv444Intel => "444-intel",
        }
    }

    /// Exact match of the sampling bytes by component id. Ids 0..=5 take part in the match;
    /// every id outside the pattern must be absent.
    pub fn classify(components: &[FrameComponent]) -> Option<Self> {
        let mut by_id: [Option<u8>; 6] = [None; 6];
        for c in components {
            if let Some(slot) = by_id.get_mut(c.id as usize) {
                *slot = Some(c.sampling_byte());
            }
        }
        let luma = |shift: usize| -> Option<u8> {
            let (y, cb, cr) = (by_id[shift], by_id[shift + 1], by_id[shift + 2]);
            let others_absent = by_id
                .iter()
                .enumerate()
                .all(|(i, v)| (shift..shift + 3).contains(&i) || v.is_none());
            if others_absent && cb == Some(0x11) && cr == Some(0x11) {
                y
            } else {
                None
            }
        };
        match (luma(1), luma(0)) {
            (Some(0x22), _) => Some(ChromaSubsampling::Yuv420),
            (Some(0x21), _) => Some(ChromaSubsampling::Yuv422),
            (Some(0x11), _) => Some(ChromaSubsampling::Yuv444),
            (_, Some(0x22)) => Some(ChromaSubsampling::Yuv420Intel),
            (_, Some(0x21)) => Some(ChromaSubsampling::Yuv422Intel),
            (_, Some(0x11)) => Some(ChromaSubsampling::Yuv444Intel),
            _ => None,
        }
    }
}

/// Decoded frame header (SOFn).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FrameHeader {
    pub variant: FrameVariant,
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    pub components: Vec<FrameComponent>,
    /// `None` when the sampling table matches no canonical pattern.
    pub chroma: Option<ChromaSubsampling>,
}

/// Parse a frame header from its payload (bytes after the length field).
pub fn parse_frame(code: u8, payload: ByteView<'_>) -> Result<FrameHeader, DecodeError> {
    let precision = payload.u8_at(0)?;
    let height = payload.be_u16(1)?;
    let width = payload.be_u16(3)?;
    let count = payload.u8_at(5)? as usize;
    let table = payload.bytes(6, count * 3)?;
    let components: Vec<FrameComponent> = table
        .chunks_exact(3)
        .map(|c| FrameComponent {
            id: c[0],
            h: c[1] >> 4,
            v: c[1] & 0x0F,
            quant_table: c[2],
        })
        .collect();
    let chroma = ChromaSubsampling::classify(&components);
    Ok(FrameHeader {
        variant: FrameVariant::from_marker(code),
        precision,
        width,
        height,
        components,
        chroma,
    })
}

/// Decode the segment whose marker sits at `cursor`.
///
/// On success returns the segment and the cursor just past it: `cursor + 2` for SOI/EOI,
/// `cursor + 2 + length` otherwise. The returned cursor is always greater than `cursor`.
pub fn decode(data: &[u8], cursor: usize) -> Result<(Segment, usize), DecodeError> {
    let view = ByteView::new(data);
    let head = view.bytes(cursor, 2)?;
    let marker = Marker(head[1]);
    if head[0] != MARKER_PREFIX || marker.is_reserved() {
        return Err(DecodeError::NotAMarker { offset: cursor });
    }

    if !marker.has_length() {
        let kind = if marker.0 == SOI {
            SegmentKind::StartOfImage
        } else {
            SegmentKind::EndOfImage
        };
        let segment = Segment {
            offset: cursor,
            marker: Some(marker),
            length: 0,
            kind,
            child: None,
        };
        return Ok((segment, cursor + 2));
    }

    let length = view.be_u16(cursor + 2)?;
    if length < 2 {
        return Err(DecodeError::MalformedLength {
            offset: cursor,
            length,
        });
    }
    let body = view.window(cursor + 2, length as usize)?;
    let payload = body.tail(2)?;

    let kind = match marker.0 {
        code if marker.is_frame() => SegmentKind::Frame(parse_frame(code, payload)?),
        SOS => SegmentKind::StartOfScan,
        COM => SegmentKind::Comment(text_until_terminator(payload.as_slice())),
        APP0..=APP15 => SegmentKind::Application(parse_application(marker, data, payload)),
        _ => SegmentKind::Generic,
    };

    let segment = Segment {
        offset: cursor,
        marker: Some(marker),
        length: length as usize,
        kind,
        child: None,
    };
    Ok((segment, cursor + 2 + length as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(id: u8, sampling: u8) -> FrameComponent {
        FrameComponent {
            id,
            h: sampling >> 4,
            v: sampling & 0x0F,
            quant_table: 0,
        }
    }

    #[test]
    fn reserved_codes() {
        assert!(Marker(0xFF).is_reserved());
        assert!(Marker(0x00).is_reserved());
        assert!(Marker(0x01).is_reserved());
        assert!(Marker(0xBF).is_reserved());
        assert!(Marker(0xD3).is_reserved());
        assert!(!Marker(0xC0).is_reserved());
        assert!(!Marker(0xD8).is_reserved());
    }

    #[test]
    fn frame_codes_exclude_tables() {
        assert!(Marker(0xC0).is_frame());
        assert!(Marker(0xCF).is_frame());
        assert!(!Marker(0xC4).is_frame());
        assert!(!Marker(0xC8).is_frame());
        assert!(!Marker(0xCC).is_frame());
    }

    #[test]
    fn names() {
        assert_eq!(Marker(0xC2).name(), "SOF2");
        assert_eq!(Marker(0xC4).name(), "DHT");
        assert_eq!(Marker(0xE1).name(), "APP1");
        assert_eq!(Marker(0xF3).name(), "JPG3");
        assert_eq!(Marker(0xDB).description(), Some("Quantization Table"));
    }

    #[test]
    fn chroma_table() {
        let c = |y| vec![comp(1, y), comp(2, 0x11), comp(3, 0x11)];
        assert_eq!(ChromaSubsampling::classify(&c(0x22)), Some(ChromaSubsampling::Yuv420));
        assert_eq!(ChromaSubsampling::classify(&c(0x21)), Some(ChromaSubsampling::Yuv422));
        assert_eq!(ChromaSubsampling::classify(&c(0x11)), Some(ChromaSubsampling::Yuv444));
        assert_eq!(ChromaSubsampling::classify(&c(0x12)), None);
    }

    #[test]
    fn chroma_vendor_variant_on_shifted_ids() {
        let c = vec![comp(0, 0x22), comp(1, 0x11), comp(2, 0x11)];
        assert_eq!(ChromaSubsampling::classify(&c), Some(ChromaSubsampling::Yuv420Intel));
        let c = vec![comp(0, 0x11), comp(1, 0x11), comp(2, 0x11)];
        assert_eq!(ChromaSubsampling::classify(&c), Some(ChromaSubsampling::Yuv444Intel));
    }

    #[test]
    fn chroma_requires_other_ids_absent() {
        let c = vec![comp(1, 0x22), comp(2, 0x11), comp(3, 0x11), comp(4, 0x11)];
        assert_eq!(ChromaSubsampling::classify(&c), None);
        let grey = vec![comp(1, 0x11)];
        assert_eq!(ChromaSubsampling::classify(&grey), None);
    }

    #[test]
    fn decode_frame_header() {
        let data = [
            0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x10, 0x00, 0x20, 0x03, 0x01, 0x22, 0x00, 0x02,
            0x11, 0x01, 0x03, 0x11, 0x01,
        ];
        let (seg, next) = decode(&data, 0).unwrap();
        assert_eq!(next, data.len());
        let SegmentKind::Frame(f) = seg.kind else {
            panic!("expected frame");
        };
        assert_eq!(f.variant, FrameVariant::Baseline);
        assert_eq!((f.width, f.height), (32, 16));
        assert_eq!(f.components.len(), 3);
        assert_eq!(f.chroma, Some(ChromaSubsampling::Yuv420));
    }

    #[test]
    fn differential_frame_is_unclassified() {
        let data = [0xFF, 0xC5, 0x00, 0x08, 0x08, 0x00, 0x01, 0x00, 0x01, 0x00];
        let (seg, _) = decode(&data, 0).unwrap();
        let SegmentKind::Frame(f) = seg.kind else {
            panic!("expected frame");
        };
        assert_eq!(f.variant, FrameVariant::Unclassified(0xC5));
    }

    #[test]
    fn short_length_is_malformed() {
        let data = [0xFF, 0xDB, 0x00, 0x01, 0x00];
        assert_eq!(
            decode(&data, 0),
            Err(DecodeError::MalformedLength { offset: 0, length: 1 })
        );
    }

    #[test]
    fn segment_past_end_is_truncated() {
        let data = [0xFF, 0xDB, 0x00, 0x10, 0x00];
        assert!(matches!(
            decode(&data, 0),
            Err(DecodeError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn fill_and_restart_are_not_markers() {
        assert_eq!(
            decode(&[0xFF, 0xFF, 0xD8], 0),
            Err(DecodeError::NotAMarker { offset: 0 })
        );
        assert_eq!(
            decode(&[0xFF, 0xD0], 0),
            Err(DecodeError::NotAMarker { offset: 0 })
        );
        assert_eq!(
            decode(&[0x12, 0xD8], 0),
            Err(DecodeError::NotAMarker { offset: 0 })
        );
    }

    #[test]
    fn comment_text() {
        let mut data = vec![0xFF, 0xFE, 0x00, 0x0A];
        data.extend_from_slice(b"hi there\n!");
        let data = &data[..12];
        let (seg, next) = decode(data, 0).unwrap();
        assert_eq!(next, 12);
        assert_eq!(seg.kind, SegmentKind::Comment("hi there".to_string()));
    }
}
