//! Application segment (APPn) sub-parse, dispatched on the signature at the payload start.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::jpeg::marker::Marker;
use crate::jpeg::mpf::{parse_mpf, MpfDirectory};
use crate::jpeg::view::{text_until_terminator, ByteView};

/// Longest signature kept for unrecognized application segments.
const MAX_SIGNATURE_LEN: usize = 64;

const JFIF_SIGNATURE: &[u8] = b"JFIF\0";
const JFXX_SIGNATURE: &[u8] = b"JFXX\0";
const EXIF_SIGNATURE: &[u8] = b"Exif";
const FPXR_SIGNATURE: &[u8] = b"FPXR";
const MPF_SIGNATURE: &[u8] = b"MPF";

/// Decoded application segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AppSegment {
    /// n in APPn.
    pub index: u8,
    /// Printable signature at the payload start.
    pub signature: String,
    pub info: AppInfo,
}

impl AppSegment {
    /// APP1..=APP13 payloads are re-walked for embedded streams.
    #[inline]
    pub fn may_embed_stream(&self) -> bool {
        (1..=13).contains(&self.index)
    }
}

/// Signature-specific content of an application segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum AppInfo {
    Jfif(JfifInfo),
    Jfxx { thumbnail: ThumbnailFormat },
    Exif,
    Fpxr,
    Mpf(MpfDirectory),
    /// Signature recognized but the fixed fields did not fit in the payload.
    Truncated,
    Other,
}

/// JFIF APP0 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct JfifInfo {
    pub version_major: u8,
    pub version_minor: u8,
    pub units: DensityUnit,
    pub x_density: u16,
    pub y_density: u16,
    /// `(width, height)` of the embedded RGB thumbnail; `None` for 0x0.
    pub thumbnail: Option<(u8, u8)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DensityUnit {
    AspectRatio,
    Dpi,
    Dpcm,
    Unknown(u8),
}

impl DensityUnit {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DensityUnit::AspectRatio,
            1 => DensityUnit::Dpi,
            2 => DensityUnit::Dpcm,
            other => DensityUnit::Unknown(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DensityUnit::AspectRatio => "(aspect)",
            DensityUnit::Dpi => "dpi",
            DensityUnit::Dpcm => "dpcm",
            DensityUnit::Unknown(_) => "(unknown unit)",
        }
    }
}

/// JFXX extension thumbnail encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ThumbnailFormat {
    Jpeg,
    Palette1Byte,
    Rgb3Byte,
    Unknown(u8),
}

impl ThumbnailFormat {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x10 => ThumbnailFormat::Jpeg,
            0x11 => ThumbnailFormat::Palette1Byte,
            0x13 => ThumbnailFormat::Rgb3Byte,
            other => ThumbnailFormat::Unknown(other),
        }
    }

    pub fn label(self) -> String {
        match self {
            ThumbnailFormat::Jpeg => "thumb in JPEG".to_string(),
            ThumbnailFormat::Palette1Byte => "thumb in 1 bpp".to_string(),
            ThumbnailFormat::Rgb3Byte => "thumb in 3 bpp".to_string(),
            ThumbnailFormat::Unknown(code) => format!("thumb format unknown (0x{:02X})", code),
        }
    }
}

/// Parse an APPn payload. `data` is the whole walked buffer (MPF entries point outside the
/// segment); `payload` starts after the length field.
///
/// Never fails: short payloads degrade to [`AppInfo::Truncated`] or [`AppInfo::Other`].
pub fn parse_application(marker: Marker, data: &[u8], payload: ByteView<'_>) -> AppSegment {
    let index = marker.app_index().unwrap_or_default();
    let head = &payload.as_slice()[..payload.len().min(MAX_SIGNATURE_LEN)];
    let signature = text_until_terminator(head);

    let info = if index == 0 && payload.starts_with(JFIF_SIGNATURE) {
        parse_jfif(payload).map_or(AppInfo::Truncated, AppInfo::Jfif)
    } else if index == 0 && payload.starts_with(JFXX_SIGNATURE) {
        payload.u8_at(5).map_or(AppInfo::Truncated, |code| AppInfo::Jfxx {
            thumbnail: ThumbnailFormat::from_code(code),
        })
    } else if index == 1 && payload.starts_with(EXIF_SIGNATURE) {
        AppInfo::Exif
    } else if index == 2 && payload.starts_with(FPXR_SIGNATURE) {
        AppInfo::Fpxr
    } else if index == 2 && payload.starts_with(MPF_SIGNATURE) {
        AppInfo::Mpf(parse_mpf(data, payload))
    } else {
        AppInfo::Other
    };

    AppSegment {
        index,
        signature,
        info,
    }
}

fn parse_jfif(payload: ByteView<'_>) -> Option<JfifInfo> {
    let thumb_w = payload.u8_at(12).ok()?;
    let thumb_h = payload.u8_at(13).ok()?;
    Some(JfifInfo {
        version_major: payload.u8_at(5).ok()?,
        version_minor: payload.u8_at(6).ok()?,
        units: DensityUnit::from_code(payload.u8_at(7).ok()?),
        x_density: payload.be_u16(8).ok()?,
        y_density: payload.be_u16(10).ok()?,
        thumbnail: (thumb_w != 0 || thumb_h != 0).then_some((thumb_w, thumb_h)),
    })
}
