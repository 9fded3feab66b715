//! JPEG marker-segment walking.
//!
//! - `marker`: marker classification and the single-segment decoder.
//! - `app`: APPn signature sub-parse (JFIF, JFXX, Exif, FPXR, MPF).
//! - `mpf`: Multi-Picture Format directory with its own byte order.
//! - `walker`: start-of-image seeking, segment loop, nested and concatenated streams.
//! - `view`: bounds-checked reads shared by all of the above.

pub mod app;
mod error;
pub mod marker;
pub mod mpf;
pub mod view;
mod walker;

pub use app::{AppInfo, AppSegment, DensityUnit, JfifInfo, ThumbnailFormat};
pub use error::DecodeError;
pub use marker::{
    decode, parse_frame, ChromaSubsampling, FrameComponent, FrameHeader, FrameVariant, Marker,
    SOI_SIGNATURE,
};
pub use mpf::{MpImage, MpImageType, MpRegion, MpfDirectory, StereoRole};
pub use view::{ByteView, Endian};
pub use walker::{
    find_soi, is_jpeg, walk, CANON_TRAILER_HEADER_LEN, CANON_TRAILER_SIGNATURE,
    MAX_NESTED_WALKS, MAX_NESTING_DEPTH,
};
