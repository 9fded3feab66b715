//! # jpegtrace
//!
//! Recovery-first structure inspector for JPEG-family files. It walks the marker segments of
//! a buffer and reports what it finds, including streams embedded in other streams:
//!
//! - thumbnails inside APP1..APP13 metadata blocks (Exif and vendor segments),
//! - images listed by a Multi-Picture Format (MPF) directory in APP2,
//! - complete streams concatenated after an end-of-image marker,
//! - `CANON OPTIONAL` trailer blocks after an end-of-image marker.
//!
//! Malformed or truncated input never panics and never reads out of bounds. Every problem
//! ends only the region it occurs in; the caller always gets the structure recovered so far.
//! Entropy-coded scan data is skipped, never decoded.
//!
//! ## Example
//!
//! ```no_run
//! use jpegtrace::{analyze, report, Classification};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let result = analyze(&bytes);
//! if result.summary.classification == Classification::NotAJpeg {
//!     println!("Not a JPEG");
//! }
//! for line in report::render(&result.finding, &report::ReportConfig::default()) {
//!     println!("{}", line);
//! }
//! ```
//!
//! ## Throughput
//!
//! - `analyze(&[u8])` works on in-memory buffers and keeps no state between calls, so it can
//!   be called from any number of threads on the same or different buffers.

pub mod jpeg;
pub mod report;
mod result;

pub use jpeg::{decode, find_soi, is_jpeg, walk, DecodeError, Marker};
pub use result::{
    summarize, AnalysisResult, Classification, Finding, Segment, SegmentKind, Summary,
    WalkIssue,
};

/// Walk the whole buffer from offset 0 and summarize what was found.
#[inline]
pub fn analyze(data: &[u8]) -> AnalysisResult {
    let (finding, end) = walk(data, 0);
    let summary = summarize(&finding);
    AnalysisResult {
        summary,
        finding,
        end,
        size_bytes: data.len(),
    }
}

/// Result of analyzing one item in a batch (path or index + analysis result).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BatchItem<T> {
    pub path_or_id: T,
    pub result: AnalysisResult,
}

/// Analyze many buffers in sequence.
pub fn analyze_batch<I, B>(items: I) -> Vec<BatchItem<B>>
where
    I: IntoIterator<Item = (B, Vec<u8>)>,
{
    items
        .into_iter()
        .map(|(path_or_id, bytes)| BatchItem {
            path_or_id,
            result: analyze(&bytes),
        })
        .collect()
}
