//! Analysis result types: the segment tree found in a buffer and its summary.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::jpeg::app::{AppInfo, AppSegment};
use crate::jpeg::marker::{FrameHeader, Marker};
use crate::jpeg::DecodeError;

/// Whether the buffer held at least one JPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Classification {
    /// A start-of-image signature was found and walked.
    Jpeg,
    /// No start-of-image signature anywhere in the buffer.
    NotAJpeg,
}

/// Decoded content of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "class", content = "fields", rename_all = "snake_case"))]
pub enum SegmentKind {
    StartOfImage,
    EndOfImage,
    Frame(FrameHeader),
    /// Entropy-coded data follows; it is skipped, never parsed.
    StartOfScan,
    Application(AppSegment),
    Comment(String),
    /// Length-only segment (tables, restart interval, extensions).
    Generic,
    /// Proprietary block after EOI (e.g. `CANON OPTIONAL`), consumed as opaque.
    Trailer { signature: String },
}

/// One segment found while walking.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Segment {
    /// Offset of the marker, relative to the walked region (see [`Finding::base`]).
    pub offset: usize,
    /// `None` only for trailer blocks, which are not introduced by a marker.
    pub marker: Option<Marker>,
    /// Declared length: includes the 2-byte length field, excludes the marker. 0 for SOI/EOI.
    /// For trailer blocks, the whole block.
    pub length: usize,
    pub kind: SegmentKind,
    /// Streams found by re-walking this segment's payload.
    pub child: Option<Box<Finding>>,
}

impl Segment {
    /// Bytes occupied in the buffer, marker included.
    #[inline]
    pub fn consumed(&self) -> usize {
        match self.marker {
            Some(_) => 2 + self.length,
            None => self.length,
        }
    }

    /// Application payload, if this is an APPn segment.
    pub fn application(&self) -> Option<&AppSegment> {
        match &self.kind {
            SegmentKind::Application(app) => Some(app),
            _ => None,
        }
    }

    /// Nested findings attached to this segment: the payload walk and any MPF image walks.
    pub fn children(&self) -> impl Iterator<Item = &Finding> {
        let mpf_children = self
            .application()
            .and_then(|app| match &app.info {
                AppInfo::Mpf(dir) => Some(dir.images.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
            .iter()
            .filter_map(|img| img.child.as_deref());
        self.child.as_deref().into_iter().chain(mpf_children)
    }
}

/// A non-fatal condition noticed while walking (offsets local to the finding's region).
pub type WalkIssue = DecodeError;

/// Ordered segments of one walked region, with everything nested under them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Finding {
    /// Absolute offset of the walked region in the top-level buffer.
    pub base: usize,
    pub segments: Vec<Segment>,
    /// Number of start-of-image markers seen in this region.
    pub streams: usize,
    /// Conditions that did not end the walk (depth limits, MPF bounds errors).
    pub issues: Vec<WalkIssue>,
    /// Condition that ended this region's walk early, if any.
    pub stop: Option<DecodeError>,
}

impl Finding {
    pub fn new(base: usize) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// True when the region decoded at least one segment past a start-of-image. A lone SOI
    /// is usually a stray `FF D8` pair inside binary metadata.
    #[inline]
    pub fn holds_stream(&self) -> bool {
        self.streams > 0 && self.segments.len() > 1
    }
}

/// Totals over a whole finding tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Summary {
    pub classification: Classification,
    /// Segments at every nesting level.
    pub segments: usize,
    /// Streams in the top-level region (concatenated images count separately).
    pub streams: usize,
    /// Child findings (embedded thumbnails, MPF images) at every nesting level.
    pub nested_streams: usize,
    /// Non-fatal issues at every nesting level.
    pub issues: usize,
    /// Condition that ended the top-level walk early. Offset is absolute.
    pub first_stop: Option<DecodeError>,
    /// First condition, in tree order, that ended a nested walk early. Offset is absolute.
    /// Nested failures never affect the top-level walk.
    pub first_nested_stop: Option<DecodeError>,
}

/// Result of analyzing one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AnalysisResult {
    pub summary: Summary,
    pub finding: Finding,
    /// Cursor where the top-level walk ended.
    pub end: usize,
    pub size_bytes: usize,
}

impl AnalysisResult {
    #[inline]
    pub fn is_jpeg(&self) -> bool {
        self.summary.classification == Classification::Jpeg
    }
}

/// Build the summary of a top-level finding.
pub fn summarize(finding: &Finding) -> Summary {
    let mut summary = Summary {
        classification: if finding.streams > 0 {
            Classification::Jpeg
        } else {
            Classification::NotAJpeg
        },
        segments: 0,
        streams: finding.streams,
        nested_streams: 0,
        issues: 0,
        first_stop: finding.stop.map(|e| e.rebased(finding.base)),
        first_nested_stop: None,
    };
    accumulate(finding, &mut summary);
    summary
}

fn accumulate(finding: &Finding, summary: &mut Summary) {
    summary.segments += finding.segments.len();
    summary.issues += finding.issues.len();
    for segment in &finding.segments {
        for child in segment.children() {
            summary.nested_streams += 1;
            if summary.first_nested_stop.is_none() {
                summary.first_nested_stop = child.stop.map(|e| e.rebased(child.base));
            }
            accumulate(child, summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soi(offset: usize) -> Segment {
        Segment {
            offset,
            marker: Some(Marker(0xD8)),
            length: 0,
            kind: SegmentKind::StartOfImage,
            child: None,
        }
    }

    #[test]
    fn consumed_counts_marker() {
        let mut s = soi(0);
        assert_eq!(s.consumed(), 2);
        s.length = 16;
        assert_eq!(s.consumed(), 18);
        s.marker = None;
        assert_eq!(s.consumed(), 16);
    }

    #[test]
    fn summary_counts_nested_levels() {
        let mut inner = Finding::new(10);
        inner.segments.push(soi(0));
        inner.streams = 1;
        inner.stop = Some(DecodeError::TruncatedBuffer { offset: 2, needed: 2 });

        let mut outer = Finding::new(0);
        let mut app = soi(0);
        app.child = Some(Box::new(inner));
        outer.segments.push(app);
        outer.segments.push(soi(2));
        outer.streams = 1;

        let s = summarize(&outer);
        assert_eq!(s.classification, Classification::Jpeg);
        assert_eq!(s.segments, 3);
        assert_eq!(s.nested_streams, 1);
        assert_eq!(s.first_stop, None);
        assert_eq!(
            s.first_nested_stop,
            Some(DecodeError::TruncatedBuffer { offset: 12, needed: 2 })
        );
    }

    #[test]
    fn top_level_stop_is_kept_apart_from_nested_stops() {
        let mut outer = Finding::new(0);
        outer.segments.push(soi(0));
        outer.streams = 1;
        outer.stop = Some(DecodeError::TruncatedBuffer { offset: 2, needed: 2 });
        let s = summarize(&outer);
        assert_eq!(
            s.first_stop,
            Some(DecodeError::TruncatedBuffer { offset: 2, needed: 2 })
        );
        assert_eq!(s.first_nested_stop, None);
    }

    #[test]
    fn lone_start_of_image_is_not_a_stream() {
        let mut f = Finding::new(0);
        f.segments.push(soi(0));
        f.streams = 1;
        assert!(!f.holds_stream());
        f.segments.push(soi(2));
        assert!(f.holds_stream());
        assert!(!Finding::new(0).holds_stream());
    }

    #[test]
    fn empty_finding_is_not_a_jpeg() {
        let s = summarize(&Finding::new(0));
        assert_eq!(s.classification, Classification::NotAJpeg);
        assert_eq!(s.segments, 0);
        assert_eq!(s.first_stop, None);
        assert_eq!(s.first_nested_stop, None);
    }
}
