//! Stream walker: finds start-of-image, decodes every segment, follows embedded streams.
//!
//! One recursive operation serves the top-level buffer, APPn payloads and MPF image regions.
//! Recursion is bounded by [`MAX_NESTING_DEPTH`] and by a per-call budget of
//! [`MAX_NESTED_WALKS`] nested walks, so crafted MPF offset chains cannot loop or fan out
//! without limit. A region (absolute start and length) is walked at most once per call, so
//! repeated MP entries do not re-walk the same bytes. Nothing in here fails: every error ends
//! the current region's walk and the partial [`Finding`] is returned.

use std::collections::HashSet;

use log::{debug, trace};

use crate::jpeg::app::AppInfo;
use crate::jpeg::error::DecodeError;
use crate::jpeg::marker::{decode, SEGMENT_HEADER_LEN, SOI_SIGNATURE};
use crate::jpeg::mpf::MpRegion;
use crate::jpeg::view::{text_until_terminator, ByteView};
use crate::result::{Finding, Segment, SegmentKind};

/// Deepest nesting level walked (the top-level region is level 0).
pub const MAX_NESTING_DEPTH: usize = 16;
/// Nested walks allowed under one top-level call.
pub const MAX_NESTED_WALKS: usize = 4096;

/// Proprietary block some cameras append after EOI.
pub const CANON_TRAILER_SIGNATURE: &[u8] = b"CANON OPTIONAL";
/// Fixed header of a trailer block; its big-endian body length sits in the last 4 bytes.
pub const CANON_TRAILER_HEADER_LEN: usize = 28;
const CANON_TRAILER_LENGTH_OFFSET: usize = 24;

/// Offset of the next `FF D8` at or after `from`.
#[inline]
pub fn find_soi(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|w| w == SOI_SIGNATURE)
        .map(|p| from + p)
}

/// True when the buffer contains a start-of-image signature anywhere.
#[inline]
pub fn is_jpeg(data: &[u8]) -> bool {
    find_soi(data, 0).is_some()
}

/// Walk `data` from `start`: returns every segment found and the cursor where the walk ended.
///
/// When no start-of-image signature follows `start`, the finding is empty and the cursor is
/// `data.len()`. Concatenated streams after an EOI are walked into the same finding.
pub fn walk(data: &[u8], start: usize) -> (Finding, usize) {
    Walker::default().walk_region(data, start, 0, 0)
}

#[derive(Debug, Default)]
struct Walker {
    nested_walks: usize,
    /// Absolute `(start, len)` of every region already walked.
    walked: HashSet<(usize, usize)>,
}

impl Walker {
    fn walk_region(
        &mut self,
        data: &[u8],
        start: usize,
        base: usize,
        depth: usize,
    ) -> (Finding, usize) {
        let mut finding = Finding::new(base);
        let Some(mut cursor) = find_soi(data, start) else {
            return (finding, data.len());
        };

        while cursor + 1 < data.len() {
            let (segment, next) = match decode(data, cursor) {
                Ok(decoded) => decoded,
                Err(DecodeError::NotAMarker { .. }) => {
                    cursor += 1;
                    continue;
                }
                Err(err) => {
                    debug!("walk at base {:#x} stopped: {}", base, err);
                    finding.stop = Some(err);
                    return (finding, cursor);
                }
            };
            trace!(
                "[{:#09x}] {} len={}",
                base + cursor,
                segment.marker.map(|m| m.name()).unwrap_or_default(),
                segment.length
            );

            let end_of_image = match segment.kind {
                SegmentKind::StartOfImage => {
                    finding.streams += 1;
                    false
                }
                SegmentKind::EndOfImage => true,
                _ => false,
            };
            let segment = self.descend(data, segment, depth, &mut finding);
            finding.segments.push(segment);
            cursor = next;

            if end_of_image {
                cursor = match consume_trailers(data, cursor, &mut finding) {
                    Ok(after) => after,
                    Err(err) => {
                        debug!("trailer at base {:#x} runs past the end: {}", base, err);
                        finding.stop = Some(err);
                        return (finding, data.len());
                    }
                };
                match find_soi(data, cursor) {
                    Some(next_stream) => cursor = next_stream,
                    None => return (finding, data.len()),
                }
            }
        }

        // Ran out of bytes inside a stream: no EOI.
        finding.stop = Some(DecodeError::TruncatedBuffer {
            offset: cursor,
            needed: 2,
        });
        (finding, cursor)
    }

    /// Walk the regions an application segment points at: its own payload (APP1..=APP13)
    /// and the in-bounds images of an MPF directory.
    fn descend(
        &mut self,
        data: &[u8],
        mut segment: Segment,
        depth: usize,
        finding: &mut Finding,
    ) -> Segment {
        let SegmentKind::Application(app) = &mut segment.kind else {
            return segment;
        };
        let embeds = app.may_embed_stream();

        if let AppInfo::Mpf(dir) = &mut app.info {
            for image in &mut dir.images {
                match image.region {
                    MpRegion::Embedded { start, len } => {
                        image.child = self.nested(data, start, len, segment.offset, depth, finding);
                    }
                    MpRegion::OutOfBounds { start, len } => {
                        debug!(
                            "MP image {} at {:#x} (+{}) is outside the buffer",
                            image.index,
                            finding.base + start,
                            len
                        );
                        finding.issues.push(DecodeError::TruncatedBuffer {
                            offset: start,
                            needed: len,
                        });
                    }
                    MpRegion::Primary | MpRegion::Backward { .. } => {}
                }
            }
        }

        if embeds {
            let payload_start = segment.offset + SEGMENT_HEADER_LEN;
            let payload_len = segment.length.saturating_sub(2);
            segment.child = self.nested(
                data,
                payload_start,
                payload_len,
                segment.offset,
                depth,
                finding,
            );
        }
        segment
    }

    /// Walk `data[start..start + len]` one level deeper. Returns `None` when the region holds
    /// no stream past a bare SOI, was already walked, or the nesting limits are reached (the
    /// latter is recorded on `parent`). A failed sub-walk never touches `parent.stop`.
    fn nested(
        &mut self,
        data: &[u8],
        start: usize,
        len: usize,
        owner: usize,
        depth: usize,
        parent: &mut Finding,
    ) -> Option<Box<Finding>> {
        let region = data.get(start..start.checked_add(len)?)?;
        find_soi(region, 0)?;

        let key = (parent.base + start, len);
        if self.walked.contains(&key) {
            trace!("region {:#x} (+{}) already walked", key.0, len);
            return None;
        }

        let depth = depth + 1;
        if depth > MAX_NESTING_DEPTH || self.nested_walks >= MAX_NESTED_WALKS {
            debug!(
                "not descending into {:#x}: depth {} / {} nested walks",
                parent.base + start,
                depth,
                self.nested_walks
            );
            parent
                .issues
                .push(DecodeError::TooDeeplyNested { offset: owner, depth });
            return None;
        }
        self.nested_walks += 1;
        self.walked.insert(key);

        let (child, _) = self.walk_region(region, 0, parent.base + start, depth);
        if !child.holds_stream() {
            debug!("ignoring bare SOI at {:#x}", child.base);
            return None;
        }
        debug!(
            "nested stream at {:#x}: {} segment(s)",
            child.base,
            child.segments.len()
        );
        Some(Box::new(child))
    }
}

/// Consume `CANON OPTIONAL` blocks directly after an EOI. Returns the cursor after the last
/// block; a block running past the end is pushed and then reported as truncated.
fn consume_trailers(
    data: &[u8],
    mut cursor: usize,
    finding: &mut Finding,
) -> Result<usize, DecodeError> {
    let view = ByteView::new(data);
    while data
        .get(cursor..)
        .is_some_and(|rest| rest.len() >= CANON_TRAILER_HEADER_LEN && rest.starts_with(CANON_TRAILER_SIGNATURE))
    {
        let header = view.window(cursor, CANON_TRAILER_HEADER_LEN)?;
        let body = header.be_u32(CANON_TRAILER_LENGTH_OFFSET)? as usize;
        let length = CANON_TRAILER_HEADER_LEN.saturating_add(body);
        let signature = text_until_terminator(header.bytes(0, CANON_TRAILER_LENGTH_OFFSET)?);
        finding.segments.push(Segment {
            offset: cursor,
            marker: None,
            length,
            kind: SegmentKind::Trailer { signature },
            child: None,
        });
        match cursor.checked_add(length) {
            Some(end) if end <= data.len() => cursor = end,
            _ => {
                return Err(DecodeError::TruncatedBuffer {
                    offset: cursor,
                    needed: length,
                })
            }
        }
    }
    Ok(cursor)
}
