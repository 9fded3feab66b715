//! Text rendering of a finding tree.
//!
//! Verbosity is a presentation concern only: it is passed in as [`ReportConfig`] and never
//! reaches the walker.

use std::fmt::Write as _;

use crate::jpeg::app::{AppInfo, AppSegment};
use crate::jpeg::marker::{FrameHeader, FrameVariant};
use crate::jpeg::mpf::{MpImage, MpRegion, MpfDirectory};
use crate::result::{Classification, Finding, Segment, SegmentKind, Summary};

/// Presentation options for [`render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportConfig {
    /// Append long marker descriptions and frame precision.
    pub verbose: bool,
}

/// One line per segment, nested findings indented under the segment that holds them.
/// Offsets are absolute positions in the analyzed buffer.
pub fn render(finding: &Finding, config: &ReportConfig) -> Vec<String> {
    let mut lines = Vec::new();
    render_finding(finding, config, 0, &mut lines);
    lines
}

/// One-line summary: classification, counts, and where the top-level walk (or, noted
/// separately, a nested walk) stopped early.
pub fn render_summary(summary: &Summary) -> String {
    if summary.classification == Classification::NotAJpeg {
        return "Not a JPEG".to_string();
    }
    let mut out = format!(
        "JPEG: {} segment(s), {} stream(s), {} nested stream(s)",
        summary.segments, summary.streams, summary.nested_streams
    );
    if summary.issues > 0 {
        let _ = write!(out, ", {} issue(s)", summary.issues);
    }
    match summary.first_stop {
        Some(stop) => {
            let _ = write!(out, "; stopped early: {}", stop);
        }
        None => out.push_str("; complete"),
    }
    if let Some(stop) = summary.first_nested_stop {
        let _ = write!(out, " (nested stream stopped early: {})", stop);
    }
    out
}

fn render_finding(finding: &Finding, config: &ReportConfig, level: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(level);
    for segment in &finding.segments {
        lines.push(format!("{}{}", indent, segment_line(finding.base, segment, config)));
        if let Some(dir) = mpf_directory(segment) {
            for image in &dir.images {
                lines.push(format!("{}  {}", indent, mp_image_line(finding.base, image)));
                if let Some(child) = &image.child {
                    render_finding(child, config, level + 2, lines);
                }
            }
        }
        if let Some(child) = &segment.child {
            lines.push(format!(
                "{}  nested stream at 0x{:X}:",
                indent, child.base
            ));
            render_finding(child, config, level + 2, lines);
        }
    }
    for issue in &finding.issues {
        lines.push(format!("{}! {}", indent, issue.rebased(finding.base)));
    }
    if let Some(stop) = &finding.stop {
        lines.push(format!("{}! stopped: {}", indent, stop.rebased(finding.base)));
    }
}

fn mpf_directory(segment: &Segment) -> Option<&MpfDirectory> {
    match &segment.application()?.info {
        AppInfo::Mpf(dir) => Some(dir),
        _ => None,
    }
}

fn segment_line(base: usize, segment: &Segment, config: &ReportConfig) -> String {
    let mut line = format!("[0x{:7X}]", base + segment.offset);
    let Some(marker) = segment.marker else {
        if let SegmentKind::Trailer { signature } = &segment.kind {
            let _ = write!(line, " {} [len=0x{:X}]", signature, segment.length);
        }
        return line;
    };

    let _ = write!(line, " FF{:02X}", marker.0);
    if marker.has_length() {
        let _ = write!(line, " {:<12}", format!("[len={}]", segment.length));
    }
    let _ = write!(line, " [{}]", marker.name());
    if config.verbose {
        if let Some(desc) = marker.description() {
            let _ = write!(line, " ({})", desc);
        }
    }

    match &segment.kind {
        SegmentKind::Frame(frame) => frame_details(frame, config, &mut line),
        SegmentKind::Application(app) => app_details(app, &mut line),
        SegmentKind::Comment(text) => {
            let _ = write!(line, " [{}]", text);
        }
        _ => {}
    }
    line
}

fn frame_details(frame: &FrameHeader, config: &ReportConfig, line: &mut String) {
    match frame.variant {
        FrameVariant::Unclassified(_) => {}
        variant => {
            let _ = write!(line, " ({})", variant.label());
        }
    }
    let _ = write!(line, " [{}x{}]", frame.width, frame.height);
    if config.verbose {
        let _ = write!(line, " [{}-bit]", frame.precision);
    }
    match frame.chroma {
        Some(chroma) => {
            let _ = write!(line, " [{}]", chroma.label());
        }
        None => {
            for c in &frame.components {
                match c.channel_name() {
                    Some(name) => {
                        let _ = write!(line, " {}={}:{}", name, c.h, c.v);
                    }
                    None => {
                        let _ = write!(line, " C{}={}:{}", c.id, c.h, c.v);
                    }
                }
            }
        }
    }
}

fn app_details(app: &AppSegment, line: &mut String) {
    match &app.info {
        AppInfo::Jfif(j) => {
            let _ = write!(
                line,
                " [{}] [ver={}.{}] [{}x{} {}]",
                app.signature,
                j.version_major,
                j.version_minor,
                j.x_density,
                j.y_density,
                j.units.label()
            );
            if let Some((w, h)) = j.thumbnail {
                let _ = write!(line, " [thumb={}x{}]", w, h);
            }
        }
        AppInfo::Jfxx { thumbnail } => {
            let _ = write!(line, " [{}] [{}]", app.signature, thumbnail.label());
        }
        AppInfo::Exif => line.push_str(" [EXIF]"),
        AppInfo::Fpxr => {
            let _ = write!(line, " [{}]", app.signature);
        }
        AppInfo::Mpf(dir) => {
            let _ = write!(line, " [{}]", app.signature);
            if let Some(version) = &dir.version {
                let _ = write!(line, " [ver={}]", version);
            }
            let _ = write!(line, " [{} image(s), {:?}]", dir.images.len(), dir.byte_order);
            if let Some(role) = dir.stereo_role {
                let _ = write!(line, " {}", role.label());
            }
            if let Some(err) = &dir.error {
                let _ = write!(line, " (directory damaged: {})", err);
            }
        }
        AppInfo::Truncated => {
            let _ = write!(line, " [{}] (truncated)", app.signature);
        }
        AppInfo::Other if app.signature.is_empty() => {}
        AppInfo::Other => {
            let _ = write!(line, " [{}]", app.signature);
        }
    }
}

fn mp_image_line(base: usize, image: &MpImage) -> String {
    let mut line = format!(
        "MP image #{}: {}, {} bytes",
        image.index + 1,
        image.image_type.label(),
        image.size
    );
    match image.region {
        MpRegion::Primary => line.push_str(" (this image)"),
        MpRegion::Embedded { start, .. } => {
            let _ = write!(line, " at 0x{:X}", base + start);
        }
        MpRegion::OutOfBounds { start, .. } => {
            let _ = write!(line, " at 0x{:X} (outside the buffer)", base + start);
        }
        MpRegion::Backward { start } => {
            let _ = write!(line, " at 0x{:X} (points back into its directory)", base + start);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::DecodeError;

    #[test]
    fn summary_line_not_a_jpeg() {
        let s = Summary {
            classification: Classification::NotAJpeg,
            segments: 0,
            streams: 0,
            nested_streams: 0,
            issues: 0,
            first_stop: None,
            first_nested_stop: None,
        };
        assert_eq!(render_summary(&s), "Not a JPEG");
    }

    #[test]
    fn summary_line_with_stop() {
        let s = Summary {
            classification: Classification::Jpeg,
            segments: 3,
            streams: 1,
            nested_streams: 0,
            issues: 1,
            first_stop: Some(DecodeError::TruncatedBuffer { offset: 0x20, needed: 2 }),
            first_nested_stop: None,
        };
        let line = render_summary(&s);
        assert!(line.starts_with("JPEG: 3 segment(s), 1 stream(s), 0 nested stream(s), 1 issue(s)"));
        assert!(line.contains("offset 0x20"), "{}", line);
        assert!(!line.contains("nested stream stopped"), "{}", line);
    }

    #[test]
    fn summary_line_with_nested_stop_only() {
        let s = Summary {
            classification: Classification::Jpeg,
            segments: 6,
            streams: 1,
            nested_streams: 1,
            issues: 0,
            first_stop: None,
            first_nested_stop: Some(DecodeError::TruncatedBuffer { offset: 0x13, needed: 2 }),
        };
        let line = render_summary(&s);
        assert!(line.contains("; complete (nested stream stopped early: "), "{}", line);
        assert!(line.contains("offset 0x13"), "{}", line);
    }
}
