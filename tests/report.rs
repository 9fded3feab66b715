//! Text report tests.

use jpegtrace::analyze;
use jpegtrace::report::{render, render_summary, ReportConfig};

fn seg(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut v = vec![0xFF, marker];
    v.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    v.extend_from_slice(payload);
    v
}

fn sample() -> Vec<u8> {
    let mut jfif = b"JFIF\0".to_vec();
    jfif.extend_from_slice(&[1, 2, 1, 0, 72, 0, 72, 0, 0]);
    let mut exif = b"Exif\0\0".to_vec();
    exif.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xD9]);
    let sof = [8, 0, 2, 0, 4, 3, 1, 0x21, 0, 2, 0x11, 1, 3, 0x11, 1];
    let gray = [8, 0, 2, 0, 4, 1, 1, 0x11, 0];

    let mut v = vec![0xFF, 0xD8];
    v.extend(seg(0xE0, &jfif));
    v.extend(seg(0xE1, &exif));
    v.extend(seg(0xC0, &sof));
    v.extend(seg(0xC1, &gray));
    v.extend(seg(0xFE, b"hello\r\nworld"));
    v.extend_from_slice(&[0xFF, 0xD9]);
    v
}

#[test]
fn lines_per_segment() {
    let r = analyze(&sample());
    let lines = render(&r.finding, &ReportConfig::default());

    assert!(lines[0].starts_with("[0x      0] FFD8"), "{}", lines[0]);
    assert!(lines[0].ends_with("[SOI]"), "{}", lines[0]);
    assert!(lines[1].contains("[JFIF] [ver=1.2] [72x72 dpi]"), "{}", lines[1]);
    assert!(lines[2].contains("[APP1]") && lines[2].contains("[EXIF]"), "{}", lines[2]);
    // Nested stream under APP1, indented.
    assert!(lines[3].starts_with("  nested stream at 0x"), "{}", lines[3]);
    assert!(lines[4].starts_with("    [0x"), "{}", lines[4]);
    assert!(lines[4].contains("[SOI]"), "{}", lines[4]);
    let sof = lines.iter().find(|l| l.contains("[SOF0]")).unwrap();
    assert!(sof.contains("(Baseline) [4x2] [422]"), "{}", sof);
    let gray = lines.iter().find(|l| l.contains("[SOF1]")).unwrap();
    assert!(gray.contains("(Extended sequential)"), "{}", gray);
    assert!(gray.ends_with("Y=1:1"), "{}", gray);
    let com = lines.iter().find(|l| l.contains("[COM]")).unwrap();
    assert!(com.ends_with("[hello]"), "{}", com);
    assert!(lines.last().unwrap().contains("[EOI]"));
}

#[test]
fn verbose_adds_descriptions() {
    let r = analyze(&sample());
    let quiet = render(&r.finding, &ReportConfig::default());
    let verbose = render(&r.finding, &ReportConfig { verbose: true });
    assert_eq!(quiet.len(), verbose.len());
    assert!(verbose[0].contains("(Start Of Image)"));
    assert!(!quiet[0].contains("(Start Of Image)"));
    let sof = verbose.iter().find(|l| l.contains("[SOF0]")).unwrap();
    assert!(sof.contains("[8-bit]"), "{}", sof);
}

#[test]
fn stop_is_rendered_with_absolute_offset() {
    let data = sample();
    let r = analyze(&data[..data.len() - 1]);
    let lines = render(&r.finding, &ReportConfig::default());
    let last = lines.last().unwrap();
    assert!(last.starts_with("! stopped:"), "{}", last);
    assert!(last.contains(&format!("{:#x}", data.len() - 2)), "{}", last);

    let summary = render_summary(&r.summary);
    assert!(summary.starts_with("JPEG: "), "{}", summary);
    assert!(summary.contains("stopped early"), "{}", summary);
}

#[test]
fn complete_summary() {
    let r = analyze(&sample());
    assert_eq!(
        render_summary(&r.summary),
        "JPEG: 9 segment(s), 1 stream(s), 1 nested stream(s); complete"
    );
    assert_eq!(render_summary(&analyze(b"nope").summary), "Not a JPEG");
}
