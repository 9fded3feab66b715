//! Tests for top-level analyze(), summaries and batch analysis.

use jpegtrace::{analyze, analyze_batch, is_jpeg, Classification, DecodeError};

fn app1_with_thumbnail() -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xD9]);
    let mut v = vec![0xFF, 0xD8, 0xFF, 0xE1];
    v.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    v.extend_from_slice(&payload);
    v.extend_from_slice(&[0xFF, 0xD9]);
    v
}

#[test]
fn detect_jpeg() {
    assert!(is_jpeg(&[0xFF, 0xD8]));
    assert!(is_jpeg(b"prefix\xFF\xD8"));
    assert!(!is_jpeg(&[0xFF]));
    assert!(!is_jpeg(&[]));
}

#[test]
fn summary_of_complete_file() {
    let data = app1_with_thumbnail();
    let r = analyze(&data);
    assert!(r.is_jpeg());
    assert_eq!(r.size_bytes, data.len());
    assert_eq!(r.end, data.len());
    assert_eq!(r.summary.classification, Classification::Jpeg);
    assert_eq!(r.summary.streams, 1);
    assert_eq!(r.summary.nested_streams, 1);
    assert_eq!(r.summary.segments, 5);
    assert_eq!(r.summary.issues, 0);
    assert_eq!(r.summary.first_stop, None);
    assert_eq!(r.summary.first_nested_stop, None);
}

#[test]
fn summary_of_truncated_file_has_absolute_stop() {
    let data = app1_with_thumbnail();
    let r = analyze(&data[..data.len() - 1]);
    assert!(r.is_jpeg());
    assert_eq!(
        r.summary.first_stop,
        Some(DecodeError::TruncatedBuffer {
            offset: data.len() - 2,
            needed: 2
        })
    );
}

#[test]
fn nested_stop_is_kept_apart_from_the_outer_walk() {
    // Inner stream: SOI, a 1-byte DQT, then the APP1 payload ends without an EOI.
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x03, 0x01, 0x00]);
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1];
    data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    data.extend_from_slice(&payload);
    data.extend_from_slice(&[0xFF, 0xD9]);

    let r = analyze(&data);
    assert_eq!(r.summary.nested_streams, 1);
    assert_eq!(r.summary.first_stop, None);
    // The payload region starts at 6; the inner walk runs out 13 bytes in.
    assert_eq!(
        r.summary.first_nested_stop,
        Some(DecodeError::TruncatedBuffer {
            offset: 6 + 13,
            needed: 2
        })
    );
}

#[test]
fn stray_soi_in_exif_leaves_a_complete_file_complete() {
    let mut payload = b"Exif\0\0MM\0*".to_vec();
    payload.extend_from_slice(&[0x01, 0xFF, 0xD8, 0x42, 0x00, 0x10]);
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1];
    data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    data.extend_from_slice(&payload);
    data.extend_from_slice(&[0xFF, 0xD9]);

    let r = analyze(&data);
    assert!(r.is_jpeg());
    assert_eq!(r.summary.segments, 3);
    assert_eq!(r.summary.nested_streams, 0);
    assert_eq!(r.summary.first_stop, None);
    assert_eq!(r.summary.first_nested_stop, None);
    assert!(r.finding.segments[1].child.is_none());
}

#[test]
fn not_a_jpeg_is_a_classification() {
    let r = analyze(b"GIF89a");
    assert!(!r.is_jpeg());
    assert_eq!(r.summary.classification, Classification::NotAJpeg);
    assert_eq!(r.summary.segments, 0);
    assert_eq!(r.end, 6);

    let r = analyze(&[]);
    assert_eq!(r.summary.classification, Classification::NotAJpeg);
}

#[test]
fn batch_keeps_ids_in_order() {
    let items = vec![
        ("a.jpg", vec![0xFF, 0xD8, 0xFF, 0xD9]),
        ("b.bin", b"nothing".to_vec()),
    ];
    let out = analyze_batch(items);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].path_or_id, "a.jpg");
    assert!(out[0].result.is_jpeg());
    assert_eq!(out[1].path_or_id, "b.bin");
    assert!(!out[1].result.is_jpeg());
}
