//! Codec integration tests: encrypted frames, metadata and failure handling.

mod common;

use std::collections::BTreeMap;

use naksha_map::codec::{FrameMetadata, NumberList, SegmentInfoMeta, encode};
use naksha_map::core::Dimensions;
use naksha_map::map::encode_name;
use naksha_map::{DecodeError, FrameType, decode};

const KEY: &str = "vendor-secret";
const IV: &str = "0123456789abcdef";

fn meta_frame() -> naksha_map::PartialFrame {
    let mut frame = common::two_rooms(7, 1);
    let mut seg_inf = BTreeMap::new();
    seg_inf.insert(
        "2".to_string(),
        SegmentInfoMeta {
            room_type: Some(4),
            name: Some(encode_name("Chef's corner")),
            ..Default::default()
        },
    );
    let mut cleanset = BTreeMap::new();
    cleanset.insert("1".to_string(), NumberList(vec![2.0, 1.0, 2.0, 1.0]));
    frame.metadata = FrameMetadata {
        ris: Some(2),
        mra: Some(90),
        seg_inf: Some(seg_inf),
        cleanset: Some(cleanset),
        tr: Some("M100,100L50,0S0,50".to_string()),
        ..Default::default()
    };
    frame
}

#[test]
fn test_encrypted_round_trip() {
    let mut frame = meta_frame();
    let raw = encode(&frame, Some(KEY), Some(IV)).unwrap();
    let decoded = decode(&raw, Some(IV), Some(KEY)).unwrap();

    frame.metadata.timestamp_ms = frame.timestamp_ms;
    assert_eq!(decoded, frame);
    assert_eq!(decoded.frame_type, FrameType::Initial);
    assert_eq!(decoded.dimensions, Dimensions::new(0, 0, 5, 3, 50));
}

#[test]
fn test_empty_iv_is_all_zero() {
    let frame = meta_frame();
    let raw = encode(&frame, Some(KEY), None).unwrap();
    let decoded = decode(&raw, Some(""), Some(KEY)).unwrap();
    assert_eq!(decoded.raw_bitmap, frame.raw_bitmap);
}

#[test]
fn test_wrong_key_fails() {
    let frame = meta_frame();
    let raw = encode(&frame, Some(KEY), Some(IV)).unwrap();
    assert!(decode(&raw, Some(IV), Some("someone-else")).is_err());
}

#[test]
fn test_encrypted_without_key_fails() {
    let frame = meta_frame();
    let raw = encode(&frame, Some(KEY), Some(IV)).unwrap();
    assert!(decode(&raw, None, None).is_err());
}

#[test]
fn test_bad_iv_length() {
    let frame = meta_frame();
    let raw = encode(&frame, Some(KEY), None).unwrap();
    assert!(matches!(
        decode(&raw, Some("short"), Some(KEY)),
        Err(DecodeError::DecryptionFailed(_))
    ));
}

#[test]
fn test_surrounding_whitespace_ignored() {
    let frame = common::room_with_pillar(1, 1);
    let raw = common::raw(&frame);
    let wrapped = format!("  {}\n", raw);
    assert_eq!(decode(&wrapped, None, None).unwrap().raw_bitmap, frame.raw_bitmap);
}

#[test]
fn test_garbage_is_malformed() {
    assert!(matches!(
        decode("not a frame at all", None, None),
        Err(DecodeError::Malformed(_))
    ));
}
