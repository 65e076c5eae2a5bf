//! Bundle Tests
//!
//! Archive loading: the all-or-nothing contract, the embedded metadata
//! record, and integrity checking.

mod common;

use std::io::Cursor;
use std::io::Write as _;

use common::{app_binary, build_app_bundle, build_archive, build_firmware_bundle};
use wristlink::{Bundle, BundleKind, LinkError};

const UUID: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
    0x0F,
];

// =============================================================================
// Application Bundle Tests
// =============================================================================

#[test]
fn test_app_bundle_loads_with_metadata() {
    let binary = app_binary(UUID, 2000);
    let resources = vec![0xEE; 512];
    let archive = build_app_bundle(&binary, Some(&resources));

    let bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    assert_eq!(bundle.kind, BundleKind::Application);
    assert_eq!(bundle.binary, binary);
    assert_eq!(bundle.resources.as_deref(), Some(resources.as_slice()));

    // The metadata record came from the documented offset in the binary
    let metadata = bundle.app_metadata.as_ref().expect("metadata decoded");
    assert_eq!(
        metadata.uuid.to_string(),
        "00010203-0405-0607-0809-0a0b0c0d0e0f"
    );
    assert_eq!(metadata.name, "Test App");
    assert_eq!(metadata.company, "Test Vendor");
    assert_eq!(metadata.header, "PBLAPP");
}

#[test]
fn test_app_bundle_without_resources() {
    let binary = app_binary(UUID, 100);
    let archive = build_app_bundle(&binary, None);

    let bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    assert!(bundle.resources.is_none());
}

#[test]
fn test_zero_size_resources_are_skipped() {
    // The manifest declares a resources block with size 0 and the
    // archive has no matching entry; the loader must not look for one
    let binary = app_binary(UUID, 100);
    let manifest = serde_json::json!({
        "manifestVersion": 1,
        "generatedAt": 1_400_000_000u64,
        "generatedBy": "testbench",
        "type": "application",
        "application": {
            "name": "watch-app.bin",
            "crc": wristlink::crc::checksum(&binary),
            "size": binary.len(),
        },
        "resources": { "name": "missing.pbpack", "crc": 0, "size": 0 },
    });
    let manifest = serde_json::to_vec(&manifest).unwrap();
    let archive = build_archive(&[("manifest.json", &manifest), ("watch-app.bin", &binary)]);

    let bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    assert!(bundle.resources.is_none());
}

#[test]
fn test_truncated_app_binary_fails_load() {
    let archive = build_app_bundle(&[1, 2, 3], None);
    match Bundle::from_reader(Cursor::new(archive)) {
        Err(LinkError::Record(_)) => {}
        other => panic!("expected Record error, got {other:?}"),
    }
}

// =============================================================================
// Firmware Bundle Tests
// =============================================================================

#[test]
fn test_firmware_bundle_loads_without_metadata() {
    let image = vec![0xF7; 3000];
    let archive = build_firmware_bundle(&image, false, None);

    let bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    assert_eq!(bundle.kind, BundleKind::Firmware);
    assert_eq!(bundle.binary, image);
    assert!(bundle.app_metadata.is_none());
    assert!(!bundle.is_recovery_firmware());
}

#[test]
fn test_recovery_firmware_is_flagged() {
    let archive = build_firmware_bundle(&[0u8; 64], true, None);
    let bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    assert!(bundle.is_recovery_firmware());
}

// =============================================================================
// Failure Mode Tests
// =============================================================================

#[test]
fn test_missing_manifest_fails_whole_load() {
    let archive = build_archive(&[("watch-app.bin", &[0u8; 200][..])]);
    match Bundle::from_reader(Cursor::new(archive)) {
        Err(LinkError::Bundle(message)) => assert!(message.contains("manifest.json")),
        other => panic!("expected Bundle error, got {other:?}"),
    }
}

#[test]
fn test_missing_named_entry_fails_whole_load() {
    // Manifest names a binary the archive does not contain
    let manifest = serde_json::json!({
        "manifestVersion": 1,
        "generatedAt": 1_400_000_000u64,
        "type": "application",
        "application": { "name": "gone.bin", "crc": 0, "size": 4 },
    });
    let manifest = serde_json::to_vec(&manifest).unwrap();
    let archive = build_archive(&[("manifest.json", &manifest)]);

    match Bundle::from_reader(Cursor::new(archive)) {
        Err(LinkError::Bundle(message)) => assert!(message.contains("gone.bin")),
        other => panic!("expected Bundle error, got {other:?}"),
    }
}

#[test]
fn test_unknown_bundle_type_fails() {
    let manifest = serde_json::json!({
        "manifestVersion": 1,
        "generatedAt": 1_400_000_000u64,
        "type": "screensaver",
    });
    let manifest = serde_json::to_vec(&manifest).unwrap();
    let archive = build_archive(&[("manifest.json", &manifest)]);

    match Bundle::from_reader(Cursor::new(archive)) {
        Err(LinkError::Bundle(message)) => assert!(message.contains("screensaver")),
        other => panic!("expected Bundle error, got {other:?}"),
    }
}

// =============================================================================
// Integrity Tests
// =============================================================================

#[test]
fn test_integrity_check_accepts_clean_bundle() {
    let binary = app_binary(UUID, 999);
    let resources = vec![0xAB; 300];
    let archive = build_app_bundle(&binary, Some(&resources));

    let bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    bundle.check_integrity().unwrap();
}

#[test]
fn test_integrity_check_catches_corruption() {
    let binary = app_binary(UUID, 999);
    let archive = build_app_bundle(&binary, None);

    let mut bundle = Bundle::from_reader(Cursor::new(archive)).unwrap();
    bundle.binary[200] ^= 0xFF;

    match bundle.check_integrity() {
        Err(LinkError::Bundle(message)) => assert!(message.contains("checksum")),
        other => panic!("expected checksum mismatch, got {other:?}"),
    }
}

// =============================================================================
// File Loading Tests
// =============================================================================

#[test]
fn test_open_from_disk() {
    let binary = app_binary(UUID, 500);
    let archive = build_app_bundle(&binary, None);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test-app.pbw");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(&archive).unwrap();
    drop(file);

    let bundle = Bundle::open(&path).unwrap();
    assert_eq!(bundle.kind, BundleKind::Application);
    assert_eq!(bundle.binary.len(), binary.len());
}
