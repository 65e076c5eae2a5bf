//! Shared test support
//!
//! A scripted in-memory transport standing in for the watch, plus
//! builders for wire payloads and installable bundles.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use wristlink::protocol::FrameCodec;
use wristlink::transport::Transport;
use wristlink::{Config, Watch};

/// Endpoint ids used raw in tests
pub const EP_TIME: u16 = 11;
pub const EP_FIRMWARE_VERSION: u16 = 16;
pub const EP_PHONE_VERSION: u16 = 17;
pub const EP_SYSTEM_MESSAGE: u16 = 18;
pub const EP_MUSIC_CONTROL: u16 = 32;
pub const EP_LOGS: u16 = 2000;
pub const EP_PING: u16 = 2001;
pub const EP_NOTIFICATION: u16 = 3000;
pub const EP_APP_MANAGER: u16 = 6000;
pub const EP_PUT_BYTES: u16 = 0xBEEF;

/// Encode one raw frame: [len][endpoint][payload], both u16 BE
pub fn encode_frame(endpoint: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(&endpoint.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Scripted reply function: outbound frame in, zero or more reply
/// frames out
pub type Responder = Box<dyn FnMut(u16, &[u8]) -> Vec<(u16, Vec<u8>)> + Send>;

/// In-memory transport driven by a responder script
///
/// On open it pushes the watch's identification request, exactly like
/// the real device does the instant the channel comes up. Every
/// outbound frame is logged and handed to the responder; replies are
/// delivered through the byte channel like received data.
pub struct MockTransport {
    on_open: Vec<(u16, Vec<u8>)>,
    responder: Responder,
    sink: Option<Sender<Vec<u8>>>,
    sent: Arc<Mutex<Vec<(u16, Vec<u8>)>>>,
    codec: FrameCodec,
}

impl MockTransport {
    /// A transport that identifies itself on open and answers with the
    /// given script
    pub fn new(responder: Responder) -> Self {
        Self {
            on_open: vec![(EP_PHONE_VERSION, vec![0])],
            responder,
            sink: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            codec: FrameCodec::new(),
        }
    }

    /// A transport that stays silent on open (handshake timeout tests)
    pub fn silent(responder: Responder) -> Self {
        let mut transport = Self::new(responder);
        transport.on_open.clear();
        transport
    }

    /// Shared log of outbound `(endpoint, payload)` frames
    pub fn sent_log(&self) -> Arc<Mutex<Vec<(u16, Vec<u8>)>>> {
        Arc::clone(&self.sent)
    }
}

impl Transport for MockTransport {
    fn open(&mut self, sink: Sender<Vec<u8>>) -> wristlink::Result<()> {
        for (endpoint, payload) in &self.on_open {
            let _ = sink.send(encode_frame(*endpoint, payload));
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> wristlink::Result<()> {
        self.codec.push(bytes);
        while let Some(frame) = self.codec.next_frame() {
            self.sent.lock().push((frame.endpoint, frame.payload.clone()));

            let replies = (self.responder)(frame.endpoint, &frame.payload);
            if let Some(sink) = &self.sink {
                for (endpoint, payload) in replies {
                    let _ = sink.send(encode_frame(endpoint, &payload));
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> wristlink::Result<()> {
        // Dropping the sender ends the session's dispatch loop
        self.sink = None;
        Ok(())
    }
}

/// Config with test-friendly timeouts
pub fn test_config() -> Config {
    Config::builder()
        .connect_timeout_ms(1_000)
        .response_timeout_ms(1_000)
        .build()
}

/// Build a session over a scripted transport and run the handshake
pub fn connected_watch(responder: Responder) -> (Watch, Arc<Mutex<Vec<(u16, Vec<u8>)>>>) {
    let transport = MockTransport::new(responder);
    let sent = transport.sent_log();
    let watch = Watch::new(Box::new(transport), test_config());
    watch.connect().expect("handshake should succeed");
    (watch, sent)
}

/// A responder that answers nothing
pub fn no_replies() -> Responder {
    Box::new(|_, _| Vec::new())
}

// =============================================================================
// Payload Builders
// =============================================================================

/// A fixed-width NUL-padded string field
pub fn fixed_str(value: &str, width: usize) -> Vec<u8> {
    let mut field = vec![0u8; width];
    let bytes = value.as_bytes();
    field[..bytes.len()].copy_from_slice(bytes);
    field
}

/// One 78-byte app bank entry record
pub fn bank_entry(id: u32, index: u32, name: &str, company: &str) -> Vec<u8> {
    let mut entry = Vec::with_capacity(78);
    entry.extend_from_slice(&id.to_be_bytes());
    entry.extend_from_slice(&index.to_be_bytes());
    entry.extend_from_slice(&fixed_str(name, 32));
    entry.extend_from_slice(&fixed_str(company, 32));
    entry.extend_from_slice(&0u32.to_be_bytes()); // flags
    entry.push(1); // major
    entry.push(0); // minor
    entry
}

/// An app bank listing payload with the given occupied slots
pub fn bank_listing(slot_count: u32, used_indices: &[u32]) -> Vec<u8> {
    let mut payload = vec![1u8];
    payload.extend_from_slice(&slot_count.to_be_bytes());
    payload.extend_from_slice(&(used_indices.len() as u32).to_be_bytes());
    for (i, index) in used_indices.iter().enumerate() {
        payload.extend_from_slice(&bank_entry(100 + i as u32, *index, "app", "vendor"));
    }
    payload
}

/// A 124-byte application metadata record with the given UUID
pub fn app_metadata_record(uuid: [u8; 16], name: &str, company: &str) -> Vec<u8> {
    let mut record = Vec::with_capacity(124);
    record.extend_from_slice(&fixed_str("PBLAPP", 8));
    record.extend_from_slice(&[1, 0]); // struct version
    record.extend_from_slice(&[5, 19]); // sdk version
    record.extend_from_slice(&[1, 0]); // app version
    record.extend_from_slice(&1000u16.to_be_bytes()); // size
    record.extend_from_slice(&0u32.to_be_bytes()); // offset
    record.extend_from_slice(&0u32.to_be_bytes()); // crc
    record.extend_from_slice(&fixed_str(name, 32));
    record.extend_from_slice(&fixed_str(company, 32));
    record.extend_from_slice(&0u32.to_be_bytes()); // icon resource id
    record.extend_from_slice(&0u32.to_be_bytes()); // symbol table
    record.extend_from_slice(&0u32.to_be_bytes()); // flags
    record.extend_from_slice(&0u32.to_be_bytes()); // relocation start
    record.extend_from_slice(&0u32.to_be_bytes()); // relocation count
    record.extend_from_slice(&uuid);
    record
}

/// An app binary: metadata record followed by padding "code"
pub fn app_binary(uuid: [u8; 16], extra: usize) -> Vec<u8> {
    let mut binary = app_metadata_record(uuid, "Test App", "Test Vendor");
    binary.extend(std::iter::repeat(0x5A).take(extra));
    binary
}

// =============================================================================
// Bundle Builders
// =============================================================================

/// Write a zip archive from `(name, contents)` entries
pub fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish archive").into_inner()
}

/// A complete application bundle archive
pub fn build_app_bundle(binary: &[u8], resources: Option<&[u8]>) -> Vec<u8> {
    let resources_entry = resources.map(|data| {
        serde_json::json!({
            "name": "app_resources.pbpack",
            "timestamp": 1_400_000_000u64,
            "crc": wristlink::crc::checksum(data),
            "size": data.len(),
            "friendlyVersion": "1.0",
        })
    });

    let manifest = serde_json::json!({
        "manifestVersion": 1,
        "generatedAt": 1_400_000_000u64,
        "generatedBy": "testbench",
        "type": "application",
        "application": {
            "name": "watch-app.bin",
            "timestamp": 1_400_000_000u64,
            "crc": wristlink::crc::checksum(binary),
            "size": binary.len(),
            "reqFwVer": 2,
        },
        "resources": resources_entry,
    });
    let manifest = serde_json::to_vec(&manifest).expect("encode manifest");

    let mut entries: Vec<(&str, &[u8])> =
        vec![("manifest.json", &manifest), ("watch-app.bin", binary)];
    if let Some(data) = resources {
        entries.push(("app_resources.pbpack", data));
    }
    build_archive(&entries)
}

/// A complete firmware bundle archive
pub fn build_firmware_bundle(image: &[u8], recovery: bool, resources: Option<&[u8]>) -> Vec<u8> {
    let resources_entry = resources.map(|data| {
        serde_json::json!({
            "name": "system_resources.pbpack",
            "timestamp": 1_400_000_000u64,
            "crc": wristlink::crc::checksum(data),
            "size": data.len(),
            "friendlyVersion": "1.0",
        })
    });

    let manifest = serde_json::json!({
        "manifestVersion": 1,
        "generatedAt": 1_400_000_000u64,
        "generatedBy": "testbench",
        "type": "firmware",
        "firmware": {
            "name": "firmware.bin",
            "timestamp": 1_400_000_000u64,
            "crc": wristlink::crc::checksum(image),
            "size": image.len(),
            "hwrev": "ev2_4",
            "type": if recovery { "recovery" } else { "normal" },
        },
        "resources": resources_entry,
    });
    let manifest = serde_json::to_vec(&manifest).expect("encode manifest");

    let mut entries: Vec<(&str, &[u8])> =
        vec![("manifest.json", &manifest), ("firmware.bin", image)];
    if let Some(data) = resources {
        entries.push(("system_resources.pbpack", data));
    }
    build_archive(&entries)
}
