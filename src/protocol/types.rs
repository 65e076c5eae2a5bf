//! Shared protocol record types
//!
//! Packed records that appear inside frame payloads, decoded with the
//! fixed-layout cursor from [`crate::record`].

use crate::error::Result;
use crate::record::{DecodeRecord, RecordReader};

// =============================================================================
// Firmware Version
// =============================================================================

/// One firmware image descriptor (main or recovery)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Build timestamp (unix seconds)
    pub timestamp: u32,

    /// Human-readable version tag, e.g. "v1.12.1"
    pub version: String,

    /// Short commit hash of the build
    pub commit: String,

    /// Whether this image is the recovery firmware
    pub is_recovery: bool,

    /// Hardware platform id
    pub hardware_platform: u8,

    /// Version of this record layout
    pub metadata_version: u8,
}

impl DecodeRecord for FirmwareVersion {
    // timestamp(4) + version(32) + commit(8) + is_recovery(1)
    // + hardware_platform(1) + metadata_version(1)
    const SIZE: usize = 47;

    fn decode(reader: &mut RecordReader<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: reader.read_u32()?,
            version: reader.read_fixed_str(32)?,
            commit: reader.read_fixed_str(8)?,
            is_recovery: reader.read_u8()? != 0,
            hardware_platform: reader.read_u8()?,
            metadata_version: reader.read_u8()?,
        })
    }
}

// =============================================================================
// App Bank
// =============================================================================

/// The watch's fixed-capacity table of installed applications
///
/// Rebuilt from every listing response; never cached.
#[derive(Debug, Clone, Default)]
pub struct AppBank {
    /// Number of installable slots on the watch
    pub slot_count: u32,

    /// Installed applications, in listing order
    pub apps: Vec<AppEntry>,
}

/// One installed application in the bank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppEntry {
    /// Application id assigned by the watch
    pub id: u32,

    /// Slot index the app is installed in
    pub index: u32,

    /// Application name
    pub name: String,

    /// Vendor name
    pub company: String,

    /// Application flags
    pub flags: u32,

    /// Major version
    pub major_version: u8,

    /// Minor version
    pub minor_version: u8,
}

impl DecodeRecord for AppEntry {
    // id(4) + index(4) + name(32) + company(32) + flags(4) + major(1) + minor(1)
    const SIZE: usize = 78;

    fn decode(reader: &mut RecordReader<'_>) -> Result<Self> {
        Ok(Self {
            id: reader.read_u32()?,
            index: reader.read_u32()?,
            name: reader.read_fixed_str(32)?,
            company: reader.read_fixed_str(32)?,
            flags: reader.read_u32()?,
            major_version: reader.read_u8()?,
            minor_version: reader.read_u8()?,
        })
    }
}

// =============================================================================
// Install Results
// =============================================================================

/// Outcome reported by the app manager after a remove/add operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum InstallResult {
    /// The slot is available (no app was present)
    Available = 0,

    /// The app was removed
    Removed = 1,

    /// The app was replaced in place
    Updated = 2,
}

impl InstallResult {
    pub fn from_raw(raw: u32) -> Option<InstallResult> {
        match raw {
            0 => Some(InstallResult::Available),
            1 => Some(InstallResult::Removed),
            2 => Some(InstallResult::Updated),
            _ => None,
        }
    }
}

// =============================================================================
// Log Messages
// =============================================================================

/// A log record pushed by the watch on the logs endpoint
#[derive(Debug, Clone, Default)]
pub struct LogMessage {
    /// Event timestamp (unix seconds)
    pub timestamp: u32,

    /// Severity level as reported by the firmware
    pub level: u8,

    /// Source line number
    pub line: u16,

    /// Source filename
    pub filename: String,

    /// Log text
    pub message: String,
}

impl LogMessage {
    /// Decode a log payload: a fixed header followed by the message text
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = RecordReader::new(payload);
        let timestamp = reader.read_u32()?;
        let level = reader.read_u8()?;
        let message_len = reader.read_u8()? as usize;
        let line = reader.read_u16()?;
        let filename = reader.read_fixed_str(16)?;

        let header = 4 + 1 + 1 + 2 + 16;
        let end = (header + message_len).min(payload.len());
        let message = String::from_utf8_lossy(&payload[header..end]).into_owned();

        Ok(Self {
            timestamp,
            level,
            line,
            filename,
            message,
        })
    }
}

// =============================================================================
// Music Control
// =============================================================================

/// Media key events sent by the watch's music UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MediaAction {
    PlayPause = 1,
    Pause = 2,
    Play = 3,
    Next = 4,
    Previous = 5,
    VolumeUp = 6,
    VolumeDown = 7,
    GetNowPlaying = 8,
}

impl MediaAction {
    pub fn from_raw(raw: u8) -> Option<MediaAction> {
        match raw {
            1 => Some(MediaAction::PlayPause),
            2 => Some(MediaAction::Pause),
            3 => Some(MediaAction::Play),
            4 => Some(MediaAction::Next),
            5 => Some(MediaAction::Previous),
            6 => Some(MediaAction::VolumeUp),
            7 => Some(MediaAction::VolumeDown),
            8 => Some(MediaAction::GetNowPlaying),
            _ => None,
        }
    }
}

/// System message commands exchanged on the system endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemCommand {
    FirmwareAvailable = 0,
    FirmwareStart = 1,
    FirmwareComplete = 2,
    FirmwareFail = 3,
    FirmwareUpToDate = 4,
    FirmwareOutOfDate = 5,
}
