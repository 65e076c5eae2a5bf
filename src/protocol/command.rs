//! Outbound command encoding
//!
//! Represents requests and one-way notifications sent to the watch.
//! Each command knows its endpoint and encodes its own payload; the
//! frame header is added by [`super::frame::FrameCodec::encode`].

use uuid::Uuid;

use super::endpoint::Endpoint;
use super::types::SystemCommand;
use crate::record::put_pascal_str;

// App manager operation codes (first payload byte)
const APP_MANAGER_LIST: u8 = 1;
const APP_MANAGER_REMOVE: u8 = 2;
const APP_MANAGER_ADD: u8 = 3;

// Time endpoint operation codes
const TIME_GET: u8 = 0;
const TIME_SET: u8 = 2;

// Notification kinds (first payload byte)
const NOTIFICATION_EMAIL: u8 = 0;
const NOTIFICATION_SMS: u8 = 1;

// Music control: phone pushes now-playing metadata with this opcode
const MUSIC_NOW_PLAYING: u8 = 16;

/// A command to send to the watch
#[derive(Debug, Clone)]
pub enum Command {
    /// Echo request; the watch replies with the same cookie
    Ping { cookie: u32 },

    /// Ask for the watch's current time
    GetTime,

    /// Set the watch's clock (fire-and-forget)
    SetTime { unix_time: u32 },

    /// Ask for main + recovery firmware version records
    GetFirmwareVersion,

    /// Reply to the watch's identification request with our
    /// capabilities
    PhoneVersion { session_caps: u32, remote_caps: u32 },

    /// List the app bank
    ListApps,

    /// Remove an installed app by id and slot index
    RemoveApp { id: u32, index: u32 },

    /// Remove an installed app by its UUID
    RemoveAppByUuid { uuid: Uuid },

    /// Tell the watch an app was uploaded to the given slot
    /// (fire-and-forget)
    AddApp { index: u32 },

    /// System message (firmware update lifecycle)
    SystemMessage { command: SystemCommand },

    /// SMS notification banner
    NotifySms { sender: String, body: String, timestamp: u32 },

    /// Email notification banner
    NotifyEmail {
        sender: String,
        subject: String,
        body: String,
        timestamp: u32,
    },

    /// Push now-playing metadata to the music UI (fire-and-forget)
    NowPlaying {
        artist: String,
        album: String,
        track: String,
    },
}

impl Command {
    /// The endpoint this command is addressed to
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Command::Ping { .. } => Endpoint::Ping,
            Command::GetTime | Command::SetTime { .. } => Endpoint::Time,
            Command::GetFirmwareVersion => Endpoint::FirmwareVersion,
            Command::PhoneVersion { .. } => Endpoint::PhoneVersion,
            Command::ListApps
            | Command::RemoveApp { .. }
            | Command::RemoveAppByUuid { .. }
            | Command::AddApp { .. } => Endpoint::AppManager,
            Command::SystemMessage { .. } => Endpoint::SystemMessage,
            Command::NotifySms { .. } | Command::NotifyEmail { .. } => Endpoint::Notification,
            Command::NowPlaying { .. } => Endpoint::MusicControl,
        }
    }

    /// Encode the command payload
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Ping { cookie } => {
                let mut payload = Vec::with_capacity(5);
                payload.push(0);
                payload.extend_from_slice(&cookie.to_be_bytes());
                payload
            }

            Command::GetTime => vec![TIME_GET],

            Command::SetTime { unix_time } => {
                let mut payload = Vec::with_capacity(5);
                payload.push(TIME_SET);
                payload.extend_from_slice(&unix_time.to_be_bytes());
                payload
            }

            Command::GetFirmwareVersion => vec![0],

            Command::PhoneVersion {
                session_caps,
                remote_caps,
            } => {
                // [1][-1 as u32][session caps][remote caps]
                let mut payload = Vec::with_capacity(13);
                payload.push(1);
                payload.extend_from_slice(&u32::MAX.to_be_bytes());
                payload.extend_from_slice(&session_caps.to_be_bytes());
                payload.extend_from_slice(&remote_caps.to_be_bytes());
                payload
            }

            Command::ListApps => vec![APP_MANAGER_LIST],

            Command::RemoveApp { id, index } => {
                let mut payload = Vec::with_capacity(9);
                payload.push(APP_MANAGER_REMOVE);
                payload.extend_from_slice(&id.to_be_bytes());
                payload.extend_from_slice(&index.to_be_bytes());
                payload
            }

            Command::RemoveAppByUuid { uuid } => {
                let mut payload = Vec::with_capacity(17);
                payload.push(APP_MANAGER_REMOVE);
                payload.extend_from_slice(uuid.as_bytes());
                payload
            }

            Command::AddApp { index } => {
                let mut payload = Vec::with_capacity(5);
                payload.push(APP_MANAGER_ADD);
                payload.extend_from_slice(&index.to_be_bytes());
                payload
            }

            Command::SystemMessage { command } => vec![0, *command as u8],

            Command::NotifySms {
                sender,
                body,
                timestamp,
            } => {
                let mut payload = vec![NOTIFICATION_SMS];
                put_pascal_str(&mut payload, sender);
                put_pascal_str(&mut payload, body);
                put_pascal_str(&mut payload, &timestamp.to_string());
                payload
            }

            Command::NotifyEmail {
                sender,
                subject,
                body,
                timestamp,
            } => {
                let mut payload = vec![NOTIFICATION_EMAIL];
                put_pascal_str(&mut payload, sender);
                put_pascal_str(&mut payload, body);
                put_pascal_str(&mut payload, &timestamp.to_string());
                put_pascal_str(&mut payload, subject);
                payload
            }

            Command::NowPlaying {
                artist,
                album,
                track,
            } => {
                let mut payload = vec![MUSIC_NOW_PLAYING];
                put_pascal_str(&mut payload, artist);
                put_pascal_str(&mut payload, album);
                put_pascal_str(&mut payload, track);
                payload
            }
        }
    }
}
