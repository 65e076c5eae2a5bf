//! Endpoint identifiers
//!
//! Every frame on the wire is addressed to a fixed numeric endpoint.
//! The set is closed and versioned by the device firmware; frames for
//! endpoints we do not know are simply not dispatched.

/// Message endpoints understood by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Endpoint {
    Time = 11,
    FirmwareVersion = 16,
    PhoneVersion = 17,
    SystemMessage = 18,
    MusicControl = 32,
    Logs = 2000,
    Ping = 2001,
    Notification = 3000,
    AppManager = 6000,
    PutBytes = 0xBEEF,
}

impl Endpoint {
    /// The on-wire endpoint id
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Look up a known endpoint by its wire id
    pub fn from_raw(raw: u16) -> Option<Endpoint> {
        match raw {
            11 => Some(Endpoint::Time),
            16 => Some(Endpoint::FirmwareVersion),
            17 => Some(Endpoint::PhoneVersion),
            18 => Some(Endpoint::SystemMessage),
            32 => Some(Endpoint::MusicControl),
            2000 => Some(Endpoint::Logs),
            2001 => Some(Endpoint::Ping),
            3000 => Some(Endpoint::Notification),
            6000 => Some(Endpoint::AppManager),
            0xBEEF => Some(Endpoint::PutBytes),
            _ => None,
        }
    }
}
