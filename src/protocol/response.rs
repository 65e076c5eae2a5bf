//! Inbound response decoding
//!
//! Every message the watch can send is declared once in a static
//! registry: endpoint id, optional first-payload-byte discriminator,
//! and a decode function. The dispatcher scans the table in
//! declaration order and decodes with the first descriptor that
//! accepts — no runtime type discovery.
//!
//! Every decoded variant carries `success` + `error`; a malformed
//! payload decodes to a failed value of the same variant rather than
//! raising, so callers branch uniformly on `success`.

use super::endpoint::Endpoint;
use super::types::{
    AppBank, AppEntry, FirmwareVersion, InstallResult, LogMessage, MediaAction,
};
use crate::error::{LinkError, Result};
use crate::record::{DecodeRecord, RecordReader};

// =============================================================================
// Response Kinds
// =============================================================================

/// Discriminant for the response variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    PhoneVersion,
    Ping,
    Time,
    FirmwareVersion,
    AppBank,
    AppInstallResult,
    PutBytesAck,
    SystemMessage,
    MusicControl,
    Log,
}

// =============================================================================
// Response Variants
// =============================================================================

/// The watch's identification request, sent unconditionally the moment
/// a transport connects. The payload carries no information we use;
/// receipt is the signal to reply with our own version frame.
#[derive(Debug, Clone, Default)]
pub struct PhoneVersionRequest {
    pub success: bool,
    pub error: Option<String>,
}

/// Echo reply
#[derive(Debug, Clone, Default)]
pub struct PingResponse {
    pub success: bool,
    pub error: Option<String>,
    pub cookie: u32,
}

/// Current watch time
#[derive(Debug, Clone, Default)]
pub struct TimeResponse {
    pub success: bool,
    pub error: Option<String>,
    pub time: u32,
}

/// Main + recovery firmware version records
#[derive(Debug, Clone, Default)]
pub struct FirmwareVersionResponse {
    pub success: bool,
    pub error: Option<String>,
    pub main: FirmwareVersion,
    pub recovery: FirmwareVersion,
}

/// App bank listing
#[derive(Debug, Clone, Default)]
pub struct AppBankResponse {
    pub success: bool,
    pub error: Option<String>,
    pub bank: AppBank,
}

/// Result of a remove/add operation
#[derive(Debug, Clone, Default)]
pub struct AppInstallResponse {
    pub success: bool,
    pub error: Option<String>,
    pub result: Option<InstallResult>,
}

/// Acknowledgement for one upload phase
#[derive(Debug, Clone, Default)]
pub struct PutBytesAck {
    pub success: bool,
    pub error: Option<String>,
    /// Transfer token scoping the rest of the upload; only present on
    /// the begin ack
    pub token: Vec<u8>,
}

/// Acknowledgement on the system message endpoint
#[derive(Debug, Clone, Default)]
pub struct SystemMessageResponse {
    pub success: bool,
    pub error: Option<String>,
    pub command: u8,
}

/// Media key event from the watch's music UI
#[derive(Debug, Clone, Default)]
pub struct MusicControlResponse {
    pub success: bool,
    pub error: Option<String>,
    pub action: Option<MediaAction>,
}

/// Log record pushed by the watch
#[derive(Debug, Clone, Default)]
pub struct LogResponse {
    pub success: bool,
    pub error: Option<String>,
    pub log: LogMessage,
}

/// A decoded inbound message
#[derive(Debug, Clone)]
pub enum Response {
    PhoneVersion(PhoneVersionRequest),
    Ping(PingResponse),
    Time(TimeResponse),
    FirmwareVersion(FirmwareVersionResponse),
    AppBank(AppBankResponse),
    AppInstallResult(AppInstallResponse),
    PutBytesAck(PutBytesAck),
    SystemMessage(SystemMessageResponse),
    MusicControl(MusicControlResponse),
    Log(LogResponse),
}

impl Response {
    /// The variant discriminant
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::PhoneVersion(_) => ResponseKind::PhoneVersion,
            Response::Ping(_) => ResponseKind::Ping,
            Response::Time(_) => ResponseKind::Time,
            Response::FirmwareVersion(_) => ResponseKind::FirmwareVersion,
            Response::AppBank(_) => ResponseKind::AppBank,
            Response::AppInstallResult(_) => ResponseKind::AppInstallResult,
            Response::PutBytesAck(_) => ResponseKind::PutBytesAck,
            Response::SystemMessage(_) => ResponseKind::SystemMessage,
            Response::MusicControl(_) => ResponseKind::MusicControl,
            Response::Log(_) => ResponseKind::Log,
        }
    }

    /// Whether the message decoded (and, where applicable, acked)
    /// successfully
    pub fn success(&self) -> bool {
        match self {
            Response::PhoneVersion(r) => r.success,
            Response::Ping(r) => r.success,
            Response::Time(r) => r.success,
            Response::FirmwareVersion(r) => r.success,
            Response::AppBank(r) => r.success,
            Response::AppInstallResult(r) => r.success,
            Response::PutBytesAck(r) => r.success,
            Response::SystemMessage(r) => r.success,
            Response::MusicControl(r) => r.success,
            Response::Log(r) => r.success,
        }
    }

    /// Error message for failed responses
    pub fn error(&self) -> Option<&str> {
        let error = match self {
            Response::PhoneVersion(r) => &r.error,
            Response::Ping(r) => &r.error,
            Response::Time(r) => &r.error,
            Response::FirmwareVersion(r) => &r.error,
            Response::AppBank(r) => &r.error,
            Response::AppInstallResult(r) => &r.error,
            Response::PutBytesAck(r) => &r.error,
            Response::SystemMessage(r) => &r.error,
            Response::MusicControl(r) => &r.error,
            Response::Log(r) => &r.error,
        };
        error.as_deref()
    }

    /// Synthesize a failed response of the given kind
    ///
    /// Used for timeouts and for device-reported errors that preempt a
    /// pending transaction.
    pub fn failed(kind: ResponseKind, message: impl Into<String>) -> Response {
        let error = Some(message.into());
        match kind {
            ResponseKind::PhoneVersion => Response::PhoneVersion(PhoneVersionRequest {
                success: false,
                error,
            }),
            ResponseKind::Ping => Response::Ping(PingResponse {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::Time => Response::Time(TimeResponse {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::FirmwareVersion => {
                Response::FirmwareVersion(FirmwareVersionResponse {
                    success: false,
                    error,
                    ..Default::default()
                })
            }
            ResponseKind::AppBank => Response::AppBank(AppBankResponse {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::AppInstallResult => Response::AppInstallResult(AppInstallResponse {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::PutBytesAck => Response::PutBytesAck(PutBytesAck {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::SystemMessage => Response::SystemMessage(SystemMessageResponse {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::MusicControl => Response::MusicControl(MusicControlResponse {
                success: false,
                error,
                ..Default::default()
            }),
            ResponseKind::Log => Response::Log(LogResponse {
                success: false,
                error,
                ..Default::default()
            }),
        }
    }
}

// =============================================================================
// Response Registry
// =============================================================================

/// One entry in the static response table
pub struct ResponseDescriptor {
    /// Endpoint the message arrives on
    pub endpoint: Endpoint,

    /// First-payload-byte discriminator, for endpoints that multiplex
    /// several response shapes
    pub discriminator: Option<u8>,

    /// Variant this descriptor decodes to
    pub kind: ResponseKind,

    /// Payload decoder
    decode: fn(&[u8]) -> Response,
}

impl ResponseDescriptor {
    /// Whether this descriptor accepts the given frame
    fn accepts(&self, endpoint: u16, payload: &[u8]) -> bool {
        if self.endpoint.raw() != endpoint {
            return false;
        }
        match self.discriminator {
            Some(first) => payload.first() == Some(&first),
            None => true,
        }
    }

    /// Decode the payload into a typed response
    pub fn decode(&self, payload: &[u8]) -> Response {
        (self.decode)(payload)
    }
}

/// All response shapes this client understands
pub static REGISTRY: &[ResponseDescriptor] = &[
    ResponseDescriptor {
        endpoint: Endpoint::PhoneVersion,
        discriminator: None,
        kind: ResponseKind::PhoneVersion,
        decode: decode_phone_version,
    },
    ResponseDescriptor {
        endpoint: Endpoint::Ping,
        discriminator: None,
        kind: ResponseKind::Ping,
        decode: decode_ping,
    },
    ResponseDescriptor {
        endpoint: Endpoint::Time,
        discriminator: None,
        kind: ResponseKind::Time,
        decode: decode_time,
    },
    ResponseDescriptor {
        endpoint: Endpoint::FirmwareVersion,
        discriminator: None,
        kind: ResponseKind::FirmwareVersion,
        decode: decode_firmware_version,
    },
    ResponseDescriptor {
        endpoint: Endpoint::AppManager,
        discriminator: Some(1),
        kind: ResponseKind::AppBank,
        decode: decode_app_bank,
    },
    ResponseDescriptor {
        endpoint: Endpoint::AppManager,
        discriminator: Some(7),
        kind: ResponseKind::AppInstallResult,
        decode: decode_install_result,
    },
    ResponseDescriptor {
        endpoint: Endpoint::PutBytes,
        discriminator: None,
        kind: ResponseKind::PutBytesAck,
        decode: decode_put_bytes_ack,
    },
    ResponseDescriptor {
        endpoint: Endpoint::SystemMessage,
        discriminator: None,
        kind: ResponseKind::SystemMessage,
        decode: decode_system_message,
    },
    ResponseDescriptor {
        endpoint: Endpoint::MusicControl,
        discriminator: None,
        kind: ResponseKind::MusicControl,
        decode: decode_music_control,
    },
    ResponseDescriptor {
        endpoint: Endpoint::Logs,
        discriminator: None,
        kind: ResponseKind::Log,
        decode: decode_log,
    },
];

/// Find the first descriptor accepting this frame
pub fn match_response(endpoint: u16, payload: &[u8]) -> Option<&'static ResponseDescriptor> {
    REGISTRY.iter().find(|d| d.accepts(endpoint, payload))
}

// =============================================================================
// Decoders
// =============================================================================

/// Run a fallible decode, turning failure into a failed variant value
fn or_failed(kind: ResponseKind, result: Result<Response>) -> Response {
    match result {
        Ok(response) => response,
        Err(e) => Response::failed(kind, e.to_string()),
    }
}

fn decode_phone_version(_payload: &[u8]) -> Response {
    // The identification request carries negotiation data we do not
    // interpret; arrival is all that matters.
    Response::PhoneVersion(PhoneVersionRequest {
        success: true,
        error: None,
    })
}

fn decode_ping(payload: &[u8]) -> Response {
    or_failed(ResponseKind::Ping, (|| {
        let mut reader = RecordReader::new(payload);
        let _opcode = reader.read_u8()?;
        let cookie = reader.read_u32()?;
        Ok(Response::Ping(PingResponse {
            success: true,
            error: None,
            cookie,
        }))
    })())
}

fn decode_time(payload: &[u8]) -> Response {
    or_failed(ResponseKind::Time, (|| {
        let mut reader = RecordReader::new(payload);
        let _opcode = reader.read_u8()?;
        let time = reader.read_u32()?;
        Ok(Response::Time(TimeResponse {
            success: true,
            error: None,
            time,
        }))
    })())
}

fn decode_firmware_version(payload: &[u8]) -> Response {
    or_failed(ResponseKind::FirmwareVersion, (|| {
        let mut reader = RecordReader::new(payload);
        let _opcode = reader.read_u8()?;
        let main = FirmwareVersion::decode(&mut reader)?;
        let recovery = FirmwareVersion::decode(&mut reader)?;
        Ok(Response::FirmwareVersion(FirmwareVersionResponse {
            success: true,
            error: None,
            main,
            recovery,
        }))
    })())
}

fn decode_app_bank(payload: &[u8]) -> Response {
    or_failed(ResponseKind::AppBank, (|| {
        let mut reader = RecordReader::new(payload);
        let _opcode = reader.read_u8()?;
        let slot_count = reader.read_u32()?;
        let entry_count = reader.read_u32()? as usize;

        let mut apps = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            apps.push(AppEntry::decode(&mut reader)?);
        }

        Ok(Response::AppBank(AppBankResponse {
            success: true,
            error: None,
            bank: AppBank { slot_count, apps },
        }))
    })())
}

fn decode_install_result(payload: &[u8]) -> Response {
    or_failed(ResponseKind::AppInstallResult, (|| {
        let mut reader = RecordReader::new(payload);
        let _opcode = reader.read_u8()?;
        let raw = reader.read_u32()?;
        let result = InstallResult::from_raw(raw).ok_or_else(|| {
            LinkError::Protocol(format!("unknown install result {raw}"))
        })?;
        Ok(Response::AppInstallResult(AppInstallResponse {
            success: true,
            error: None,
            result: Some(result),
        }))
    })())
}

fn decode_put_bytes_ack(payload: &[u8]) -> Response {
    let Some((&status, token)) = payload.split_first() else {
        return Response::failed(ResponseKind::PutBytesAck, "empty transfer ack");
    };

    if status == 1 {
        Response::PutBytesAck(PutBytesAck {
            success: true,
            error: None,
            token: token.to_vec(),
        })
    } else {
        Response::PutBytesAck(PutBytesAck {
            success: false,
            error: Some(format!("transfer rejected by watch (status {status})")),
            token: Vec::new(),
        })
    }
}

fn decode_system_message(payload: &[u8]) -> Response {
    or_failed(ResponseKind::SystemMessage, (|| {
        let mut reader = RecordReader::new(payload);
        let _marker = reader.read_u8()?;
        let command = reader.read_u8()?;
        Ok(Response::SystemMessage(SystemMessageResponse {
            success: true,
            error: None,
            command,
        }))
    })())
}

fn decode_music_control(payload: &[u8]) -> Response {
    or_failed(ResponseKind::MusicControl, (|| {
        let mut reader = RecordReader::new(payload);
        let raw = reader.read_u8()?;
        let action = MediaAction::from_raw(raw).ok_or_else(|| {
            LinkError::Protocol(format!("unknown media action {raw}"))
        })?;
        Ok(Response::MusicControl(MusicControlResponse {
            success: true,
            error: None,
            action: Some(action),
        }))
    })())
}

fn decode_log(payload: &[u8]) -> Response {
    or_failed(ResponseKind::Log, (|| {
        let log = LogMessage::parse(payload)?;
        Ok(Response::Log(LogResponse {
            success: true,
            error: None,
            log,
        }))
    })())
}
