//! Protocol Module
//!
//! Defines the wire protocol spoken with the watch.
//!
//! ## Frame Format
//!
//! ```text
//! ┌────────────────┬────────────────────┬─────────────────┐
//! │ Length (2, BE) │ Endpoint id (2, BE)│ Payload         │
//! └────────────────┴────────────────────┴─────────────────┘
//! ```
//!
//! Outbound payloads are capped at 2048 bytes. Inbound frames are
//! bounded only by the header length field.
//!
//! ## Layers
//!
//! - [`frame`] — byte stream ⇄ `(endpoint, payload)` frames
//! - [`command`] — outbound payload encoding
//! - [`response`] — inbound payload decoding via a static registry
//! - [`types`] — packed records shared by both directions

mod command;
mod endpoint;
mod frame;
mod response;
mod types;

pub use command::Command;
pub use endpoint::Endpoint;
pub use frame::{Frame, FrameCodec, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use response::{
    match_response, AppBankResponse, AppInstallResponse, FirmwareVersionResponse, LogResponse,
    MusicControlResponse, PhoneVersionRequest, PingResponse, PutBytesAck, Response,
    ResponseDescriptor, ResponseKind, SystemMessageResponse, TimeResponse, REGISTRY,
};
pub use types::{
    AppBank, AppEntry, FirmwareVersion, InstallResult, LogMessage, MediaAction, SystemCommand,
};
