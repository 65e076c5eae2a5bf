//! # WristLink
//!
//! A client for the watch's binary serial protocol:
//! - Frame reassembly over an arbitrarily-chunked byte transport
//! - Single-outstanding-transaction request/response correlation
//! - Chunked, checksummed binary uploads with abort semantics
//! - App/firmware bundle loading and install workflows
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Watch (session)                          │
//! │        connect / commands / install workflows                │
//! └──────────┬───────────────────────────────┬──────────────────┘
//!            │                               │
//! ┌──────────▼──────────┐          ┌─────────▼─────────┐
//! │ TransactionManager  │          │   PutBytes upload  │
//! │ (one pending slot,  │          │ (begin → chunks →  │
//! │  listener fan-out)  │          │  commit → complete)│
//! └──────────┬──────────┘          └─────────┬─────────┘
//!            │                               │
//! ┌──────────▼───────────────────────────────▼──────────────────┐
//! │                FrameCodec  ⇄  Transport                      │
//! │     [len][endpoint][payload]  over a duplex byte channel     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`bundle`] reader is independent of the session: it parses an
//! installable archive (manifest + binaries + embedded metadata
//! record) that the install workflows then push through the upload
//! engine.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod crc;
pub mod record;
pub mod protocol;
pub mod transaction;
pub mod transport;
pub mod putbytes;
pub mod session;
pub mod bundle;

mod install;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use bundle::{Bundle, BundleKind};
pub use config::Config;
pub use error::{LinkError, Result};
pub use install::ProgressFn;
pub use putbytes::TransferKind;
pub use session::Watch;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of wristlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
