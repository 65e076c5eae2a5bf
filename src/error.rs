//! Error types for wristlink
//!
//! Provides a unified error type for all operations.
//!
//! Expected negative outcomes on the wire (timeout, device-reported
//! error, malformed ack) are not errors: they surface as a typed
//! response with `success == false` so workflows can branch uniformly.
//! `LinkError` is reserved for validation failures, I/O faults, bundle
//! format faults, and programming-invariant violations.

use thiserror::Error;

/// Result type alias using LinkError
pub type Result<T> = std::result::Result<T, LinkError>;

/// Unified error type for wristlink operations
#[derive(Debug, Error)]
pub enum LinkError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Payload too large: {0} bytes (max {1})")]
    PayloadTooLarge(usize, usize),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Correlation Errors
    // -------------------------------------------------------------------------
    #[error("A transaction is already pending on this session")]
    TransactionPending,

    #[error("Request timed out")]
    Timeout,

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Session is not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Install Workflow Errors
    // -------------------------------------------------------------------------
    #[error("Install failed: {0}")]
    Install(String),

    // -------------------------------------------------------------------------
    // Bundle / Format Errors
    // -------------------------------------------------------------------------
    #[error("Bundle error: {0}")]
    Bundle(String),

    #[error("Record error: {0}")]
    Record(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}
