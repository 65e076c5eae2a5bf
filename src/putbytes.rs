//! Chunked binary upload ("put bytes")
//!
//! Large binaries (apps, resource packs, firmware images) are pushed
//! to the watch through a five-phase sub-protocol on its own endpoint.
//! Every phase is a correlated request acknowledged by the device:
//!
//! ```text
//! Idle → TokenRequested → Transferring → Committing → Completing → Done
//!                 │              │             │            │
//!                 └──────────────┴─────────────┴────────────┴──→ Aborted
//! ```
//!
//! The begin ack returns an opaque token scoping the rest of the
//! transfer. Any later failure sends a best-effort abort frame carrying
//! that token; the abort's own outcome never changes the already-failed
//! overall result.

use crate::error::Result;
use crate::protocol::{Endpoint, PutBytesAck, Response, ResponseKind};
use crate::session::Watch;

/// Largest data slice carried by one chunk frame
pub const CHUNK_SIZE: usize = 2000;

// Sub-protocol opcodes (first payload byte)
const OP_BEGIN: u8 = 1;
const OP_CHUNK: u8 = 2;
const OP_COMMIT: u8 = 3;
const OP_ABORT: u8 = 4;
const OP_COMPLETE: u8 = 5;

/// What kind of binary a transfer carries
///
/// The watch files the upload accordingly (firmware staging area,
/// app bank slot, resource bank).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferKind {
    Firmware = 1,
    Recovery = 2,
    SystemResources = 3,
    Resources = 4,
    Binary = 5,
}

/// Transfer progress through the sub-protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferState {
    Idle,
    TokenRequested,
    Transferring,
    Committing,
    Completing,
    Done,
    Aborted,
}

/// One upload in progress
struct Transfer<'w> {
    watch: &'w Watch,
    state: TransferState,
}

impl Watch {
    /// Upload a binary to the watch
    ///
    /// Returns `Ok(true)` only if the begin handshake, every chunk,
    /// the checksum commit, and the completion were all acknowledged,
    /// in that order. A rejected phase aborts the transfer and yields
    /// `Ok(false)`; `Err` is reserved for programming/validation
    /// failures.
    pub fn upload(&self, kind: TransferKind, bank_index: u8, data: &[u8]) -> Result<bool> {
        Transfer {
            watch: self,
            state: TransferState::Idle,
        }
        .run(kind, bank_index, data)
    }
}

impl Transfer<'_> {
    fn run(mut self, kind: TransferKind, bank_index: u8, data: &[u8]) -> Result<bool> {
        // Phase 1: request a transfer token
        self.state = TransferState::TokenRequested;
        let mut begin = Vec::with_capacity(7);
        begin.push(OP_BEGIN);
        begin.extend_from_slice(&(data.len() as u32).to_be_bytes());
        begin.push(kind as u8);
        begin.push(bank_index);

        let ack = self.ack_request(&begin)?;
        if !ack.success {
            // No token was ever issued, so there is nothing to abort
            tracing::warn!(
                "transfer begin rejected: {}",
                ack.error.as_deref().unwrap_or("no ack")
            );
            self.state = TransferState::Aborted;
            return Ok(false);
        }
        let token = ack.token;
        tracing::debug!(
            "transfer started: {:?}, {} bytes to bank {}",
            kind,
            data.len(),
            bank_index
        );

        // Phase 2: stream the data in acknowledged chunks.
        // `chunks` never yields an empty slice, so an exact multiple of
        // CHUNK_SIZE produces exactly len/CHUNK_SIZE sends.
        self.state = TransferState::Transferring;
        for chunk in data.chunks(CHUNK_SIZE) {
            let mut frame = Vec::with_capacity(1 + token.len() + 4 + chunk.len());
            frame.push(OP_CHUNK);
            frame.extend_from_slice(&token);
            frame.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
            frame.extend_from_slice(chunk);

            let ack = self.ack_request(&frame)?;
            if !ack.success {
                return self.abort(&token, "chunk rejected");
            }
        }

        // Phase 3: commit with the checksum of the entire binary
        self.state = TransferState::Committing;
        let crc = crate::crc::checksum(data);
        let mut commit = Vec::with_capacity(1 + token.len() + 4);
        commit.push(OP_COMMIT);
        commit.extend_from_slice(&token);
        commit.extend_from_slice(&crc.to_be_bytes());

        let ack = self.ack_request(&commit)?;
        if !ack.success {
            return self.abort(&token, "commit rejected");
        }

        // Phase 4: complete
        self.state = TransferState::Completing;
        let mut complete = Vec::with_capacity(1 + token.len());
        complete.push(OP_COMPLETE);
        complete.extend_from_slice(&token);

        let ack = self.ack_request(&complete)?;
        if !ack.success {
            return self.abort(&token, "completion rejected");
        }

        self.state = TransferState::Done;
        tracing::debug!("transfer committed, crc 0x{:08X}", crc);
        Ok(true)
    }

    /// One acknowledged exchange on the transfer endpoint
    fn ack_request(&self, payload: &[u8]) -> Result<PutBytesAck> {
        match self
            .watch
            .request_raw(Endpoint::PutBytes, payload, ResponseKind::PutBytesAck)?
        {
            Response::PutBytesAck(ack) => Ok(ack),
            other => Ok(PutBytesAck {
                success: false,
                error: Some(format!("unexpected response variant {:?}", other.kind())),
                token: Vec::new(),
            }),
        }
    }

    /// Notify the watch the transfer is dead; the notification itself
    /// is fire-and-forget and its outcome is ignored.
    fn abort(mut self, token: &[u8], reason: &str) -> Result<bool> {
        tracing::warn!("transfer aborted during {:?}: {}", self.state, reason);
        self.state = TransferState::Aborted;

        let mut frame = Vec::with_capacity(1 + token.len());
        frame.push(OP_ABORT);
        frame.extend_from_slice(token);
        let _ = self.watch.send_raw(Endpoint::PutBytes, &frame);

        Ok(false)
    }
}
