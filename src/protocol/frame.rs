//! Frame codec
//!
//! Turns the transport's arbitrarily-chunked byte stream into discrete
//! `(endpoint, payload)` frames and back.
//!
//! ## Wire Format
//!
//! ```text
//! ┌────────────────┬────────────────────┬─────────────────┐
//! │ Length (2, BE) │ Endpoint id (2, BE)│ Payload         │
//! └────────────────┴────────────────────┴─────────────────┘
//! ```
//!
//! Decoding is a two-state machine: wait for the 4-byte header, then
//! wait for `length` payload bytes, emit, repeat. There is no
//! resynchronization if the stream is corrupted; the transport is
//! trusted to deliver a clean stream, matching the device's own
//! behavior.

use bytes::{Buf, BytesMut};

use super::endpoint::Endpoint;
use crate::error::{LinkError, Result};

/// Header size: 2 bytes payload length + 2 bytes endpoint id
pub const HEADER_SIZE: usize = 4;

/// Maximum payload size accepted by the watch on a single frame
pub const MAX_PAYLOAD_SIZE: usize = 2048;

/// One reassembled frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw endpoint id as carried on the wire
    pub endpoint: u16,

    /// Frame payload
    pub payload: Vec<u8>,
}

/// Decoder state
#[derive(Debug)]
enum DecodeState {
    /// Waiting for the 4-byte header
    AwaitingHeader,

    /// Header consumed; waiting for the full payload
    AwaitingPayload { length: usize, endpoint: u16 },
}

/// Reassembles frames from an incoming byte stream
#[derive(Debug)]
pub struct FrameCodec {
    /// Buffer accumulating incoming data
    buffer: BytesMut,

    /// Current decoder state
    state: DecodeState,
}

impl FrameCodec {
    /// Create a new codec with an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(HEADER_SIZE + MAX_PAYLOAD_SIZE),
            state: DecodeState::AwaitingHeader,
        }
    }

    /// Feed received bytes into the reassembly buffer
    ///
    /// Chunks may arrive in any size; call [`next_frame`](Self::next_frame)
    /// in a loop afterwards to drain every frame that is now complete.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to take the next complete frame out of the buffer
    ///
    /// Returns `None` when more bytes are needed. Frames are emitted in
    /// arrival order.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match self.state {
                DecodeState::AwaitingHeader => {
                    if self.buffer.len() < HEADER_SIZE {
                        return None;
                    }
                    let length = u16::from_be_bytes([self.buffer[0], self.buffer[1]]) as usize;
                    let endpoint = u16::from_be_bytes([self.buffer[2], self.buffer[3]]);
                    self.buffer.advance(HEADER_SIZE);
                    self.state = DecodeState::AwaitingPayload { length, endpoint };
                }
                DecodeState::AwaitingPayload { length, endpoint } => {
                    if self.buffer.len() < length {
                        return None;
                    }
                    let payload = self.buffer.split_to(length).to_vec();
                    self.state = DecodeState::AwaitingHeader;
                    return Some(Frame { endpoint, payload });
                }
            }
        }
    }

    /// Discard buffered bytes and return to the header state
    ///
    /// Used when a session is torn down: after a timeout the frame
    /// boundaries can no longer be trusted.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecodeState::AwaitingHeader;
    }

    /// Encode one outbound frame
    ///
    /// Fails if the payload exceeds the watch's 2048-byte frame limit.
    pub fn encode(endpoint: Endpoint, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(LinkError::PayloadTooLarge(payload.len(), MAX_PAYLOAD_SIZE));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(&endpoint.raw().to_be_bytes());
        frame.extend_from_slice(payload);
        Ok(frame)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}
