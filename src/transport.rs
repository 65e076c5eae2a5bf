//! Transport layer
//!
//! The watch is reached over an opaque duplex byte channel: Bluetooth
//! serial in the field, a local TCP socket when a BT bridge or an
//! emulator exposes the device that way. The session only needs three
//! things from it: open, write, close — received bytes are pushed into
//! a channel exactly as they arrive, in whatever chunk sizes the OS
//! hands over.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam::channel::Sender;

use crate::error::{LinkError, Result};

/// A duplex byte channel to the watch
pub trait Transport: Send {
    /// Open the channel
    ///
    /// Received bytes must be pushed into `sink` in arrival order. The
    /// implementation must drop the sender when the channel closes so
    /// the session's dispatch thread can exit.
    fn open(&mut self, sink: Sender<Vec<u8>>) -> Result<()>;

    /// Write bytes to the device
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the channel
    ///
    /// Callers treat disconnection as best-effort; errors here are
    /// logged and swallowed at the session layer.
    fn close(&mut self) -> Result<()>;
}

/// TCP-backed transport
///
/// Connects to a host:port where the serial channel is exposed as a
/// socket. Reading happens on a dedicated thread that pumps chunks
/// into the session's byte channel.
pub struct TcpTransport {
    /// Address to connect to
    addr: String,

    /// Write half of the open connection
    stream: Option<TcpStream>,

    /// Reader thread, joined on close
    reader: Option<thread::JoinHandle<()>>,
}

impl TcpTransport {
    /// Create a transport for the given address (not yet connected)
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            reader: None,
        }
    }
}

impl Transport for TcpTransport {
    fn open(&mut self, sink: Sender<Vec<u8>>) -> Result<()> {
        let stream = TcpStream::connect(&self.addr)?;

        // Disable Nagle's algorithm: frames are small and latency-bound
        stream.set_nodelay(true)?;

        // Clone the stream for a separate read handle
        let mut read_stream = stream.try_clone()?;

        let reader = thread::Builder::new()
            .name("wristlink-transport-rx".to_string())
            .spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match read_stream.read(&mut buf) {
                        // 0 = peer closed the connection
                        Ok(0) => break,
                        Ok(n) => {
                            if sink.send(buf[..n].to_vec()).is_err() {
                                // Session side hung up
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!("transport read ended: {}", e);
                            break;
                        }
                    }
                }
                // sink drops here, waking the dispatch thread
            })?;

        self.stream = Some(stream);
        self.reader = Some(reader);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(LinkError::NotConnected)?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // Unblocks the reader thread
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(reader) = self.reader.take() {
            // The reader observes the shutdown promptly; don't hang
            // teardown if it is mid-read.
            let deadline = Duration::from_millis(250);
            if !wait_for_thread(reader, deadline) {
                tracing::warn!("transport reader did not exit within {:?}", deadline);
            }
        }
        Ok(())
    }
}

/// Join a thread with a deadline; returns false if it is still running
pub(crate) fn wait_for_thread(handle: thread::JoinHandle<()>, deadline: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if handle.is_finished() {
            let _ = handle.join();
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}
