//! Device Session
//!
//! The top-level handle to one watch: connect handshake, correlated
//! requests, fire-and-forget sends, and the simple command surface.
//!
//! ## Concurrency Model
//!
//! - One dedicated dispatch thread drains the transport's byte channel,
//!   reassembles frames, and routes them through the
//!   [`TransactionManager`]. It must never wait on a transaction
//!   (it would deadlock against itself), which is enforced with a
//!   thread-id guard.
//! - Request/response cycles run on caller threads, serialized by a
//!   single io mutex spanning "open transaction → write frame → wait".
//!   Fire-and-forget sends take the same mutex, so two writers can
//!   never interleave frames on the wire.
//! - A timed-out request tears the session down: after a missed reply
//!   the frame boundaries can no longer be trusted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam::channel::unbounded;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{LinkError, Result};
use crate::protocol::{
    AppBankResponse, AppInstallResponse, Command, Endpoint, FirmwareVersionResponse, FrameCodec,
    PingResponse, Response, ResponseKind, SystemCommand, SystemMessageResponse, TimeResponse,
};
use crate::transaction::{Completion, SubscriptionId, TransactionManager};
use crate::transport::Transport;

/// Capabilities advertised in the phone version reply
const SESSION_CAPS: u32 = 0x8000_0000;
const REMOTE_CAPS: u32 = 16 | 32;

/// State shared with the dispatch thread
struct Shared {
    /// Request correlation + listener fan-out
    transactions: TransactionManager,

    /// Whether the handshake completed and the session is usable
    alive: AtomicBool,

    /// Identity of the dispatch thread while one is running
    dispatch_thread: Mutex<Option<ThreadId>>,
}

/// A session with one watch
pub struct Watch {
    /// Session configuration (timeouts)
    config: Config,

    /// State shared with the dispatch thread
    shared: Arc<Shared>,

    /// The byte channel to the device; guarded separately from the io
    /// mutex so teardown never waits behind a pending request
    transport: Mutex<Box<dyn Transport>>,

    /// Serializes every outbound exchange (correlated or not)
    io_lock: Mutex<()>,

    /// Dispatch thread handle, joined on disconnect
    dispatcher: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Watch {
    /// Create a session over the given transport
    pub fn new(transport: Box<dyn Transport>, config: Config) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                transactions: TransactionManager::new(),
                alive: AtomicBool::new(false),
                dispatch_thread: Mutex::new(None),
            }),
            transport: Mutex::new(transport),
            io_lock: Mutex::new(()),
            dispatcher: Mutex::new(None),
        }
    }

    /// Create a session over a TCP-exposed serial channel
    pub fn tcp(addr: impl Into<String>, config: Config) -> Self {
        Self::new(Box::new(crate::transport::TcpTransport::new(addr)), config)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect and run the identification handshake
    ///
    /// The watch sends its identification request the instant the
    /// transport opens, so the transaction expecting it must be open
    /// *before* the transport is — otherwise the reply can arrive
    /// while nobody is listening.
    pub fn connect(&self) -> Result<()> {
        if self.is_alive() {
            return Ok(());
        }

        let _io = self.io_lock.lock();

        // Step 1: open the transaction first (see above)
        let txn = self.shared.transactions.begin(ResponseKind::PhoneVersion)?;

        // Step 2: open the transport; received chunks flow into `source`
        let (sink, source) = unbounded::<Vec<u8>>();
        self.transport.lock().open(sink)?;

        // Step 3: start the dispatch thread
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("wristlink-dispatch".to_string())
            .spawn(move || {
                *shared.dispatch_thread.lock() = Some(thread::current().id());

                let mut codec = FrameCodec::new();
                while let Ok(chunk) = source.recv() {
                    codec.push(&chunk);
                    while let Some(frame) = codec.next_frame() {
                        shared.transactions.dispatch(frame.endpoint, &frame.payload);
                    }
                }

                // Transport hung up
                shared.alive.store(false, Ordering::SeqCst);
                *shared.dispatch_thread.lock() = None;
                tracing::debug!("dispatch thread exiting");
            })?;
        *self.dispatcher.lock() = Some(handle);

        // Step 4: wait for the watch to identify itself
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        match txn.wait(timeout) {
            Completion::Replied(reply) if reply.success() => {
                // Step 5: answer with our own version/capabilities
                let command = Command::PhoneVersion {
                    session_caps: SESSION_CAPS,
                    remote_caps: REMOTE_CAPS,
                };
                if let Err(e) = self.write_frame(command.endpoint(), &command.encode()) {
                    self.teardown();
                    return Err(e);
                }

                self.shared.alive.store(true, Ordering::SeqCst);
                tracing::debug!("session alive");
                Ok(())
            }
            Completion::Replied(reply) => {
                self.teardown();
                Err(LinkError::Transport(format!(
                    "handshake failed: {}",
                    reply.error().unwrap_or("unknown error")
                )))
            }
            Completion::TimedOut(_) => {
                tracing::warn!("watch did not identify itself in time");
                self.teardown();
                Err(LinkError::Timeout)
            }
        }
    }

    /// Disconnect from the watch
    ///
    /// Best-effort teardown: close failures are swallowed and the
    /// session is always left not-alive.
    pub fn disconnect(&self) {
        self.teardown();
    }

    /// Whether the handshake completed and the session is usable
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    fn teardown(&self) {
        if let Err(e) = self.transport.lock().close() {
            tracing::debug!("transport close failed (ignored): {}", e);
        }
        self.shared.alive.store(false, Ordering::SeqCst);

        if let Some(handle) = self.dispatcher.lock().take() {
            if !crate::transport::wait_for_thread(handle, Duration::from_millis(500)) {
                tracing::warn!("dispatch thread did not exit after transport close");
            }
        }
    }

    // =========================================================================
    // Request Primitives
    // =========================================================================

    /// Issue a correlated request and wait for its typed reply
    ///
    /// Expected negative outcomes (timeout, device-reported error,
    /// send failure) come back as a failed response; `Err` is reserved
    /// for programming/validation errors. A timeout also disconnects
    /// the session.
    pub(crate) fn request_raw(
        &self,
        endpoint: Endpoint,
        payload: &[u8],
        expected: ResponseKind,
    ) -> Result<Response> {
        self.guard_dispatch_thread()?;

        let _io = self.io_lock.lock();
        let txn = self.shared.transactions.begin(expected)?;
        let frame = FrameCodec::encode(endpoint, payload)?;

        if let Err(e) = self.transport.lock().write(&frame) {
            // A failed write is a wire outcome, not a caller bug; the
            // framing state is still consistent, so stay connected.
            tracing::warn!("send on endpoint {} failed: {}", endpoint.raw(), e);
            return Ok(Response::failed(expected, format!("send failed: {e}")));
        }

        match txn.wait(self.response_timeout()) {
            Completion::Replied(response) => Ok(response),
            Completion::TimedOut(response) => {
                tracing::warn!(
                    "request on endpoint {} timed out; disconnecting",
                    endpoint.raw()
                );
                self.teardown();
                Ok(response)
            }
        }
    }

    /// Send a frame without awaiting a reply
    ///
    /// Write failures are logged and swallowed.
    pub(crate) fn send_raw(&self, endpoint: Endpoint, payload: &[u8]) -> Result<()> {
        self.guard_dispatch_thread()?;

        let _io = self.io_lock.lock();
        let frame = FrameCodec::encode(endpoint, payload)?;
        if let Err(e) = self.transport.lock().write(&frame) {
            tracing::warn!("fire-and-forget on endpoint {} failed: {}", endpoint.raw(), e);
        }
        Ok(())
    }

    fn request(&self, command: &Command, expected: ResponseKind) -> Result<Response> {
        self.request_raw(command.endpoint(), &command.encode(), expected)
    }

    fn send(&self, command: &Command) -> Result<()> {
        self.send_raw(command.endpoint(), &command.encode())
    }

    /// Write one frame while the io mutex is already held
    fn write_frame(&self, endpoint: Endpoint, payload: &[u8]) -> Result<()> {
        let frame = FrameCodec::encode(endpoint, payload)?;
        self.transport.lock().write(&frame)
    }

    /// Responses are awaited from caller threads; waiting on the
    /// dispatch thread would deadlock against the thread that has to
    /// deliver the reply.
    fn guard_dispatch_thread(&self) -> Result<()> {
        let dispatch = *self.shared.dispatch_thread.lock();
        if dispatch == Some(thread::current().id()) {
            return Err(LinkError::Protocol(
                "requests cannot be issued from a response callback".to_string(),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Simple Commands
    // =========================================================================

    /// Echo request; the reply carries the same cookie back
    pub fn ping(&self, cookie: u32) -> Result<PingResponse> {
        match self.request(&Command::Ping { cookie }, ResponseKind::Ping)? {
            Response::Ping(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Read the watch's clock
    pub fn get_time(&self) -> Result<TimeResponse> {
        match self.request(&Command::GetTime, ResponseKind::Time)? {
            Response::Time(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Set the watch's clock (fire-and-forget)
    pub fn set_time(&self, unix_time: u32) -> Result<()> {
        self.send(&Command::SetTime { unix_time })
    }

    /// Fetch main + recovery firmware versions
    pub fn get_firmware_version(&self) -> Result<FirmwareVersionResponse> {
        match self.request(&Command::GetFirmwareVersion, ResponseKind::FirmwareVersion)? {
            Response::FirmwareVersion(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Fetch the app bank listing
    pub fn get_app_bank(&self) -> Result<AppBankResponse> {
        match self.request(&Command::ListApps, ResponseKind::AppBank)? {
            Response::AppBank(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Remove an installed app by id and slot index
    pub fn remove_app(&self, id: u32, index: u32) -> Result<AppInstallResponse> {
        match self.request(&Command::RemoveApp { id, index }, ResponseKind::AppInstallResult)? {
            Response::AppInstallResult(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Remove an installed app by UUID
    pub fn remove_app_by_uuid(&self, uuid: uuid::Uuid) -> Result<AppInstallResponse> {
        match self.request(
            &Command::RemoveAppByUuid { uuid },
            ResponseKind::AppInstallResult,
        )? {
            Response::AppInstallResult(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Tell the watch an app landed in the given slot (fire-and-forget)
    pub fn add_app(&self, index: u32) -> Result<()> {
        self.send(&Command::AddApp { index })
    }

    /// Send a firmware-lifecycle system message
    pub fn system_message(&self, command: SystemCommand) -> Result<SystemMessageResponse> {
        match self.request(&Command::SystemMessage { command }, ResponseKind::SystemMessage)? {
            Response::SystemMessage(r) => Ok(r),
            other => Ok(unexpected_variant(other)),
        }
    }

    /// Show an SMS notification banner (fire-and-forget)
    pub fn notify_sms(&self, sender: &str, body: &str) -> Result<()> {
        self.send(&Command::NotifySms {
            sender: sender.to_string(),
            body: body.to_string(),
            timestamp: unix_now(),
        })
    }

    /// Show an email notification banner (fire-and-forget)
    pub fn notify_email(&self, sender: &str, subject: &str, body: &str) -> Result<()> {
        self.send(&Command::NotifyEmail {
            sender: sender.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            timestamp: unix_now(),
        })
    }

    /// Push now-playing metadata to the music UI (fire-and-forget)
    pub fn set_now_playing(&self, artist: &str, album: &str, track: &str) -> Result<()> {
        self.send(&Command::NowPlaying {
            artist: artist.to_string(),
            album: album.to_string(),
            track: track.to_string(),
        })
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a callback for one response kind
    ///
    /// Runs synchronously on the dispatch thread for every decoded
    /// response of that kind, independent of transaction completion.
    pub fn subscribe(
        &self,
        kind: ResponseKind,
        callback: impl Fn(&Response) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.transactions.subscribe(kind, callback)
    }

    /// Remove a previously registered callback
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.transactions.unsubscribe(id);
    }

    fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.config.response_timeout_ms)
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Seconds since the unix epoch, saturating at u32
fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Fallback for a reply whose variant does not match the transaction
/// kind. Unreachable when dispatch is behaving; kept total so callers
/// never panic on a misbehaving device.
fn unexpected_variant<T: Default + Failable>(other: Response) -> T {
    let mut value = T::default();
    value.set_error(format!(
        "unexpected response variant {:?}",
        other.kind()
    ));
    value
}

/// Internal helper trait for synthesizing failed typed responses
trait Failable {
    fn set_error(&mut self, message: String);
}

macro_rules! impl_failable {
    ($($ty:ty),* $(,)?) => {
        $(impl Failable for $ty {
            fn set_error(&mut self, message: String) {
                self.success = false;
                self.error = Some(message);
            }
        })*
    };
}

impl_failable!(
    PingResponse,
    TimeResponse,
    FirmwareVersionResponse,
    AppBankResponse,
    AppInstallResponse,
    SystemMessageResponse,
);
