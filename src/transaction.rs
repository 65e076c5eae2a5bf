//! Transaction Manager
//!
//! Correlates exactly one outstanding request with its eventual reply
//! and fans every other inbound response out to subscribed listeners.
//!
//! ## Responsibilities
//! - Enforce the single-pending-transaction invariant per session
//! - Complete the pending transaction when a matching reply arrives
//! - Treat the watch's log/error channel as a pending transaction's
//!   error (the generic error channel preempts normal matching)
//! - Deliver every decoded response to listeners, whether or not it
//!   also completed a transaction
//!
//! ## Concurrency
//! - `pending`: one mutex-guarded slot; the session's io mutex
//!   serializes begin → send → wait, so contention here is only
//!   between a caller thread and the dispatch thread
//! - Completion is a capacity-1 rendezvous channel owned by the
//!   [`Transaction`] handle; dropping the handle clears the slot on
//!   every exit path, including timeout

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{LinkError, Result};
use crate::protocol::{match_response, Endpoint, LogMessage, Response, ResponseKind};

/// Shared callback type for response listeners
pub type ResponseCallback = Arc<dyn Fn(&Response) + Send + Sync>;

/// Handle returned by [`TransactionManager::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// The pending request slot
#[derive(Debug)]
struct Pending {
    /// Variant the open transaction is waiting for
    expected: ResponseKind,

    /// Send half of the rendezvous channel
    complete: Sender<Response>,
}

/// A registered response listener
struct Listener {
    id: u64,
    kind: ResponseKind,
    callback: ResponseCallback,
}

/// How a wait ended
#[derive(Debug)]
pub enum Completion {
    /// The watch replied (possibly with a device-reported error)
    Replied(Response),

    /// No reply before the deadline; carries the synthesized failed
    /// response. Frame boundaries can no longer be trusted after this.
    TimedOut(Response),
}

impl Completion {
    /// Collapse into the response value
    pub fn into_response(self) -> Response {
        match self {
            Completion::Replied(r) | Completion::TimedOut(r) => r,
        }
    }
}

/// Correlates requests and replies for one session
pub struct TransactionManager {
    /// The single pending-transaction slot
    pending: Mutex<Option<Pending>>,

    /// Registered listeners, scanned per dispatch
    listeners: Mutex<Vec<Listener>>,

    /// Next subscription id (atomic, lock-free)
    next_subscription: AtomicU64,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Open a transaction expecting a reply of the given kind
    ///
    /// Fails if another transaction is already open; that is a
    /// programming error in the caller, not a wire condition.
    pub fn begin(&self, expected: ResponseKind) -> Result<Transaction<'_>> {
        let mut pending = self.pending.lock();
        if pending.is_some() {
            return Err(LinkError::TransactionPending);
        }

        let (complete, receiver) = bounded(1);
        *pending = Some(Pending { expected, complete });

        Ok(Transaction {
            slot: &self.pending,
            receiver,
            expected,
        })
    }

    /// Whether a transaction is currently open (test support)
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Route one reassembled frame
    ///
    /// Called from the session's dispatch thread only.
    pub fn dispatch(&self, endpoint: u16, payload: &[u8]) {
        // The log/error channel preempts normal matching: while a
        // transaction is pending, its payload is that transaction's
        // error.
        if endpoint == Endpoint::Logs.raw() && !payload.is_empty() {
            let pending = self.pending.lock();
            if let Some(p) = pending.as_ref() {
                let message = match LogMessage::parse(payload) {
                    Ok(log) => format!(
                        "watch reported: {} ({}:{})",
                        log.message, log.filename, log.line
                    ),
                    Err(_) => "watch reported an unreadable error".to_string(),
                };
                tracing::debug!("pending transaction failed by log channel: {}", message);
                let _ = p.complete.try_send(Response::failed(p.expected, message));
                return;
            }
        }

        let Some(descriptor) = match_response(endpoint, payload) else {
            tracing::trace!("undispatched frame for endpoint {}", endpoint);
            return;
        };

        let response = descriptor.decode(payload);

        // Complete the pending transaction if the kinds line up. The
        // slot itself is cleared only when the handle is released, so
        // a second begin() still fails until then.
        {
            let pending = self.pending.lock();
            if let Some(p) = pending.as_ref() {
                if p.expected == response.kind() {
                    let _ = p.complete.try_send(response.clone());
                }
            }
        }

        self.notify_listeners(&response);
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a callback for one response kind
    ///
    /// Callbacks run synchronously on the dispatch thread, whether or
    /// not the response also completed a transaction.
    pub fn subscribe(
        &self,
        kind: ResponseKind,
        callback: impl Fn(&Response) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Listener {
            id,
            kind,
            callback: Arc::new(callback),
        });
        SubscriptionId(id)
    }

    /// Remove a previously registered callback
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|l| l.id != id.0);
    }

    fn notify_listeners(&self, response: &Response) {
        // Snapshot matching callbacks first so a callback may
        // subscribe/unsubscribe without deadlocking on the registry.
        let matching: Vec<ResponseCallback> = {
            let listeners = self.listeners.lock();
            listeners
                .iter()
                .filter(|l| l.kind == response.kind())
                .map(|l| Arc::clone(&l.callback))
                .collect()
        };

        for callback in matching {
            callback(response);
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// One open request/reply correlation
///
/// Owns the receive half of the rendezvous; dropping the handle frees
/// the pending slot on every exit path.
#[derive(Debug)]
pub struct Transaction<'a> {
    slot: &'a Mutex<Option<Pending>>,
    receiver: Receiver<Response>,
    expected: ResponseKind,
}

impl Transaction<'_> {
    /// The kind this transaction is waiting for
    pub fn expected(&self) -> ResponseKind {
        self.expected
    }

    /// Block until the reply arrives or the deadline passes
    ///
    /// A timeout never raises: it synthesizes a failed response of the
    /// expected kind so callers branch on `success` uniformly.
    pub fn wait(self, timeout: Duration) -> Completion {
        match self.receiver.recv_timeout(timeout) {
            Ok(response) => Completion::Replied(response),
            Err(_) => Completion::TimedOut(Response::failed(self.expected, "timed out")),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}
