//! Outbound signals that wake the privileged relay.
//!
//! Signals are one-way: emitting returns nothing and learns nothing. The
//! relay answers, if at all, by writing a response onto the
//! [`Channel`](super::Channel).

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::Signal;

// ============================================================================
// SignalEmitter
// ============================================================================

/// Sink for outbound signals.
///
/// Implementations are scoped to a single tab: only relay listeners for
/// that tab may observe what is emitted.
pub trait SignalEmitter: Send + Sync {
    /// Fires `signal`. Synchronous, one-way, infallible.
    fn emit(&self, signal: Signal);
}

// ============================================================================
// SignalBus
// ============================================================================

/// In-process, tab-scoped signal bus.
///
/// Each listener owns an unbounded queue, so a relay that falls behind
/// still receives every signal emitted after it started listening.
pub struct SignalBus {
    /// One sender per listener.
    listeners: Mutex<Vec<mpsc::UnboundedSender<Signal>>>,
    /// Total signals emitted.
    emitted: AtomicU64,
}

impl SignalBus {
    /// Creates a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            emitted: AtomicU64::new(0),
        }
    }

    /// Starts listening, as the relay does for its tab.
    ///
    /// Dropping the receiver stops listening.
    #[must_use]
    pub fn listen(&self) -> mpsc::UnboundedReceiver<Signal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(tx);
        rx
    }

    /// Returns the number of active listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }

    /// Returns the number of signals emitted so far.
    #[inline]
    #[must_use]
    pub fn signals_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalEmitter for SignalBus {
    fn emit(&self, signal: Signal) {
        self.emitted.fetch_add(1, Ordering::Relaxed);

        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| tx.send(signal.clone()).is_ok());

        if listeners.is_empty() {
            debug!(name = %signal.name, "Signal emitted with no relay listening");
        } else {
            debug!(name = %signal.name, listeners = listeners.len(), "Signal emitted");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
