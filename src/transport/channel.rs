//! Shared tab channel and its subscription registry.
//!
//! The channel models the message bus every script in a tab shares: any
//! subscriber may observe any message, nothing is acknowledged, and nothing
//! is reported when a message has no listener.
//!
//! # Event Loop
//!
//! The channel spawns a tokio task that handles:
//!
//! - Messages queued by [`Channel::send`]
//! - Dispatch to every subscription whose predicate matches
//! - Flush barriers and shutdown
//!
//! Handlers run outside the registry lock, so a handler may unsubscribe
//! itself (or anything else) while being dispatched.
//!
//! # Claims
//!
//! Every matching subscriber sees every message. Subscribers that must not
//! share a message take a claim through the channel's [`ClaimGate`]; the
//! first claimant of a message wins and the others step aside, while
//! subscribers that never claim keep observing everything.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::identifiers::SubscriptionId;
use crate::protocol::Envelope;

// ============================================================================
// Types
// ============================================================================

/// Filter deciding whether a subscription sees a message.
pub type Predicate = Box<dyn Fn(&Envelope) -> bool + Send + Sync>;

/// Callback invoked for each message passing the predicate.
pub type Handler = Box<dyn Fn(&Envelope) + Send + Sync>;

/// One registered subscriber.
struct Subscriber {
    predicate: Predicate,
    handler: Handler,
}

/// Map of subscription handles to subscribers.
type Registry = FxHashMap<SubscriptionId, Arc<Subscriber>>;

/// Registry plus the closed flag, guarded together so that nothing can be
/// registered after shutdown drained it.
#[derive(Default)]
struct RegistryState {
    subscribers: Registry,
    closed: bool,
}

// ============================================================================
// ChannelCommand
// ============================================================================

/// Internal commands for the event loop.
enum ChannelCommand {
    /// Dispatch a message.
    Post(Envelope),
    /// Acknowledge once every earlier message has been dispatched.
    Flush(oneshot::Sender<()>),
    /// Stop the loop.
    Shutdown,
}

// ============================================================================
// Channel
// ============================================================================

/// The tab-wide message channel.
///
/// # Thread Safety
///
/// `Channel` is `Send + Sync` and cheap to clone; clones share one
/// registry and one event loop.
#[derive(Clone)]
pub struct Channel {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
    /// Subscription registry (shared with event loop).
    registry: Arc<Mutex<RegistryState>>,
    /// Messages accepted by `send`.
    sent: Arc<AtomicU64>,
    /// Set once `shutdown` ran.
    shutdown: Arc<AtomicBool>,
    /// Per-message claims (shared with event loop).
    claims: ClaimGate,
}

impl Channel {
    /// Creates a channel.
    ///
    /// Spawns the event loop task internally, so this must be called from
    /// within a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Mutex::new(RegistryState::default()));
        let claims = ClaimGate::default();

        tokio::spawn(Self::run_event_loop(
            command_rx,
            Arc::clone(&registry),
            claims.clone(),
        ));

        Self {
            command_tx,
            registry,
            sent: Arc::new(AtomicU64::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
            claims,
        }
    }

    /// Queues a message for every current subscriber.
    ///
    /// Fire-and-forget: never blocks, never fails. After shutdown the
    /// message is dropped silently.
    pub fn send(&self, envelope: Envelope) {
        if self.shutdown.load(Ordering::SeqCst) {
            trace!(method = %envelope.method, "Channel shut down, message dropped");
            return;
        }

        self.sent.fetch_add(1, Ordering::Relaxed);
        trace!(method = %envelope.method, source = %envelope.source, "Message sent");

        let _ = self.command_tx.send(ChannelCommand::Post(envelope));
    }

    /// Registers a subscription.
    ///
    /// `handler` runs once per observed message for which `predicate`
    /// returns `true`. The returned handle unsubscribes on
    /// [`Subscription::unsubscribe`] or on drop.
    ///
    /// Subscribing to a shut-down channel returns an inert handle; the
    /// handler is dropped immediately.
    pub fn subscribe<P, H>(&self, predicate: P, handler: H) -> Subscription
    where
        P: Fn(&Envelope) -> bool + Send + Sync + 'static,
        H: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        let subscriber = Arc::new(Subscriber {
            predicate: Box::new(predicate),
            handler: Box::new(handler),
        });

        {
            let mut state = self.registry.lock();
            if state.closed {
                debug!(subscription_id = %id, "Subscribe on closed channel ignored");
                return Subscription::inert(id);
            }
            state.subscribers.insert(id, subscriber);
        }

        trace!(subscription_id = %id, "Subscription registered");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Waits until every message sent before this call has been dispatched.
    ///
    /// Returns immediately if the channel is shut down.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(ChannelCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Returns the number of registered subscriptions.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    /// Returns the number of messages accepted by [`send`](Self::send).
    #[inline]
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Returns the claim gate shared by every clone of this channel.
    ///
    /// Handlers call [`ClaimGate::try_claim`] to take the message being
    /// dispatched exclusively among claimants.
    #[inline]
    #[must_use]
    pub fn claim_gate(&self) -> ClaimGate {
        self.claims.clone()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Tears the channel down, as page unload would.
    ///
    /// Every registered subscription is dropped, so calls still waiting on
    /// one observe a closed channel. Undispatched messages are discarded.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        Self::drain_registry(&self.registry);
        let _ = self.command_tx.send(ChannelCommand::Shutdown);
    }

    /// Event loop that dispatches queued messages.
    async fn run_event_loop(
        mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
        registry: Arc<Mutex<RegistryState>>,
        claims: ClaimGate,
    ) {
        while let Some(command) = command_rx.recv().await {
            match command {
                ChannelCommand::Post(envelope) => {
                    claims.advance();
                    Self::dispatch(&envelope, &registry);
                }

                ChannelCommand::Flush(ack) => {
                    let _ = ack.send(());
                }

                ChannelCommand::Shutdown => {
                    debug!("Shutdown command received");
                    break;
                }
            }
        }

        // Every sender gone or explicit shutdown: nothing can reach the
        // remaining subscribers any more.
        Self::drain_registry(&registry);

        debug!("Channel event loop terminated");
    }

    /// Offers one message to every matching subscriber, oldest first.
    fn dispatch(envelope: &Envelope, registry: &Arc<Mutex<RegistryState>>) {
        let mut snapshot: Vec<(SubscriptionId, Arc<Subscriber>)> = registry
            .lock()
            .subscribers
            .iter()
            .map(|(id, subscriber)| (*id, Arc::clone(subscriber)))
            .collect();
        snapshot.sort_unstable_by_key(|(id, _)| *id);

        let mut observed = 0usize;
        for (_, subscriber) in snapshot {
            if (subscriber.predicate)(envelope) {
                observed += 1;
                (subscriber.handler)(envelope);
            }
        }

        trace!(method = %envelope.method, observed, "Message dispatched");
    }

    /// Drops every subscriber and marks the registry closed.
    fn drain_registry(registry: &Arc<Mutex<RegistryState>>) {
        let drained: Vec<_> = {
            let mut state = registry.lock();
            state.closed = true;
            state.subscribers.drain().collect()
        };

        let count = drained.len();
        // Dropped outside the lock: subscriber drops may run arbitrary code.
        drop(drained);

        if count > 0 {
            debug!(count, "Dropped subscriptions on shutdown");
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ClaimGate
// ============================================================================

/// Exclusive per-message claims among cooperating subscribers.
///
/// The event loop numbers each message before dispatching it; a handler
/// that calls [`try_claim`](Self::try_claim) wins only if no other handler
/// claimed the same message. Only meaningful from inside a handler.
#[derive(Debug, Clone, Default)]
pub struct ClaimGate {
    /// Sequence number of the message being dispatched.
    dispatching: Arc<AtomicU64>,
    /// Sequence number of the last claimed message.
    claimed: Arc<AtomicU64>,
}

impl ClaimGate {
    /// Claims the message currently being dispatched.
    ///
    /// Returns `true` for the first claimant of the message, `false` for
    /// every later one.
    pub fn try_claim(&self) -> bool {
        let current = self.dispatching.load(Ordering::SeqCst);
        current > 0 && self.claimed.fetch_max(current, Ordering::SeqCst) < current
    }

    /// Moves on to the next message.
    fn advance(&self) {
        self.dispatching.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to one registered subscription.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Mutex<RegistryState>>,
}

impl Subscription {
    /// Handle that refers to nothing.
    fn inert(id: SubscriptionId) -> Self {
        Self {
            id,
            registry: Weak::new(),
        }
    }

    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the subscription from the registry.
    ///
    /// Idempotent. Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };

        let removed = registry.lock().subscribers.remove(&self.id);
        if removed.is_some() {
            trace!(subscription_id = %self.id, "Subscription removed");
            true
        } else {
            false
        }
    }

    /// Returns `true` while the subscription is registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.lock().subscribers.contains_key(&self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{RESPONDER_TAG, RequestKind};

    type Seen = Arc<Mutex<Vec<String>>>;

    fn recorder() -> (Seen, impl Fn(&Envelope) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |envelope: &Envelope| {
            sink.lock().push(envelope.method.clone());
        })
    }

    #[tokio::test]
    async fn test_send_reaches_matching_subscribers() {
        let channel = Channel::new();
        let (seen, handler) = recorder();
        let _sub = channel.subscribe(|e| e.is_from(RESPONDER_TAG), handler);

        channel.send(Envelope::response(RequestKind::GetUrl));
        channel.send(Envelope::response(RequestKind::GetUrl).with_source("other-script"));
        channel.flush().await;

        assert_eq!(*seen.lock(), vec!["getURLResponse".to_string()]);
        assert_eq!(channel.messages_sent(), 2);
    }

    #[tokio::test]
    async fn test_send_without_subscribers_is_silent() {
        let channel = Channel::new();
        channel.send(Envelope::response(RequestKind::GetUrl));
        channel.flush().await;
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let channel = Channel::new();
        let sub = channel.subscribe(|_| true, |_| {});
        assert_eq!(channel.subscriber_count(), 1);
        assert!(sub.is_active());

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let channel = Channel::new();
        {
            let _sub = channel.subscribe(|_| true, |_| {});
            assert_eq!(channel.subscriber_count(), 1);
        }
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_claim_does_not_hide_message_from_observers() {
        let channel = Channel::new();
        let gate = channel.claim_gate();
        let claims = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&claims);
        let _claimant = channel.subscribe(
            |_| true,
            move |_| {
                if gate.try_claim() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        let (observed, handler) = recorder();
        let _observer = channel.subscribe(|_| true, handler);

        channel.send(Envelope::response(RequestKind::TransactionRequest));
        channel.flush().await;

        assert_eq!(claims.load(Ordering::SeqCst), 1);
        assert_eq!(*observed.lock(), vec!["transactionResponse".to_string()]);
    }

    #[tokio::test]
    async fn test_claim_gate_admits_one_claimant_per_message() {
        let channel = Channel::new();
        let winners: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

        let mut subs = Vec::new();
        for slot in 0..3u8 {
            let gate = channel.claim_gate();
            let winners = Arc::clone(&winners);
            subs.push(channel.subscribe(
                |_| true,
                move |_| {
                    if gate.try_claim() {
                        winners.lock().push(slot);
                    }
                },
            ));
        }

        channel.send(Envelope::response(RequestKind::GetUrl));
        channel.send(Envelope::response(RequestKind::GetUrl));
        channel.flush().await;

        // Oldest claimant wins each message.
        assert_eq!(*winners.lock(), vec![0, 0]);
    }

    #[test]
    fn test_claim_outside_dispatch_fails() {
        assert!(!ClaimGate::default().try_claim());
    }

    #[tokio::test]
    async fn test_handler_may_unsubscribe_itself() {
        let channel = Channel::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let own = Arc::clone(&slot);
        let sub = channel.subscribe(
            |_| true,
            move |_| {
                // Takes the registry lock from inside dispatch.
                if let Some(sub) = own.lock().take() {
                    sub.unsubscribe();
                }
            },
        );
        *slot.lock() = Some(sub);

        channel.send(Envelope::response(RequestKind::GetUrl));
        channel.flush().await;

        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_drops_subscriptions() {
        let channel = Channel::new();
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let _sub = channel.subscribe(
            |_| true,
            move |_| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            },
        );

        channel.shutdown();

        assert!(channel.is_shutdown());
        assert_eq!(channel.subscriber_count(), 0);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_after_shutdown_is_inert() {
        let channel = Channel::new();
        channel.shutdown();

        let sub = channel.subscribe(|_| true, |_| {});
        assert!(!sub.is_active());
        assert_eq!(channel.subscriber_count(), 0);

        channel.send(Envelope::response(RequestKind::GetUrl));
        assert_eq!(channel.messages_sent(), 0);
        channel.flush().await;
    }
}
