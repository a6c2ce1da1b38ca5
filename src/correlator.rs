//! Request/response correlation over the shared channel.
//!
//! Each outstanding call owns exactly one channel subscription. The first
//! response that passes the call's filter settles the call and takes the
//! channel's per-message claim, so no other pending call on that channel
//! settles from the same response. Other subscribers still observe it.
//!
//! # Outcomes
//!
//! | Response | Outcome |
//! |----------|---------|
//! | success shape | [`Outcome::Resolved`] |
//! | `"cancel"` | [`Outcome::Cancelled`] |
//! | anything else (signal kinds) | [`Outcome::StillPending`] |
//! | anything else (metadata call) | ignored, keeps waiting |
//! | nothing before the deadline | [`Outcome::TimedOut`] |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::{CallId, SubscriptionId};
use crate::protocol::{CANCEL_SENTINEL, Envelope, RESPONDER_TAG, RequestKind};
use crate::transport::{Channel, Subscription};

// ============================================================================
// Outcome
// ============================================================================

/// Terminal state of one pending call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The relay answered with a success-shaped value.
    Resolved(Value),
    /// The relay reported that the user declined.
    Cancelled,
    /// The deadline elapsed first.
    TimedOut,
    /// A correlated response consumed the call but carried neither a
    /// success value nor the cancellation sentinel. Nothing further can
    /// settle it.
    StillPending,
}

/// What the handler hands over to the waiting call.
#[derive(Debug)]
enum Settlement {
    Resolved(Value),
    Cancelled,
    Malformed,
}

impl Settlement {
    /// Classifies the result a response carries for `kind`.
    fn classify(kind: RequestKind, envelope: &Envelope) -> Self {
        match envelope.response_value(kind) {
            Some(Value::String(s)) if s == CANCEL_SENTINEL => Self::Cancelled,
            Some(value) if kind.response_shape().accepts(value) => Self::Resolved(value.clone()),
            _ => Self::Malformed,
        }
    }
}

// ============================================================================
// CallMatcher
// ============================================================================

/// Payload identity of one call.
///
/// A response echoing a `callId` matches only the call that minted it.
/// Without one, the echoed request value must equal the value sent; kinds
/// that send no value accept any response.
#[derive(Debug, Clone)]
pub struct CallMatcher {
    kind: RequestKind,
    call_id: CallId,
    request: Option<Value>,
}

impl CallMatcher {
    /// Creates a matcher for a call of `kind` that sent `request`.
    #[must_use]
    pub fn new(kind: RequestKind, call_id: CallId, request: Option<Value>) -> Self {
        Self {
            kind,
            call_id,
            request,
        }
    }

    /// Returns `true` if `envelope` answers this call.
    #[must_use]
    pub fn matches(&self, envelope: &Envelope) -> bool {
        if let Some(echoed) = envelope.call_id {
            return echoed == self.call_id;
        }

        match &self.request {
            Some(sent) => envelope.echoed_request(self.kind) == Some(sent),
            None => true,
        }
    }
}

// ============================================================================
// Correlator
// ============================================================================

/// Bridges asynchronous calls to their responses on a [`Channel`].
#[derive(Clone)]
pub struct Correlator {
    channel: Channel,
}

impl Correlator {
    /// Creates a correlator over `channel`.
    #[inline]
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Returns the underlying channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Registers a pending call for `kind` without waiting on it.
    ///
    /// The subscription is live when this returns, so a request delivered
    /// afterwards cannot have its response slip past.
    ///
    /// The filter accepts responses that come from the relay, carry
    /// `kind`'s response method, carry a payload (signal kinds only) and
    /// satisfy `matcher`.
    pub fn register<M>(&self, kind: RequestKind, matcher: M) -> PendingCall
    where
        M: Fn(&Envelope) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));

        let method = kind.response_method();
        let needs_payload = !kind.is_metadata();
        let gate = self.channel.claim_gate();

        let predicate = move |envelope: &Envelope| {
            envelope.is_from(RESPONDER_TAG)
                && envelope.method == method
                && (!needs_payload || envelope.has_payload())
                && matcher(envelope)
        };

        let handler = move |envelope: &Envelope| {
            let settlement = Settlement::classify(kind, envelope);

            if kind.is_metadata() && matches!(settlement, Settlement::Malformed) {
                trace!(method, "Ignoring malformed metadata response");
                return;
            }

            let mut slot = slot.lock();
            if slot.is_none() {
                return;
            }
            if !gate.try_claim() {
                trace!(method, "Response already claimed by another call");
                return;
            }
            if let Some(tx) = slot.take() {
                let _ = tx.send(settlement);
            }
        };

        let subscription = self.channel.subscribe(predicate, handler);
        trace!(%kind, subscription_id = %subscription.id(), "Pending call registered");

        PendingCall {
            kind,
            subscription,
            rx,
        }
    }

    /// Waits for the response to a call of `kind`.
    ///
    /// With `deadline`, the call times out once it elapses; without, it
    /// waits until a response arrives or the channel shuts down.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    ///   channel shut down first
    pub async fn await_response<M>(
        &self,
        kind: RequestKind,
        matcher: M,
        deadline: Option<Duration>,
    ) -> Result<Outcome>
    where
        M: Fn(&Envelope) -> bool + Send + Sync + 'static,
    {
        self.register(kind, matcher).settle(deadline).await
    }
}

// ============================================================================
// PendingCall
// ============================================================================

/// One in-flight call and the subscription it owns.
///
/// Dropping it unsubscribes.
#[must_use = "dropping a PendingCall abandons the call"]
pub struct PendingCall {
    kind: RequestKind,
    subscription: Subscription,
    rx: oneshot::Receiver<Settlement>,
}

impl PendingCall {
    /// Returns the request kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Returns the id of the owned subscription.
    #[inline]
    #[must_use]
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Waits for the call to reach a terminal state.
    ///
    /// The subscription is removed on every path out of this method.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    ///   channel shut down first
    pub async fn settle(self, deadline: Option<Duration>) -> Result<Outcome> {
        let Self {
            kind,
            subscription,
            rx,
        } = self;

        let received = match deadline {
            Some(deadline) => match timeout(deadline, rx).await {
                Ok(received) => received,
                Err(_) => {
                    subscription.unsubscribe();
                    let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                    debug!(%kind, timeout_ms, "Call timed out");
                    return Ok(Outcome::TimedOut);
                }
            },
            None => rx.await,
        };

        subscription.unsubscribe();

        let outcome = match received? {
            Settlement::Resolved(value) => Outcome::Resolved(value),
            Settlement::Cancelled => Outcome::Cancelled,
            Settlement::Malformed => {
                warn!(%kind, "Correlated response has neither a result nor \"cancel\"");
                Outcome::StillPending
            }
        };

        debug!(%kind, ?outcome, "Call settled");
        Ok(outcome)
    }
}

// ============================================================================
// Tests
// ============================================================================
