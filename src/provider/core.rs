//! The provider exposed to page scripts.
//!
//! One async operation per request kind, plus static product metadata and
//! the unimplemented generic `request` placeholder.
//!
//! # Call Lifecycle
//!
//! ```text
//! Idle ── register + deliver ──► Sent ──┬─► Resolved
//!                                       ├─► Rejected (cancel)
//!                                       ├─► Rejected (timeout, getURL only)
//!                                       └─► Pending forever
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::correlator::{CallMatcher, Correlator, Outcome};
use crate::error::{Error, Result};
use crate::identifiers::CallId;
use crate::protocol::{
    Delivery, Envelope, PublicProfile, RequestKind, SignatureData, Signal, TransactionResult,
};
use crate::transport::{Channel, SignalEmitter};

use super::builder::ProviderBuilder;
use super::options::{MalformedPolicy, ProviderOptions};
use super::product::ProductInfo;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a provider.
struct ProviderInner {
    /// Correlator over the tab channel.
    correlator: Correlator,
    /// Outbound signal sink.
    signals: Arc<dyn SignalEmitter>,
    /// Configuration.
    options: ProviderOptions,
    /// Calls between deliver and settle.
    in_flight: AtomicUsize,
}

// ============================================================================
// Provider
// ============================================================================

/// Capability surface handed to page scripts.
///
/// Cheap to clone; clones share state. Calls are independent: an error on
/// one never affects another.
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

impl Provider {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::new()
    }

    pub(crate) fn new(
        channel: Channel,
        signals: Arc<dyn SignalEmitter>,
        options: ProviderOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                correlator: Correlator::new(channel),
                signals,
                options,
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ProviderOptions {
        &self.inner.options
    }

    /// Returns the number of calls currently awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Provider - Operations
// ============================================================================

impl Provider {
    /// Asks the relay for the extension URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no response within the metadata timeout
    /// - [`Error::ChannelClosed`] if the channel shut down first
    pub async fn get_url(&self) -> Result<String> {
        self.get_url_with(Map::new()).await
    }

    /// Asks the relay for the extension URL, spreading `params` into the
    /// request envelope.
    ///
    /// # Errors
    ///
    /// Same as [`get_url`](Self::get_url).
    pub async fn get_url_with(&self, params: Map<String, Value>) -> Result<String> {
        let value = self.call(RequestKind::GetUrl, None, params).await?;
        decode(RequestKind::GetUrl, value)
    }

    /// Requests a structured-data signature.
    ///
    /// # Errors
    ///
    /// - [`Error::UserCancelled`] if the user declined
    /// - [`Error::ChannelClosed`] if the channel shut down first
    /// - [`Error::MalformedResponse`] / [`Error::Json`] on a bad result
    pub async fn structured_data_signature_request(
        &self,
        signature_request: impl Into<String>,
    ) -> Result<SignatureData> {
        self.user_call(
            RequestKind::StructuredDataSignatureRequest,
            signature_request.into(),
        )
        .await
    }

    /// Requests a message signature.
    ///
    /// # Errors
    ///
    /// Same as [`structured_data_signature_request`](Self::structured_data_signature_request).
    pub async fn signature_request(
        &self,
        signature_request: impl Into<String>,
    ) -> Result<SignatureData> {
        self.user_call(RequestKind::SignatureRequest, signature_request.into())
            .await
    }

    /// Requests app authentication. Resolves with the response token.
    ///
    /// # Errors
    ///
    /// Same as [`structured_data_signature_request`](Self::structured_data_signature_request).
    pub async fn authentication_request(
        &self,
        authentication_request: impl Into<String>,
    ) -> Result<String> {
        self.user_call(
            RequestKind::AuthenticationRequest,
            authentication_request.into(),
        )
        .await
    }

    /// Requests that a transaction be signed and broadcast.
    ///
    /// # Errors
    ///
    /// Same as [`structured_data_signature_request`](Self::structured_data_signature_request).
    pub async fn transaction_request(
        &self,
        transaction_request: impl Into<String>,
    ) -> Result<TransactionResult> {
        self.user_call(RequestKind::TransactionRequest, transaction_request.into())
            .await
    }

    /// Requests a public profile update.
    ///
    /// # Errors
    ///
    /// Same as [`structured_data_signature_request`](Self::structured_data_signature_request).
    pub async fn profile_update_request(
        &self,
        profile_update_request: impl Into<String>,
    ) -> Result<PublicProfile> {
        self.user_call(
            RequestKind::ProfileUpdateRequest,
            profile_update_request.into(),
        )
        .await
    }

    /// Returns static product metadata. No channel traffic.
    #[must_use]
    pub fn get_product_info(&self) -> ProductInfo {
        self.inner.options.product_info.clone()
    }

    /// Generic request entry point. Not implemented: always fails, sends
    /// nothing.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::Unimplemented`].
    pub async fn request(&self, method: &str) -> Result<Map<String, Value>> {
        debug!(method, "Generic request called");
        Err(Error::unimplemented("request"))
    }
}

// ============================================================================
// Provider - Internal
// ============================================================================

impl Provider {
    /// Runs a user-facing call and decodes its result.
    async fn user_call<T: DeserializeOwned>(
        &self,
        kind: RequestKind,
        request: String,
    ) -> Result<T> {
        let value = self
            .call(kind, Some(Value::String(request)), Map::new())
            .await?;
        decode(kind, value)
    }

    /// Registers, delivers and awaits one call.
    async fn call(
        &self,
        kind: RequestKind,
        request: Option<Value>,
        params: Map<String, Value>,
    ) -> Result<Value> {
        let call_id = CallId::generate();
        let matcher = CallMatcher::new(kind, call_id, request.clone());

        let pending = self
            .inner
            .correlator
            .register(kind, move |envelope| matcher.matches(envelope));

        let _in_flight = InFlight::enter(&self.inner.in_flight);
        self.deliver(kind, call_id, request, params);

        let deadline = kind
            .is_metadata()
            .then_some(self.inner.options.metadata_timeout);

        match pending.settle(deadline).await? {
            Outcome::Resolved(value) => Ok(value),
            Outcome::Cancelled => {
                debug!(%kind, %call_id, "User cancelled");
                Err(Error::user_cancelled(kind.method()))
            }
            Outcome::TimedOut => {
                let timeout_ms = u64::try_from(self.inner.options.metadata_timeout.as_millis())
                    .unwrap_or(u64::MAX);
                Err(Error::timeout(kind.method(), timeout_ms))
            }
            Outcome::StillPending => match self.inner.options.malformed_policy {
                MalformedPolicy::Reject => Err(Error::malformed_response(
                    kind.response_method(),
                    "neither a result nor \"cancel\"",
                )),
                MalformedPolicy::Hold => {
                    warn!(%kind, %call_id, "Holding call after malformed response");
                    future::pending::<Result<Value>>().await
                }
            },
        }
    }

    /// Hands the request to the relay by the kind's delivery route.
    fn deliver(
        &self,
        kind: RequestKind,
        call_id: CallId,
        request: Option<Value>,
        params: Map<String, Value>,
    ) {
        match kind.delivery() {
            Delivery::Direct => {
                debug!(%kind, %call_id, "Writing request to channel");
                self.inner
                    .correlator
                    .channel()
                    .send(Envelope::request(kind, call_id, params));
            }
            Delivery::Signal { name, .. } => {
                debug!(%kind, %call_id, signal = name, "Emitting request signal");
                let request = request.unwrap_or(Value::Null);
                if let Some(signal) = Signal::request(kind, call_id, request) {
                    self.inner.signals.emit(signal);
                }
            }
        }
    }
}

/// Decodes a success value into the operation's result type.
fn decode<T: DeserializeOwned>(kind: RequestKind, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!(%kind, error = %e, "Result does not decode");
        Error::Json(e)
    })
}

// ============================================================================
// InFlight
// ============================================================================

/// Counts a call as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================
