//! Envelope and signal message types.
//!
//! # Format
//!
//! Request (page → relay, direct kinds only):
//!
//! ```json
//! { "method": "getURL", "source": "blockstack-app", "callId": "uuid" }
//! ```
//!
//! Response (relay → page):
//!
//! ```json
//! {
//!   "method": "transactionResponse",
//!   "source": "blockstack-extension",
//!   "callId": "uuid",
//!   "payload": {
//!     "transactionRequest": "<echoed request>",
//!     "transactionResponse": { "txId": "0x…", "txRaw": "…" }
//!   }
//! }
//! ```
//!
//! `callId` is optional on responses. Relays that do not echo it are
//! correlated by the echoed request value alone.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::CallId;

use super::kind::{Delivery, RequestKind};

// ============================================================================
// Constants
// ============================================================================

/// Source tag stamped on everything the page side writes.
pub const CALLER_TAG: &str = "blockstack-app";

/// Source tag the privileged relay stamps on its responses.
pub const RESPONDER_TAG: &str = "blockstack-extension";

/// Response value signalling that the user declined.
pub const CANCEL_SENTINEL: &str = "cancel";

// ============================================================================
// Envelope
// ============================================================================

/// A tagged message on the channel, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Request method or response method.
    pub method: String,

    /// Origin tag of the writer.
    pub source: String,

    /// Correlation id of the call this message belongs to.
    #[serde(rename = "callId", default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<CallId>,

    /// Kind-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Top-level fields outside the fixed header (request parameters,
    /// metadata-only results).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Creates a page-side request envelope for a direct kind.
    ///
    /// `params` are spread into the top level, next to the header fields.
    #[must_use]
    pub fn request(kind: RequestKind, call_id: CallId, params: Map<String, Value>) -> Self {
        Self {
            method: kind.method().to_string(),
            source: CALLER_TAG.to_string(),
            call_id: Some(call_id),
            payload: None,
            extra: params,
        }
    }

    /// Creates a relay-side response envelope for `kind` with no body.
    ///
    /// Fill it with [`with_payload`](Self::with_payload),
    /// [`with_field`](Self::with_field) or use one of the shorthands.
    #[must_use]
    pub fn response(kind: RequestKind) -> Self {
        Self {
            method: kind.response_method().to_string(),
            source: RESPONDER_TAG.to_string(),
            call_id: None,
            payload: None,
            extra: Map::new(),
        }
    }

    /// Creates the relay-side answer to `kind` carrying `result`.
    ///
    /// For signal kinds the payload echoes `request`; for direct kinds the
    /// result goes to the top level and `request` is ignored.
    #[must_use]
    pub fn answer(kind: RequestKind, request: &Value, result: Value) -> Self {
        let envelope = Self::response(kind);
        match kind.delivery() {
            Delivery::Direct => envelope.with_field(kind.response_field(), result),
            Delivery::Signal { field, .. } => {
                let mut payload = Map::new();
                payload.insert(field.to_string(), request.clone());
                payload.insert(kind.response_field().to_string(), result);
                envelope.with_payload(Value::Object(payload))
            }
        }
    }

    /// Creates the relay-side cancellation of `kind` for `request`.
    #[must_use]
    pub fn cancel(kind: RequestKind, request: &Value) -> Self {
        Self::answer(kind, request, Value::String(CANCEL_SENTINEL.to_string()))
    }

    /// Sets the correlation id.
    #[inline]
    #[must_use]
    pub fn with_call_id(mut self, call_id: CallId) -> Self {
        self.call_id = Some(call_id);
        self
    }

    /// Overrides the source tag.
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sets the payload.
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets a top-level field.
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns `true` if the envelope was written by `source`.
    #[inline]
    #[must_use]
    pub fn is_from(&self, source: &str) -> bool {
        self.source == source
    }

    /// Returns `true` if the payload is present and not `null`.
    #[inline]
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| !p.is_null())
    }

    /// Returns the request value a relay echoed back for `kind`.
    ///
    /// Direct kinds echo nothing.
    #[must_use]
    pub fn echoed_request(&self, kind: RequestKind) -> Option<&Value> {
        match kind.delivery() {
            Delivery::Direct => None,
            Delivery::Signal { field, .. } => self.payload.as_ref()?.get(field),
        }
    }

    /// Returns the result value for `kind`, if the envelope carries one.
    #[must_use]
    pub fn response_value(&self, kind: RequestKind) -> Option<&Value> {
        match kind.delivery() {
            Delivery::Direct => self.extra.get(kind.response_field()),
            Delivery::Signal { .. } => self.payload.as_ref()?.get(kind.response_field()),
        }
    }
}

// ============================================================================
// Signal
// ============================================================================

/// One-way notification that wakes the privileged relay.
///
/// # Format
///
/// ```json
/// { "name": "signatureRequest", "detail": { "signatureRequest": "…", "callId": "uuid" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name.
    pub name: String,

    /// Signal detail.
    pub detail: Value,
}

impl Signal {
    /// Creates the signal announcing a request of `kind`.
    ///
    /// Returns `None` for direct kinds, which never signal.
    #[must_use]
    pub fn request(kind: RequestKind, call_id: CallId, request: Value) -> Option<Self> {
        let Delivery::Signal { name, field } = kind.delivery() else {
            return None;
        };

        let mut detail = Map::new();
        detail.insert(field.to_string(), request);
        detail.insert("callId".to_string(), Value::String(call_id.to_string()));

        Some(Self {
            name: name.to_string(),
            detail: Value::Object(detail),
        })
    }

    /// Returns the request kind this signal announces.
    #[must_use]
    pub fn kind(&self) -> Option<RequestKind> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| {
                matches!(kind.delivery(), Delivery::Signal { name, .. } if name == self.name)
            })
    }

    /// Returns the request value carried in the detail.
    #[must_use]
    pub fn request_value(&self) -> Option<&Value> {
        match self.kind()?.delivery() {
            Delivery::Signal { field, .. } => self.detail.get(field),
            Delivery::Direct => None,
        }
    }

    /// Returns the correlation id carried in the detail.
    #[must_use]
    pub fn call_id(&self) -> Option<CallId> {
        self.detail
            .get("callId")
            .and_then(Value::as_str)
            .and_then(CallId::parse)
    }
}

// ============================================================================
// Tests
// ============================================================================
