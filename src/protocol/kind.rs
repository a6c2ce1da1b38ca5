//! Request kinds and their per-kind wire contract.
//!
//! Each [`RequestKind`] fixes how the request travels (direct channel write
//! or signal), which method the response carries, where the result lives in
//! the response, and what shape a successful result must have.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// RequestKind
// ============================================================================

/// Operation identifier. Closed set, extended only by adding variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    /// Metadata-only call: asks the relay for the extension URL.
    #[serde(rename = "getURL")]
    GetUrl,
    /// Structured (SIP-018 style) data signature.
    StructuredDataSignatureRequest,
    /// Plain message signature.
    SignatureRequest,
    /// App authentication.
    AuthenticationRequest,
    /// Transaction signing and broadcast.
    TransactionRequest,
    /// Public profile update.
    ProfileUpdateRequest,
}

impl RequestKind {
    /// Every kind, in declaration order.
    pub const ALL: [RequestKind; 6] = [
        Self::GetUrl,
        Self::StructuredDataSignatureRequest,
        Self::SignatureRequest,
        Self::AuthenticationRequest,
        Self::TransactionRequest,
        Self::ProfileUpdateRequest,
    ];

    /// Returns the request method tag.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::GetUrl => "getURL",
            Self::StructuredDataSignatureRequest => "structuredDataSignatureRequest",
            Self::SignatureRequest => "signatureRequest",
            Self::AuthenticationRequest => "authenticationRequest",
            Self::TransactionRequest => "transactionRequest",
            Self::ProfileUpdateRequest => "profileUpdateRequest",
        }
    }

    /// Returns the method tag the relay answers with.
    ///
    /// Both signature kinds share `signatureResponse`.
    #[must_use]
    pub const fn response_method(self) -> &'static str {
        match self {
            Self::GetUrl => "getURLResponse",
            Self::StructuredDataSignatureRequest | Self::SignatureRequest => "signatureResponse",
            Self::AuthenticationRequest => "authenticationResponse",
            Self::TransactionRequest => "transactionResponse",
            Self::ProfileUpdateRequest => "profileUpdateResponse",
        }
    }

    /// Returns how the request reaches the relay.
    #[must_use]
    pub const fn delivery(self) -> Delivery {
        match self {
            Self::GetUrl => Delivery::Direct,
            Self::StructuredDataSignatureRequest => Delivery::Signal {
                name: "structuredDataSignatureRequest",
                field: "signatureRequest",
            },
            Self::SignatureRequest => Delivery::Signal {
                name: "signatureRequest",
                field: "signatureRequest",
            },
            Self::AuthenticationRequest => Delivery::Signal {
                name: "authenticationRequest",
                field: "authenticationRequest",
            },
            Self::TransactionRequest => Delivery::Signal {
                name: "transactionRequest",
                field: "transactionRequest",
            },
            Self::ProfileUpdateRequest => Delivery::Signal {
                name: "profileUpdateRequest",
                field: "profileUpdateRequest",
            },
        }
    }

    /// Returns the key holding the result in a response.
    ///
    /// For [`Delivery::Direct`] kinds the key sits at the top level of the
    /// envelope; for signal kinds it sits inside `payload`.
    #[must_use]
    pub const fn response_field(self) -> &'static str {
        match self {
            Self::GetUrl => "url",
            Self::StructuredDataSignatureRequest | Self::SignatureRequest => "signatureResponse",
            Self::AuthenticationRequest => "authenticationResponse",
            Self::TransactionRequest => "transactionResponse",
            Self::ProfileUpdateRequest => "profileUpdateResponse",
        }
    }

    /// Returns the shape a successful result must have.
    #[must_use]
    pub const fn response_shape(self) -> ResponseShape {
        match self {
            Self::GetUrl => ResponseShape::String,
            Self::AuthenticationRequest => ResponseShape::Any,
            Self::StructuredDataSignatureRequest
            | Self::SignatureRequest
            | Self::TransactionRequest
            | Self::ProfileUpdateRequest => ResponseShape::Object,
        }
    }

    /// Returns `true` for the metadata-only call, the only one with a deadline.
    #[inline]
    #[must_use]
    pub const fn is_metadata(self) -> bool {
        matches!(self.delivery(), Delivery::Direct)
    }

    /// Looks a kind up by its request method tag.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.method() == method)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// How a request reaches the privileged relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Request envelope written straight onto the channel.
    Direct,
    /// Tab-scoped signal that opens the user-facing flow.
    Signal {
        /// Signal name the relay listens for.
        name: &'static str,
        /// Key carrying the request value, in the signal detail and echoed
        /// back in the response payload.
        field: &'static str,
    },
}

// ============================================================================
// ResponseShape
// ============================================================================

/// Success shape of a response value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A JSON string.
    String,
    /// A JSON object.
    Object,
    /// Anything other than the cancellation sentinel.
    Any,
}

impl ResponseShape {
    /// Returns `true` if `value` has this shape.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_round_trip() {
        for kind in RequestKind::ALL {
            assert_eq!(RequestKind::from_method(kind.method()), Some(kind));
        }
        assert_eq!(RequestKind::from_method("request"), None);
    }

    #[test]
    fn test_serde_uses_method_tag() {
        let json = serde_json::to_value(RequestKind::GetUrl).expect("serialize");
        assert_eq!(json, json!("getURL"));
        let kind: RequestKind =
            serde_json::from_value(json!("profileUpdateRequest")).expect("deserialize");
        assert_eq!(kind, RequestKind::ProfileUpdateRequest);
    }

    #[test]
    fn test_signature_kinds_share_response_method() {
        assert_eq!(
            RequestKind::StructuredDataSignatureRequest.response_method(),
            RequestKind::SignatureRequest.response_method()
        );
    }

    #[test]
    fn test_only_get_url_is_direct() {
        let direct: Vec<_> = RequestKind::ALL
            .into_iter()
            .filter(|kind| kind.is_metadata())
            .collect();
        assert_eq!(direct, vec![RequestKind::GetUrl]);
    }

    #[test]
    fn test_response_shapes() {
        assert!(ResponseShape::Object.accepts(&json!({ "txId": "0x1" })));
        assert!(!ResponseShape::Object.accepts(&json!("0x1")));
        assert!(ResponseShape::String.accepts(&json!("chrome-extension://abc")));
        assert!(!ResponseShape::String.accepts(&json!(42)));
        assert!(ResponseShape::Any.accepts(&json!(null)));
    }
}
