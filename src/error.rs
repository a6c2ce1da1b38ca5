//! Error types for the inpage provider bridge.
//!
//! Every error is local to a single pending call: a cancellation or timeout
//! on one call never touches another in-flight call.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use inpage_bridge::{Error, Result};
//!
//! async fn example(provider: &Provider) -> Result<()> {
//!     match provider.transaction_request(token).await {
//!         Ok(result) => println!("broadcast {}", result.tx_id),
//!         Err(e) if e.is_cancelled() => println!("user declined"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | User | [`Error::UserCancelled`] |
//! | Timing | [`Error::Timeout`] |
//! | Surface | [`Error::Unimplemented`], [`Error::Config`] |
//! | Protocol | [`Error::MalformedResponse`], [`Error::ChannelClosed`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Call Outcomes
    // ========================================================================
    /// The privileged side reported that the user declined.
    ///
    /// Displays as the cancellation sentinel.
    #[error("cancel")]
    UserCancelled {
        /// Request method that was declined.
        method: String,
    },

    /// No response arrived within the allotted window.
    #[error("Unable to get response from wallet extension: {method} timed out after {timeout_ms}ms")]
    Timeout {
        /// Request method that timed out.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Operation exists on the provider surface but has no implementation.
    #[error("`{method}` function is not implemented")]
    Unimplemented {
        /// Name of the unimplemented operation.
        method: String,
    },

    /// A correlated response had neither the success shape nor the
    /// cancellation sentinel.
    ///
    /// Only surfaced under [`MalformedPolicy::Reject`](crate::MalformedPolicy).
    #[error("Malformed {method} response: {message}")]
    MalformedResponse {
        /// Response method that carried the malformed payload.
        method: String,
        /// What was wrong with it.
        message: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// The channel was shut down (page teardown) before the call settled.
    #[error("Channel closed")]
    ChannelClosed,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Provider configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON decoding of a success payload failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RecvError> for Error {
    fn from(_: RecvError) -> Self {
        Self::ChannelClosed
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a user cancelled error.
    #[inline]
    pub fn user_cancelled(method: impl Into<String>) -> Self {
        Self::UserCancelled {
            method: method.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates an unimplemented error.
    #[inline]
    pub fn unimplemented(method: impl Into<String>) -> Self {
        Self::Unimplemented {
            method: method.into(),
        }
    }

    /// Creates a malformed response error.
    #[inline]
    pub fn malformed_response(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the user declined the request.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if re-invoking the operation may succeed.
    ///
    /// A retry is always a brand-new pending call.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::UserCancelled { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
