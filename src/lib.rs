//! Inpage provider bridge for a browser-extension wallet.
//!
//! This library implements the page-side half of the bridge between
//! untrusted page scripts and the privileged extension context that holds
//! keys and asks the user for consent.
//!
//! # Architecture
//!
//! - **Page side (this crate)**: exposes a [`Provider`], delivers requests,
//!   correlates responses
//! - **Privileged relay (external)**: opens the consent flow, writes the
//!   result or `"cancel"` back onto the shared channel
//!
//! Key design principles:
//!
//! - Every call owns its own channel subscription, removed on every exit path
//! - Every call mints a [`CallId`]; responses that echo it cannot be confused
//! - The channel is open and unordered, so responses are filtered by source
//!   tag, method and payload identity
//! - Only the metadata-only call has a deadline; user-facing calls wait for
//!   the user
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use inpage_bridge::{Channel, Provider, Result, SignalBus, SignalEmitter};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let channel = Channel::new();
//!     let signals = Arc::new(SignalBus::new());
//!
//!     let provider = Provider::builder()
//!         .channel(channel.clone())
//!         .signals(signals.clone() as Arc<dyn SignalEmitter>)
//!         .build()?;
//!
//!     match provider.transaction_request("<signed request token>").await {
//!         Ok(result) => println!("broadcast {}", result.tx_id),
//!         Err(e) if e.is_cancelled() => println!("declined"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`correlator`] | Request/response correlation |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Envelope, signal and payload types |
//! | [`provider`] | The provider facade |
//! | [`transport`] | Shared channel and signal emitter |

// ============================================================================
// Modules
// ============================================================================

/// Request/response correlation over the shared channel.
pub mod correlator;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire message types.
pub mod protocol;

/// Provider facade.
pub mod provider;

/// Channel and signal transport.
pub mod transport;

#[cfg(test)]
mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Correlation types
pub use correlator::{CallMatcher, Correlator, Outcome, PendingCall};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CallId, SubscriptionId};

// Protocol types
pub use protocol::{
    CALLER_TAG, CANCEL_SENTINEL, Envelope, PublicProfile, RESPONDER_TAG, RequestKind,
    SignatureData, Signal, TransactionResult,
};

// Provider types
pub use provider::{
    MalformedPolicy, ProductInfo, ProductMeta, Provider, ProviderBuilder, ProviderOptions,
};

// Transport types
pub use transport::{Channel, ClaimGate, SignalBus, SignalEmitter, Subscription};
