//! Wire message types.
//!
//! This module defines the messages exchanged between the page side
//! (provider) and the privileged relay.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Carrier | Purpose |
//! |--------------|-----------|---------|---------|
//! | `Envelope` (request) | Page → Relay | channel | Metadata-only call |
//! | `Signal` | Page → Relay | signal bus | Open a user-facing flow |
//! | `Envelope` (response) | Relay → Page | channel | Result or `"cancel"` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Envelope and Signal types, source tags |
//! | `kind` | Request kinds and their per-kind contract |
//! | `payload` | Typed success payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope and Signal message types.
pub mod envelope;

/// Request kinds.
pub mod kind;

/// Typed success payloads.
pub mod payload;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{CALLER_TAG, CANCEL_SENTINEL, Envelope, RESPONDER_TAG, Signal};
pub use kind::{Delivery, RequestKind, ResponseShape};
pub use payload::{PublicProfile, SignatureData, TransactionResult};
