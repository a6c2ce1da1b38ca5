//! Transport layer between the page side and the privileged relay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐          Signal (one-way)         ┌─────────────────┐
//! │  Page (Rust)    │──────────────────────────────────►│  Privileged     │
//! │                 │                                   │  relay          │
//! │  Provider       │          Channel (shared)         │                 │
//! │  → Correlator   │◄─────────────────────────────────►│                 │
//! └─────────────────┘   unordered, best-effort, open    └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Shared message channel and subscription registry |
//! | `signal` | Outbound signal emitter |

// ============================================================================
// Submodules
// ============================================================================

/// Shared message channel and subscription registry.
pub mod channel;

/// Outbound signal emitter.
pub mod signal;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, ClaimGate, Handler, Predicate, Subscription};
pub use signal::{SignalBus, SignalEmitter};
