//! Provider facade handed to page scripts.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Provider`] | One async operation per request kind |
//! | [`ProviderBuilder`] | Fluent construction with validation |
//! | [`ProviderOptions`] | Timeout, malformed-response policy, metadata |
//! | [`ProductInfo`] | Static build metadata |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for provider construction.
pub mod builder;

/// Core provider implementation.
pub mod core;

/// Provider options.
pub mod options;

/// Static product metadata.
pub mod product;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ProviderBuilder;
pub use core::Provider;
pub use options::{DEFAULT_METADATA_TIMEOUT, MalformedPolicy, ProviderOptions};
pub use product::{PRODUCT_NAME, ProductInfo, ProductMeta};
