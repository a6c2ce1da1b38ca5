//! Provider configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use inpage_bridge::{MalformedPolicy, ProviderOptions};
//!
//! let options = ProviderOptions::new()
//!     .with_metadata_timeout(Duration::from_millis(500))
//!     .with_malformed_policy(MalformedPolicy::Reject);
//!
//! assert_eq!(options.metadata_timeout, Duration::from_millis(500));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::product::ProductInfo;

// ============================================================================
// Constants
// ============================================================================

/// Deadline for the metadata-only call.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_millis(1000);

// ============================================================================
// MalformedPolicy
// ============================================================================

/// What a call does when its correlated response is neither a success
/// value nor `"cancel"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Never settle. Matches the deployed extension.
    #[default]
    Hold,
    /// Fail with [`Error::MalformedResponse`](crate::Error::MalformedResponse).
    Reject,
}

// ============================================================================
// ProviderOptions
// ============================================================================

/// Provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Deadline for [`Provider::get_url`](crate::Provider::get_url).
    pub metadata_timeout: Duration,

    /// Handling of malformed correlated responses.
    pub malformed_policy: MalformedPolicy,

    /// Static metadata returned by
    /// [`Provider::get_product_info`](crate::Provider::get_product_info).
    pub product_info: ProductInfo,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            malformed_policy: MalformedPolicy::default(),
            product_info: ProductInfo::from_build(),
        }
    }
}

impl ProviderOptions {
    /// Creates options with defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metadata-only call deadline.
    #[inline]
    #[must_use]
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Sets the malformed-response policy.
    #[inline]
    #[must_use]
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    /// Overrides the product metadata.
    #[inline]
    #[must_use]
    pub fn with_product_info(mut self, info: ProductInfo) -> Self {
        self.product_info = info;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
