//! Builder pattern for provider construction.
//!
//! # Example
//!
//! ```no_run
//! use inpage_bridge::{Channel, Provider};
//!
//! # async fn example() -> inpage_bridge::Result<()> {
//! let channel = Channel::new();
//! let provider = Provider::builder().channel(channel).build()?;
//! let url = provider.get_url().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{Channel, SignalBus, SignalEmitter};

use super::core::Provider;
use super::options::{MalformedPolicy, ProviderOptions};
use super::product::ProductInfo;

// ============================================================================
// ProviderBuilder
// ============================================================================

/// Builder for configuring a [`Provider`] instance.
///
/// Use [`Provider::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ProviderBuilder {
    /// Tab channel.
    channel: Option<Channel>,
    /// Outbound signal sink.
    signals: Option<Arc<dyn SignalEmitter>>,
    /// Options.
    options: ProviderOptions,
}

// ============================================================================
// ProviderBuilder Implementation
// ============================================================================

impl ProviderBuilder {
    /// Creates a builder with no collaborators and default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tab channel. Required.
    #[inline]
    #[must_use]
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Sets the signal emitter.
    ///
    /// Defaults to a fresh [`SignalBus`] nobody listens on, which is only
    /// useful for the metadata-only call.
    #[inline]
    #[must_use]
    pub fn signals(mut self, signals: Arc<dyn SignalEmitter>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the metadata-only call deadline.
    #[inline]
    #[must_use]
    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.options.metadata_timeout = timeout;
        self
    }

    /// Sets the malformed-response policy.
    #[inline]
    #[must_use]
    pub fn malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.options.malformed_policy = policy;
        self
    }

    /// Overrides the product metadata.
    #[inline]
    #[must_use]
    pub fn product_info(mut self, info: ProductInfo) -> Self {
        self.options.product_info = info;
        self
    }

    /// Builds the provider with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no channel is set
    /// - [`Error::Config`] if the metadata timeout is zero
    pub fn build(self) -> Result<Provider> {
        let channel = self.channel.ok_or_else(|| {
            Error::config(
                "Channel is required. Use .channel() to set it.\n\
                 Example: Provider::builder().channel(Channel::new())",
            )
        })?;

        if self.options.metadata_timeout.is_zero() {
            return Err(Error::config("Metadata timeout must be greater than zero"));
        }

        let signals = self
            .signals
            .unwrap_or_else(|| Arc::new(SignalBus::new()) as Arc<dyn SignalEmitter>);

        Ok(Provider::new(channel, signals, self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================
