//! Static product metadata.
//!
//! Sourced from build-time constants: the crate version, plus the `BRANCH`
//! and `COMMIT_SHA` environment variables at compile time.

use serde::{Deserialize, Serialize};

/// Product name reported to page scripts.
pub const PRODUCT_NAME: &str = "Hiro Wallet for Web";

/// Result of [`Provider::get_product_info`](crate::Provider::get_product_info).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Release version.
    pub version: String,
    /// Product name.
    pub name: String,
    /// Build identifiers.
    pub meta: ProductMeta,
}

/// Build identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMeta {
    /// Source branch. Empty when not provided at build time.
    pub tag: String,
    /// Source commit. Empty when not provided at build time.
    pub commit: String,
}

impl ProductInfo {
    /// Metadata baked in at compile time.
    #[must_use]
    pub fn from_build() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: PRODUCT_NAME.to_string(),
            meta: ProductMeta {
                tag: option_env!("BRANCH").unwrap_or_default().to_string(),
                commit: option_env!("COMMIT_SHA").unwrap_or_default().to_string(),
            },
        }
    }
}
