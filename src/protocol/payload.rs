//! Typed success payloads returned by the provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of a plain or structured-data signature request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    /// Hex-encoded signature.
    pub signature: String,
    /// Hex-encoded public key of the signer.
    pub public_key: String,
}

/// Result of a transaction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    /// Broadcast transaction id.
    pub tx_id: String,
    /// Hex-encoded raw transaction.
    pub tx_raw: String,
}

/// Updated public profile, passed through as the relay returns it.
pub type PublicProfile = Map<String, Value>;
