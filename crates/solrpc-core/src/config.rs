//! Client configuration values and shared option enums.
//!
//! Every client takes a `ClientConfig` at construction; there is no
//! process-wide default endpoint.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::request::JSONRPC_VERSION;

/// Bank state a request is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl std::str::FromStr for Commitment {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(TransportError::InvalidParams(format!(
                "unknown commitment: {other}"
            ))),
        }
    }
}

/// Account data encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "base58")]
    Base58,
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "base64+zstd")]
    Base64Zstd,
    #[serde(rename = "jsonParsed")]
    JsonParsed,
}

impl std::str::FromStr for Encoding {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base58" => Ok(Self::Base58),
            "base64" => Ok(Self::Base64),
            "base64+zstd" => Ok(Self::Base64Zstd),
            "jsonParsed" => Ok(Self::JsonParsed),
            other => Err(TransportError::InvalidParams(format!(
                "unknown encoding: {other}"
            ))),
        }
    }
}

/// Endpoint and protocol settings passed to each client constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Node endpoint (`https://` for HTTP, `ws://`/`wss://` for pubsub).
    pub endpoint: String,
    /// JSON-RPC version string stamped on requests.
    #[serde(default = "default_version")]
    pub json_rpc_version: String,
    /// Commitment applied by typed HTTP methods when the caller sets none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

impl ClientConfig {
    /// Build a config for `endpoint`. Blank endpoints are rejected.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let config = Self {
            endpoint: endpoint.into(),
            json_rpc_version: default_version(),
            commitment: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn with_json_rpc_version(mut self, version: impl Into<String>) -> Self {
        self.json_rpc_version = version.into();
        self
    }

    /// Check the invariants a deserialized config may have skipped.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.endpoint.trim().is_empty() {
            return Err(TransportError::Config(
                "endpoint is missing; pass one to the client explicitly".into(),
            ));
        }
        if self.json_rpc_version.trim().is_empty() {
            return Err(TransportError::Config("json_rpc_version is empty".into()));
        }
        Ok(())
    }
}
