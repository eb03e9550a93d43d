//! Public cluster endpoints.
//!
//! Free, no-API-key endpoints suitable for development and testing. Rate
//! limits are low and availability varies.

use crate::error::TransportError;

/// A well-known cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    MainnetBeta,
    Testnet,
    Devnet,
    Localnet,
}

impl Cluster {
    pub const ALL: [Cluster; 4] = [
        Cluster::MainnetBeta,
        Cluster::Testnet,
        Cluster::Devnet,
        Cluster::Localnet,
    ];

    /// JSON-RPC over HTTP endpoint.
    pub fn http_url(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Pubsub WebSocket endpoint.
    pub fn ws_url(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "wss://api.mainnet-beta.solana.com",
            Self::Testnet => "wss://api.testnet.solana.com",
            Self::Devnet => "wss://api.devnet.solana.com",
            Self::Localnet => "ws://127.0.0.1:8900",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
            Self::Localnet => "localnet",
        }
    }
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Cluster {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet-beta" | "mainnet" => Ok(Self::MainnetBeta),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            "localnet" | "localhost" => Ok(Self::Localnet),
            other => Err(TransportError::Config(format!("unknown cluster: {other}"))),
        }
    }
}
