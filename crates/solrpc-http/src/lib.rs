//! solrpc-http: HTTP JSON-RPC transport for solrpc.
//!
//! # Usage
//! ```rust,no_run
//! use solrpc_http::HttpRpcClient;
//!
//! # async fn run() -> Result<(), solrpc_core::TransportError> {
//! let client = HttpRpcClient::default_for("https://api.devnet.solana.com")?;
//! let slot = client.get_slot(None).await?;
//! println!("slot {slot}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod methods;

pub use client::{HttpClientConfig, HttpRpcClient};
pub use methods::{
    AccountInfoConfig, DataSlice, RpcContext, RpcResponse, RpcVersionInfo, TokenAccountsFilter,
};
