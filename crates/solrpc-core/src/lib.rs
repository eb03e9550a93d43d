//! solrpc-core: foundation types for solrpc.
//!
//! # Overview
//!
//! solrpc is a client for a Solana-style JSON-RPC node with two transports:
//! request/response over HTTP and push subscriptions over a WebSocket. The
//! core crate defines:
//!
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`RequestCodec`]: request numbering, encoding and response decoding
//! - [`TransportError`]: structured error type
//! - [`RpcTransport`]: the request/response transport trait
//! - [`ClientConfig`] / [`Cluster`]: explicit endpoint configuration
//! - [`policy`] module: retry policy
//! - [`store`] module: message store fed by pubsub channels

pub mod cluster;
pub mod codec;
pub mod config;
pub mod error;
pub mod policy;
pub mod request;
pub mod store;
pub mod transport;

pub use cluster::Cluster;
pub use codec::RequestCodec;
pub use config::{ClientConfig, Commitment, Encoding};
pub use error::TransportError;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, RpcParam};
pub use store::{InMemoryStore, MessageStore};
pub use transport::RpcTransport;
