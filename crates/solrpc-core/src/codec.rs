//! Request codec: build request bodies and parse response bodies.
//!
//! The codec owns the JSON-RPC version string and the request id counter, so
//! every component that builds requests shares one id sequence instead of a
//! process-wide global.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcId, RpcParam};

/// Builds `JsonRpcRequest`s with unique, positive ids and (de)serializes them.
#[derive(Debug)]
pub struct RequestCodec {
    json_rpc_version: String,
    next_id: AtomicU64,
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new(crate::request::JSONRPC_VERSION)
    }
}

impl RequestCodec {
    pub fn new(json_rpc_version: impl Into<String>) -> Self {
        Self {
            json_rpc_version: json_rpc_version.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// JSON-RPC version stamped on every request.
    pub fn json_rpc_version(&self) -> &str {
        &self.json_rpc_version
    }

    /// Allocate the next request id (starts at 1, never 0).
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a request with a freshly allocated id.
    pub fn request(&self, method: impl Into<String>, params: Vec<RpcParam>) -> JsonRpcRequest {
        self.build(self.next_id(), method.into(), params)
    }

    /// Build a request with a caller-supplied id. The id must be positive.
    pub fn request_with_id(
        &self,
        id: u64,
        method: impl Into<String>,
        params: Vec<RpcParam>,
    ) -> Result<JsonRpcRequest, TransportError> {
        if id == 0 {
            return Err(TransportError::InvalidParams(
                "request id must be a positive integer".into(),
            ));
        }
        Ok(self.build(id, method.into(), params))
    }

    /// Serialize a request into the text frame / HTTP body sent on the wire.
    pub fn encode(&self, req: &JsonRpcRequest) -> Result<String, TransportError> {
        Ok(serde_json::to_string(req)?)
    }

    /// Parse a raw response body.
    ///
    /// Node-side errors are kept inside the response; use
    /// [`JsonRpcResponse::into_result`] to split them out.
    pub fn decode(&self, body: &str) -> Result<JsonRpcResponse, TransportError> {
        Ok(serde_json::from_str(body)?)
    }

    fn build(&self, id: u64, method: String, params: Vec<RpcParam>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: self.json_rpc_version.clone(),
            id: RpcId::Number(id),
            method,
            params,
        }
    }
}
