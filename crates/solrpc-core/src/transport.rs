//! The `RpcTransport` trait: request/response transports (HTTP).
//!
//! The pubsub side has its own socket abstraction in `solrpc-ws`; this trait
//! only covers one-shot calls.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::codec::RequestCodec;
use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcParam};

/// The async trait every request/response transport implements.
///
/// Implementations must be `Send + Sync` and the trait is object-safe, so a
/// transport can be stored as `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Send a batch of JSON-RPC requests.
    ///
    /// Default implementation sends them sequentially; override for true batching.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let mut responses = Vec::with_capacity(reqs.len());
        for req in reqs {
            responses.push(self.send(req).await?);
        }
        Ok(responses)
    }

    /// Return the transport's endpoint URL.
    fn url(&self) -> &str;

    /// Return the codec used to number and encode requests.
    fn codec(&self) -> &RequestCodec;

    /// Convenience: call a method and deserialize the result.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<RpcParam>,
    ) -> Result<T, TransportError>
    where
        Self: Sized,
    {
        let req = self.codec().request(method, params);
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }
}
