//! Pubsub client: pick a subscription kind, get a resilient stream.
//!
//! Each subscribe call builds its request through the
//! [`SubscriptionCatalog`] and runs it on a fresh [`SubscriptionChannel`],
//! so one client can serve several sequential or concurrent subscriptions
//! without sharing socket state between them.

use std::sync::Arc;

use solrpc_core::codec::RequestCodec;
use solrpc_core::config::ClientConfig;
use solrpc_core::error::TransportError;
use solrpc_core::request::JsonRpcRequest;
use solrpc_core::store::MessageStore;

use crate::channel::{HandlerAction, SubscriptionChannel, WsClientConfig};
use crate::subscriptions::{
    AccountSubscribeConfig, BlockSubscribeConfig, BlockSubscribeFilter, LogsFilter,
    LogsSubscribeConfig, ProgramSubscribeConfig, SignatureSubscribeConfig, SubscriptionCatalog,
    SubscriptionKind,
};
use crate::transport::{SocketConnector, TungsteniteConnector};

/// WebSocket pubsub client.
pub struct PubsubClient {
    endpoint: String,
    config: WsClientConfig,
    catalog: SubscriptionCatalog,
    connector: Arc<dyn SocketConnector>,
    store: Option<Arc<dyn MessageStore>>,
}

impl PubsubClient {
    /// Build a client from an explicit configuration.
    pub fn new(client: &ClientConfig, config: WsClientConfig) -> Result<Self, TransportError> {
        client.validate()?;
        let codec = Arc::new(RequestCodec::new(client.json_rpc_version.clone()));
        let this = Self {
            endpoint: client.endpoint.clone(),
            config,
            catalog: SubscriptionCatalog::new(codec),
            connector: Arc::new(TungsteniteConnector),
            store: None,
        };
        // Surface a bad endpoint at construction, not on first subscribe.
        this.channel()?;
        Ok(this)
    }

    /// Shorthand for a client on `endpoint` with default settings.
    pub fn default_for(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(&ClientConfig::new(endpoint)?, WsClientConfig::default())
    }

    pub fn with_connector(mut self, connector: Arc<dyn SocketConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn catalog(&self) -> &SubscriptionCatalog {
        &self.catalog
    }

    /// A new channel wired with this client's connector and store.
    pub fn channel(&self) -> Result<SubscriptionChannel, TransportError> {
        let channel = SubscriptionChannel::new(self.endpoint.clone(), self.config.clone())?
            .with_connector(Arc::clone(&self.connector));
        Ok(match &self.store {
            Some(store) => channel.with_store(Arc::clone(store)),
            None => channel,
        })
    }

    /// Run an already-built subscribe request until the handler stops it.
    pub async fn subscribe<F, R>(
        &self,
        request: &JsonRpcRequest,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let body = self.catalog.codec().encode(request)?;
        tracing::debug!(method = %request.method, id = %request.id, "starting subscription");
        self.channel()?.connect(&body, on_message).await
    }

    pub async fn account_subscribe<F, R>(
        &self,
        pubkey: &str,
        config: &AccountSubscribeConfig,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let req = self.catalog.account_subscribe(pubkey, config)?;
        self.subscribe(&req, on_message).await
    }

    pub async fn block_subscribe<F, R>(
        &self,
        filter: &BlockSubscribeFilter,
        config: &BlockSubscribeConfig,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let req = self.catalog.block_subscribe(filter, config)?;
        self.subscribe(&req, on_message).await
    }

    pub async fn logs_subscribe<F, R>(
        &self,
        filter: &LogsFilter,
        config: &LogsSubscribeConfig,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let req = self.catalog.logs_subscribe(filter, config)?;
        self.subscribe(&req, on_message).await
    }

    pub async fn program_subscribe<F, R>(
        &self,
        program_id: &str,
        config: &ProgramSubscribeConfig,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let req = self.catalog.program_subscribe(program_id, config)?;
        self.subscribe(&req, on_message).await
    }

    pub async fn signature_subscribe<F, R>(
        &self,
        signature: &str,
        config: &SignatureSubscribeConfig,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let req = self.catalog.signature_subscribe(signature, config)?;
        self.subscribe(&req, on_message).await
    }

    /// Subscribe to one of the parameterless kinds (slot, slots-updates, root, vote).
    pub async fn simple_subscribe<F, R>(
        &self,
        kind: SubscriptionKind,
        on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let req = self.catalog.simple_subscribe(kind)?;
        self.subscribe(&req, on_message).await
    }

    /// The request that ends `subscription_id` of `kind`.
    pub fn unsubscribe_request(&self, kind: SubscriptionKind, subscription_id: u64) -> JsonRpcRequest {
        self.catalog.unsubscribe(kind, subscription_id)
    }
}

impl std::fmt::Debug for PubsubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubsubClient")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .finish()
    }
}
