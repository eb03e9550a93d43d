//! solrpc-ws: WebSocket pubsub with keepalive and bounded reconnect.
//!
//! # Features
//! - One subscription per [`SubscriptionChannel`], delivered in arrival order
//! - Keepalive probes detect stalled sockets
//! - Bounded reconnect with a fixed pause; resubscribe with the original request
//! - Subscription catalog for account, block, logs, program, signature, slot,
//!   slots-updates, root and vote notifications
//!
//! # Usage
//! ```rust,no_run
//! use solrpc_ws::{HandlerAction, PubsubClient};
//!
//! # async fn run() -> Result<(), solrpc_core::TransportError> {
//! let client = PubsubClient::default_for("wss://api.devnet.solana.com")?;
//! let mut seen = 0;
//! client
//!     .account_subscribe("SysvarC1ock11111111111111111111111111111111", &Default::default(), |msg| {
//!         println!("{msg}");
//!         seen += 1;
//!         if seen == 10 { HandlerAction::Stop } else { HandlerAction::Continue }
//!     })
//!     .await
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod naming;
pub mod subscriptions;
pub mod transport;

pub use channel::{ChannelState, HandlerAction, RetryCounter, SubscriptionChannel, WsClientConfig};
pub use client::PubsubClient;
pub use subscriptions::{
    unsubscribe_request, AccountSubscribeConfig, BlockSubscribeConfig, BlockSubscribeFilter,
    LogsFilter, LogsSubscribeConfig, ProgramSubscribeConfig, SignatureSubscribeConfig,
    SubscriptionCatalog, SubscriptionHandle, SubscriptionKind, TransactionDetails,
};
pub use transport::{SocketConnector, SocketEvent, TransportSocket, TungsteniteConnector};
