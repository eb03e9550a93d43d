//! Subscription method catalog.
//!
//! Turns a subscription intent (kind + identifier + options) into the
//! request the pubsub endpoint expects, and derives the matching unsubscribe
//! request from a confirmation.
//!
//! Params are always `[identifier, options]`; the options object is left out
//! entirely when no option is set.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use solrpc_core::codec::RequestCodec;
use solrpc_core::config::{Commitment, Encoding};
use solrpc_core::error::TransportError;
use solrpc_core::request::{JsonRpcRequest, JsonRpcResponse, RpcId};

use crate::naming;

/// The subscription kinds offered by the pubsub endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    Account,
    Block,
    Logs,
    Program,
    Signature,
    Slot,
    SlotsUpdates,
    Root,
    Vote,
}

impl SubscriptionKind {
    pub const ALL: [SubscriptionKind; 9] = [
        Self::Account,
        Self::Block,
        Self::Logs,
        Self::Program,
        Self::Signature,
        Self::Slot,
        Self::SlotsUpdates,
        Self::Root,
        Self::Vote,
    ];

    /// snake_case stem the method names are derived from.
    pub fn snake_name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Block => "block",
            Self::Logs => "logs",
            Self::Program => "program",
            Self::Signature => "signature",
            Self::Slot => "slot",
            Self::SlotsUpdates => "slots_updates",
            Self::Root => "root",
            Self::Vote => "vote",
        }
    }

    pub fn subscribe_method(&self) -> String {
        naming::subscribe_method(self.snake_name())
    }

    pub fn unsubscribe_method(&self) -> String {
        naming::camel_case(&format!("{}_unsubscribe", self.snake_name()))
    }

    pub fn notification_method(&self) -> String {
        naming::notification_method(self.snake_name())
    }

    /// Whether the subscribe call takes a required identifier.
    pub fn takes_params(&self) -> bool {
        matches!(
            self,
            Self::Account | Self::Block | Self::Logs | Self::Program | Self::Signature
        )
    }
}

impl std::fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.snake_name().replace('_', "-"))
    }
}

impl std::str::FromStr for SubscriptionKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(Self::Account),
            "block" => Ok(Self::Block),
            "logs" => Ok(Self::Logs),
            "program" => Ok(Self::Program),
            "signature" => Ok(Self::Signature),
            "slot" => Ok(Self::Slot),
            "slots-updates" | "slot-updates" | "slots_updates" => Ok(Self::SlotsUpdates),
            "root" => Ok(Self::Root),
            "vote" => Ok(Self::Vote),
            other => Err(TransportError::InvalidParams(format!(
                "unknown subscription kind: {other}"
            ))),
        }
    }
}

// ─── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSubscribeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

/// Which blocks `blockSubscribe` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSubscribeFilter {
    All,
    MentionsAccountOrProgram(String),
}

impl BlockSubscribeFilter {
    fn to_param(&self) -> Value {
        match self {
            Self::All => json!("all"),
            Self::MentionsAccountOrProgram(key) => json!({ "mentionsAccountOrProgram": key }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDetails {
    Full,
    Accounts,
    Signatures,
    None,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSubscribeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_details: Option<TransactionDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_rewards: Option<bool>,
}

/// Which transactions `logsSubscribe` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogsFilter {
    All,
    AllWithVotes,
    Mentions(Vec<String>),
}

impl LogsFilter {
    fn to_param(&self) -> Value {
        match self {
            Self::All => json!("all"),
            Self::AllWithVotes => json!("allWithVotes"),
            Self::Mentions(keys) => json!({ "mentions": keys }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsSubscribeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSubscribeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    /// Account filters such as `{"dataSize": 165}` or `{"memcmp": {...}}`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSubscribeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_received_notification: Option<bool>,
}

// ─── Catalog ──────────────────────────────────────────────────────────────────

/// Builds subscribe / unsubscribe requests for every [`SubscriptionKind`].
#[derive(Debug, Clone)]
pub struct SubscriptionCatalog {
    codec: Arc<RequestCodec>,
}

impl Default for SubscriptionCatalog {
    fn default() -> Self {
        Self::new(Arc::new(RequestCodec::default()))
    }
}

impl SubscriptionCatalog {
    pub fn new(codec: Arc<RequestCodec>) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &RequestCodec {
        &self.codec
    }

    pub fn account_subscribe(
        &self,
        pubkey: &str,
        config: &AccountSubscribeConfig,
    ) -> Result<JsonRpcRequest, TransportError> {
        let id = required("account pubkey", pubkey)?;
        self.build(SubscriptionKind::Account, id, config)
    }

    pub fn block_subscribe(
        &self,
        filter: &BlockSubscribeFilter,
        config: &BlockSubscribeConfig,
    ) -> Result<JsonRpcRequest, TransportError> {
        if let BlockSubscribeFilter::MentionsAccountOrProgram(key) = filter {
            required("block filter pubkey", key)?;
        }
        self.build(SubscriptionKind::Block, filter.to_param(), config)
    }

    pub fn logs_subscribe(
        &self,
        filter: &LogsFilter,
        config: &LogsSubscribeConfig,
    ) -> Result<JsonRpcRequest, TransportError> {
        if let LogsFilter::Mentions(keys) = filter {
            if keys.is_empty() {
                return Err(TransportError::InvalidParams(
                    "logs mentions filter needs at least one pubkey".into(),
                ));
            }
        }
        self.build(SubscriptionKind::Logs, filter.to_param(), config)
    }

    pub fn program_subscribe(
        &self,
        program_id: &str,
        config: &ProgramSubscribeConfig,
    ) -> Result<JsonRpcRequest, TransportError> {
        let id = required("program id", program_id)?;
        self.build(SubscriptionKind::Program, id, config)
    }

    pub fn signature_subscribe(
        &self,
        signature: &str,
        config: &SignatureSubscribeConfig,
    ) -> Result<JsonRpcRequest, TransportError> {
        let id = required("transaction signature", signature)?;
        self.build(SubscriptionKind::Signature, id, config)
    }

    pub fn slot_subscribe(&self) -> JsonRpcRequest {
        self.bare(SubscriptionKind::Slot)
    }

    pub fn slots_updates_subscribe(&self) -> JsonRpcRequest {
        self.bare(SubscriptionKind::SlotsUpdates)
    }

    pub fn root_subscribe(&self) -> JsonRpcRequest {
        self.bare(SubscriptionKind::Root)
    }

    pub fn vote_subscribe(&self) -> JsonRpcRequest {
        self.bare(SubscriptionKind::Vote)
    }

    /// Subscribe request for a kind that takes no identifier.
    pub fn simple_subscribe(&self, kind: SubscriptionKind) -> Result<JsonRpcRequest, TransportError> {
        if kind.takes_params() {
            return Err(TransportError::InvalidParams(format!(
                "{kind} subscriptions need an identifier"
            )));
        }
        Ok(self.bare(kind))
    }

    /// The unsubscribe request for a subscription id of `kind`.
    pub fn unsubscribe(&self, kind: SubscriptionKind, subscription_id: u64) -> JsonRpcRequest {
        self.codec
            .request(kind.unsubscribe_method(), vec![json!(subscription_id)])
    }

    fn bare(&self, kind: SubscriptionKind) -> JsonRpcRequest {
        self.codec.request(kind.subscribe_method(), vec![])
    }

    fn build<T: Serialize>(
        &self,
        kind: SubscriptionKind,
        identifier: Value,
        options: &T,
    ) -> Result<JsonRpcRequest, TransportError> {
        let mut params = vec![identifier];
        let options = serde_json::to_value(options)?;
        if options.as_object().is_some_and(|o| !o.is_empty()) {
            params.push(options);
        }
        Ok(self.codec.request(kind.subscribe_method(), params))
    }
}

fn required(what: &str, value: &str) -> Result<Value, TransportError> {
    if value.trim().is_empty() {
        return Err(TransportError::InvalidParams(format!("{what} is required")));
    }
    Ok(Value::String(value.to_string()))
}

// ─── Handles & unsubscribe derivation ─────────────────────────────────────────

/// A server-side subscription, captured from its confirmation frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    /// Id assigned by the server (`result` of the confirmation).
    pub subscription_id: u64,
    /// Subscribe method that created it.
    pub method: String,
    /// Correlation id echoed by the confirmation.
    pub request_id: u64,
}

impl SubscriptionHandle {
    /// Read a confirmation frame (`{"result": <subId>, "id": <corrId>}`).
    ///
    /// Returns `None` for notifications, error frames and anything without
    /// a numeric result and id.
    pub fn from_confirmation(method: &str, confirmation: &str) -> Option<Self> {
        let resp: JsonRpcResponse = serde_json::from_str(confirmation).ok()?;
        if resp.error.is_some() {
            return None;
        }
        let subscription_id = resp.result.as_ref()?.as_u64()?;
        let request_id = resp.id.as_u64()?;
        Some(Self {
            subscription_id,
            method: method.to_string(),
            request_id,
        })
    }

    /// The request that ends this subscription.
    pub fn unsubscribe_request(&self) -> Result<JsonRpcRequest, TransportError> {
        Ok(JsonRpcRequest {
            jsonrpc: solrpc_core::request::JSONRPC_VERSION.into(),
            id: RpcId::Number(self.request_id),
            method: naming::unsubscribe_method(&self.method)?,
            params: vec![json!(self.subscription_id)],
        })
    }
}

/// Derive the unsubscribe body from the original subscribe body and the
/// server's confirmation. Pure: no I/O.
pub fn unsubscribe_request(
    original_request_body: &str,
    confirmation: &str,
) -> Result<String, TransportError> {
    let original: JsonRpcRequest = serde_json::from_str(original_request_body)?;
    let handle = SubscriptionHandle::from_confirmation(&original.method, confirmation)
        .ok_or_else(|| {
            TransportError::InvalidParams(
                "confirmation must carry a numeric result and id".into(),
            )
        })?;
    let mut req = handle.unsubscribe_request()?;
    req.jsonrpc = original.jsonrpc;
    Ok(serde_json::to_string(&req)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SubscriptionCatalog {
        SubscriptionCatalog::default()
    }

    #[test]
    fn method_names_per_kind() {
        let names: Vec<String> = SubscriptionKind::ALL
            .iter()
            .map(|k| k.subscribe_method())
            .collect();
        assert_eq!(
            names,
            [
                "accountSubscribe",
                "blockSubscribe",
                "logsSubscribe",
                "programSubscribe",
                "signatureSubscribe",
                "slotSubscribe",
                "slotsUpdatesSubscribe",
                "rootSubscribe",
                "voteSubscribe",
            ]
        );
        for kind in SubscriptionKind::ALL {
            assert_eq!(
                naming::unsubscribe_method(&kind.subscribe_method()).unwrap(),
                kind.unsubscribe_method()
            );
        }
    }

    #[test]
    fn account_without_options_has_single_param() {
        let req = catalog()
            .account_subscribe("CM78CPUeXjn8o3yroDHxUtKsZZgoy4GPkPPXfouKNH12", &Default::default())
            .unwrap();
        assert_eq!(req.method, "accountSubscribe");
        assert_eq!(req.params, vec![json!("CM78CPUeXjn8o3yroDHxUtKsZZgoy4GPkPPXfouKNH12")]);
    }

    #[test]
    fn account_with_options() {
        let req = catalog()
            .account_subscribe(
                "CM78CPUeXjn8o3yroDHxUtKsZZgoy4GPkPPXfouKNH12",
                &AccountSubscribeConfig {
                    commitment: Some(Commitment::Finalized),
                    encoding: Some(Encoding::JsonParsed),
                },
            )
            .unwrap();
        assert_eq!(
            req.params[1],
            json!({"commitment": "finalized", "encoding": "jsonParsed"})
        );
    }

    #[test]
    fn logs_without_commitment_omits_options() {
        let req = catalog()
            .logs_subscribe(&LogsFilter::All, &LogsSubscribeConfig::default())
            .unwrap();
        assert_eq!(req.params, vec![json!("all")]);

        let req = catalog()
            .logs_subscribe(
                &LogsFilter::Mentions(vec!["11111111111111111111111111111111".into()]),
                &LogsSubscribeConfig {
                    commitment: Some(Commitment::Confirmed),
                },
            )
            .unwrap();
        assert_eq!(
            req.params,
            vec![
                json!({"mentions": ["11111111111111111111111111111111"]}),
                json!({"commitment": "confirmed"}),
            ]
        );
    }

    #[test]
    fn program_filters_pass_through() {
        let req = catalog()
            .program_subscribe(
                "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
                &ProgramSubscribeConfig {
                    commitment: Some(Commitment::Confirmed),
                    encoding: Some(Encoding::Base64),
                    filters: vec![json!({"dataSize": 65548})],
                },
            )
            .unwrap();
        assert_eq!(
            req.params[1],
            json!({
                "commitment": "confirmed",
                "encoding": "base64",
                "filters": [{"dataSize": 65548}]
            })
        );
    }

    #[test]
    fn signature_and_block_options() {
        let req = catalog()
            .signature_subscribe(
                "2EBVM6cB8vAAD93Ktr6Vd8p67XPbQzCJX47MpReuiCXJAtcjaxpvWpcg9Ege1Nr5Tk3a2GFrByT7WPBjdsTycY9b",
                &SignatureSubscribeConfig {
                    commitment: None,
                    enable_received_notification: Some(true),
                },
            )
            .unwrap();
        assert_eq!(req.params[1], json!({"enableReceivedNotification": true}));

        let req = catalog()
            .block_subscribe(
                &BlockSubscribeFilter::MentionsAccountOrProgram("LieKvPRE8XeX3Y2xVNHjKlpAScD12lYySBVQ4HqoJ5op".into()),
                &BlockSubscribeConfig {
                    transaction_details: Some(TransactionDetails::Signatures),
                    show_rewards: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            req.params,
            vec![
                json!({"mentionsAccountOrProgram": "LieKvPRE8XeX3Y2xVNHjKlpAScD12lYySBVQ4HqoJ5op"}),
                json!({"transactionDetails": "signatures", "showRewards": false}),
            ]
        );
    }

    #[test]
    fn parameterless_kinds_send_no_params() {
        let c = catalog();
        for req in [
            c.slot_subscribe(),
            c.slots_updates_subscribe(),
            c.root_subscribe(),
            c.vote_subscribe(),
        ] {
            assert!(req.params.is_empty());
            let body = c.codec().encode(&req).unwrap();
            assert!(!body.contains("params"), "{body}");
        }
    }

    #[test]
    fn missing_identifier_fails_fast() {
        let err = catalog()
            .account_subscribe("", &Default::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidParams(_)));
        assert!(catalog()
            .logs_subscribe(&LogsFilter::Mentions(vec![]), &Default::default())
            .is_err());
    }

    #[test]
    fn unsubscribe_by_kind() {
        let req = catalog().unsubscribe(SubscriptionKind::Program, 23784);
        assert_eq!(req.method, "programUnsubscribe");
        assert_eq!(req.params, vec![json!(23784)]);
    }

    #[test]
    fn unsubscribe_derived_from_confirmation() {
        let original = r#"{"jsonrpc":"2.0","id":5,"method":"accountSubscribe","params":["Addr"]}"#;
        let body = unsubscribe_request(original, r#"{"jsonrpc":"2.0","result":7,"id":5}"#).unwrap();
        let req: JsonRpcRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.method, "accountUnsubscribe");
        assert_eq!(req.params, vec![json!(7)]);
        assert_eq!(req.id, RpcId::Number(5));
    }

    #[test]
    fn unsubscribe_rejects_notification_as_confirmation() {
        let original = r#"{"jsonrpc":"2.0","id":5,"method":"slotSubscribe"}"#;
        let notification = r#"{"jsonrpc":"2.0","method":"slotNotification","params":{"subscription":7,"result":{"slot":1}}}"#;
        assert!(unsubscribe_request(original, notification).is_err());
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("slot-updates".parse::<SubscriptionKind>().unwrap(), SubscriptionKind::SlotsUpdates);
        assert_eq!(SubscriptionKind::SlotsUpdates.to_string(), "slots-updates");
        assert!("blocks".parse::<SubscriptionKind>().is_err());
    }

    #[test]
    fn simple_subscribe_only_for_parameterless_kinds() {
        let catalog = catalog();
        for kind in SubscriptionKind::ALL {
            let result = catalog.simple_subscribe(kind);
            if kind.takes_params() {
                assert!(matches!(result, Err(TransportError::InvalidParams(_))));
            } else {
                let req = result.unwrap();
                assert_eq!(req.method, kind.subscribe_method());
                assert!(req.params.is_empty());
            }
        }
    }
}
