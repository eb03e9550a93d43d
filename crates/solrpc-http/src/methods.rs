//! Typed wrappers for a handful of node methods.
//!
//! Params follow the node's positional convention: the identifier first,
//! then an options object that is left out when nothing in it is set.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use solrpc_core::config::{Commitment, Encoding};
use solrpc_core::error::TransportError;
use solrpc_core::request::RpcParam;
use solrpc_core::transport::RpcTransport;

use crate::client::HttpRpcClient;

/// Slot the node evaluated a request at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// A result wrapped with its evaluation context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse<T> {
    pub context: RpcContext,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcVersionInfo {
    #[serde(rename = "solana-core")]
    pub solana_core: String,
    #[serde(rename = "feature-set", default)]
    pub feature_set: Option<u64>,
}

/// Byte window of account data to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSlice {
    pub offset: usize,
    pub length: usize,
}

/// Options for `getAccountInfo` and the token-account lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_slice: Option<DataSlice>,
}

/// Narrows a token-account lookup to one mint or one token program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenAccountsFilter {
    pub mint: Option<String>,
    pub program_id: Option<String>,
}

impl TokenAccountsFilter {
    pub fn mint(mint: impl Into<String>) -> Self {
        Self {
            mint: Some(mint.into()),
            program_id: None,
        }
    }

    pub fn program_id(program_id: impl Into<String>) -> Self {
        Self {
            mint: None,
            program_id: Some(program_id.into()),
        }
    }

    /// The filter object, or `None` when neither field is set.
    fn to_param(&self) -> Result<Option<Value>, TransportError> {
        let mint = self.mint.as_deref().filter(|s| !s.is_empty());
        let program_id = self.program_id.as_deref().filter(|s| !s.is_empty());
        match (mint, program_id) {
            (Some(_), Some(_)) => Err(TransportError::InvalidParams(
                "pass mint or program_id, not both".into(),
            )),
            (Some(mint), None) => Ok(Some(json!({ "mint": mint }))),
            (None, Some(program_id)) => Ok(Some(json!({ "programId": program_id }))),
            (None, None) => Ok(None),
        }
    }
}

fn push_options<T: Serialize>(params: &mut Vec<RpcParam>, options: &T) -> Result<(), TransportError> {
    let options = serde_json::to_value(options)?;
    if options.as_object().is_some_and(|o| !o.is_empty()) {
        params.push(options);
    }
    Ok(())
}

fn required(what: &str, value: &str) -> Result<Value, TransportError> {
    if value.trim().is_empty() {
        return Err(TransportError::InvalidParams(format!("{what} is required")));
    }
    Ok(Value::String(value.to_string()))
}

#[derive(Serialize)]
struct CommitmentOnly {
    #[serde(skip_serializing_if = "Option::is_none")]
    commitment: Option<Commitment>,
}

impl HttpRpcClient {
    fn commitment_or_default(&self, commitment: Option<Commitment>) -> Option<Commitment> {
        commitment.or(self.commitment())
    }

    fn account_options(&self, config: &AccountInfoConfig) -> AccountInfoConfig {
        AccountInfoConfig {
            commitment: self.commitment_or_default(config.commitment),
            ..config.clone()
        }
    }

    pub(crate) fn slot_params(&self, commitment: Option<Commitment>) -> Result<Vec<RpcParam>, TransportError> {
        let mut params = Vec::new();
        push_options(
            &mut params,
            &CommitmentOnly {
                commitment: self.commitment_or_default(commitment),
            },
        )?;
        Ok(params)
    }

    pub(crate) fn balance_params(
        &self,
        pubkey: &str,
        commitment: Option<Commitment>,
    ) -> Result<Vec<RpcParam>, TransportError> {
        let mut params = vec![required("account pubkey", pubkey)?];
        push_options(
            &mut params,
            &CommitmentOnly {
                commitment: self.commitment_or_default(commitment),
            },
        )?;
        Ok(params)
    }

    pub(crate) fn account_info_params(
        &self,
        pubkey: &str,
        config: &AccountInfoConfig,
    ) -> Result<Vec<RpcParam>, TransportError> {
        let mut params = vec![required("account pubkey", pubkey)?];
        push_options(&mut params, &self.account_options(config))?;
        Ok(params)
    }

    pub(crate) fn token_accounts_params(
        &self,
        pubkey: &str,
        filter: &TokenAccountsFilter,
        config: &AccountInfoConfig,
    ) -> Result<Vec<RpcParam>, TransportError> {
        let filter = filter.to_param()?;
        let mut params = vec![required("token account pubkey", pubkey)?];
        params.extend(filter);
        push_options(&mut params, &self.account_options(config))?;
        Ok(params)
    }

    /// `getHealth`: `"ok"` when the node is healthy.
    pub async fn get_health(&self) -> Result<String, TransportError> {
        self.call("getHealth", vec![]).await
    }

    pub async fn get_version(&self) -> Result<RpcVersionInfo, TransportError> {
        self.call("getVersion", vec![]).await
    }

    pub async fn get_slot(&self, commitment: Option<Commitment>) -> Result<u64, TransportError> {
        let params = self.slot_params(commitment)?;
        self.call("getSlot", params).await
    }

    /// `getBalance`: lamports held by `pubkey`.
    pub async fn get_balance(
        &self,
        pubkey: &str,
        commitment: Option<Commitment>,
    ) -> Result<RpcResponse<u64>, TransportError> {
        let params = self.balance_params(pubkey, commitment)?;
        self.call("getBalance", params).await
    }

    /// `getAccountInfo`: `None` when the account does not exist.
    pub async fn get_account_info(
        &self,
        pubkey: &str,
        config: &AccountInfoConfig,
    ) -> Result<RpcResponse<Option<Value>>, TransportError> {
        let params = self.account_info_params(pubkey, config)?;
        self.call("getAccountInfo", params).await
    }

    /// `getTokenAccountsByOwner`. Fails before any request when the filter
    /// sets both `mint` and `program_id`.
    pub async fn get_token_accounts_by_owner(
        &self,
        owner: &str,
        filter: &TokenAccountsFilter,
        config: &AccountInfoConfig,
    ) -> Result<RpcResponse<Vec<Value>>, TransportError> {
        let params = self.token_accounts_params(owner, filter, config)?;
        self.call("getTokenAccountsByOwner", params).await
    }

    /// `getTokenAccountsByDelegate`. Same filter rule as the owner lookup.
    pub async fn get_token_accounts_by_delegate(
        &self,
        delegate: &str,
        filter: &TokenAccountsFilter,
        config: &AccountInfoConfig,
    ) -> Result<RpcResponse<Vec<Value>>, TransportError> {
        let params = self.token_accounts_params(delegate, filter, config)?;
        self.call("getTokenAccountsByDelegate", params).await
    }
}
