//! solrpc CLI: stream pubsub subscriptions and send RPC calls from the terminal.
//!
//! Usage:
//! ```bash
//! # Stream slot notifications from devnet
//! solrpc subscribe slot devnet
//!
//! # Watch an account, stop after 5 messages
//! solrpc subscribe account wss://api.devnet.solana.com SysvarC1ock11111111111111111111111111111111 --limit 5
//!
//! # Send a raw JSON-RPC call
//! solrpc call --url https://api.devnet.solana.com --method getBalance --params '["83astBRguLMdt2h5U1Tpdq5tjFoJ6noeGwaY3mDLVcri"]'
//!
//! # Derive the unsubscribe request for a confirmed subscription
//! solrpc unsubscribe-request '{"jsonrpc":"2.0","id":5,"method":"accountSubscribe","params":["x"]}' '{"jsonrpc":"2.0","result":7,"id":5}'
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::env;
use std::process;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use solrpc_core::config::{ClientConfig, Commitment, Encoding};
use solrpc_core::transport::RpcTransport;
use solrpc_core::Cluster;
use solrpc_http::HttpRpcClient;
use solrpc_ws::{
    AccountSubscribeConfig, BlockSubscribeConfig, BlockSubscribeFilter, HandlerAction, LogsFilter,
    LogsSubscribeConfig, ProgramSubscribeConfig, PubsubClient, SignatureSubscribeConfig,
    SubscriptionChannel, SubscriptionKind, WsClientConfig,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "subscribe" => cmd_subscribe(&args[2..]).await,
        "call" => cmd_call(&args[2..]).await,
        "unsubscribe-request" => cmd_unsubscribe_request(&args[2..]),
        "clusters" => {
            cmd_clusters();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("solrpc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_usage() {
    println!("solrpc {}", env!("CARGO_PKG_VERSION"));
    println!("Stream pubsub subscriptions and send JSON-RPC calls\n");
    println!("USAGE:");
    println!("    solrpc <COMMAND>\n");
    println!("COMMANDS:");
    println!("    subscribe <kind> <endpoint> [target]   Stream notifications to stdout");
    println!("    call                                   Send a raw JSON-RPC call over HTTP");
    println!("    unsubscribe-request <orig> <confirm>   Print the unsubscribe request for a subscription");
    println!("    clusters                               List well-known cluster endpoints");
    println!("    version                                Print version");
    println!("    help                                   Print this help\n");
    println!("SUBSCRIBE:");
    println!("    <kind>       account | block | logs | program | signature | slot | slots-updates | root | vote");
    println!("    <endpoint>   ws:// or wss:// URL, or a cluster name (devnet, testnet, mainnet-beta, localnet)");
    println!("    [target]     pubkey / program id / signature; optional mention filter for logs and block");
    println!("    --commitment <processed|confirmed|finalized>");
    println!("    --encoding <base58|base64|base64+zstd|jsonParsed>");
    println!("    --limit <N>            Stop after N messages");
    println!("    --retry-limit <N>      Reconnects allowed after consecutive failures  [default: 3]");
    println!("    --retry-pause-ms <MS>  Pause before each reconnect                   [default: 10000]\n");
    println!("CALL FLAGS:");
    println!("    --url <URL>            RPC endpoint URL or cluster name  [required]");
    println!("    --method <METHOD>      JSON-RPC method                   [required]");
    println!("    --params <JSON>        JSON array of params              [default: []]");
}

async fn cmd_subscribe(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    let kind: SubscriptionKind = positional
        .first()
        .ok_or_else(|| anyhow!("<kind> is required"))?
        .parse()?;
    let endpoint = resolve_endpoint(
        positional.get(1).ok_or_else(|| anyhow!("<endpoint> is required"))?,
        Cluster::ws_url,
    );
    let target = positional.get(2).map(String::as_str);

    let commitment = parse_flag(args, "--commitment")
        .map(|c| c.parse::<Commitment>())
        .transpose()?;
    let encoding = parse_flag(args, "--encoding")
        .map(|e| e.parse::<Encoding>())
        .transpose()?;
    let limit = parse_number::<u64>(args, "--limit")?;

    let defaults = WsClientConfig::default();
    let ws_config = defaults.clone().with_retry(
        parse_number(args, "--retry-limit")?.unwrap_or(defaults.retry_limit),
        parse_number(args, "--retry-pause-ms")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_pause),
    );

    let client = PubsubClient::new(&ClientConfig::new(endpoint.clone())?, ws_config)?;
    let catalog = client.catalog();
    let need_target = |what: &str| target.ok_or_else(|| anyhow!("{kind} needs a {what}"));

    let request = match kind {
        SubscriptionKind::Account => catalog.account_subscribe(
            need_target("pubkey")?,
            &AccountSubscribeConfig {
                commitment,
                encoding,
            },
        )?,
        SubscriptionKind::Block => {
            let filter = match target {
                Some(key) => BlockSubscribeFilter::MentionsAccountOrProgram(key.to_string()),
                None => BlockSubscribeFilter::All,
            };
            let config = BlockSubscribeConfig {
                commitment,
                encoding,
                ..Default::default()
            };
            catalog.block_subscribe(&filter, &config)?
        }
        SubscriptionKind::Logs => {
            let filter = match target {
                Some(key) => LogsFilter::Mentions(vec![key.to_string()]),
                None => LogsFilter::All,
            };
            catalog.logs_subscribe(&filter, &LogsSubscribeConfig { commitment })?
        }
        SubscriptionKind::Program => catalog.program_subscribe(
            need_target("program id")?,
            &ProgramSubscribeConfig {
                commitment,
                encoding,
                ..Default::default()
            },
        )?,
        SubscriptionKind::Signature => catalog.signature_subscribe(
            need_target("signature")?,
            &SignatureSubscribeConfig {
                commitment,
                ..Default::default()
            },
        )?,
        SubscriptionKind::Slot => catalog.slot_subscribe(),
        SubscriptionKind::SlotsUpdates => catalog.slots_updates_subscribe(),
        SubscriptionKind::Root => catalog.root_subscribe(),
        SubscriptionKind::Vote => catalog.vote_subscribe(),
    };

    tracing::info!(url = %endpoint, %kind, "subscribing");
    let mut received = 0u64;
    client
        .subscribe(&request, |message| {
            println!("{message}");
            received += 1;
            match limit {
                Some(n) if received >= n => HandlerAction::Stop,
                _ => HandlerAction::Continue,
            }
        })
        .await?;

    tracing::info!(received, "subscription finished");
    Ok(())
}

async fn cmd_call(args: &[String]) -> Result<()> {
    let url = parse_flag(args, "--url").ok_or_else(|| anyhow!("--url is required"))?;
    let method = parse_flag(args, "--method").ok_or_else(|| anyhow!("--method is required"))?;
    let params = match parse_flag(args, "--params") {
        Some(raw) => match serde_json::from_str::<Value>(&raw).context("--params is not valid JSON")? {
            Value::Array(items) => items,
            _ => bail!("--params must be a JSON array"),
        },
        None => vec![],
    };

    let client = HttpRpcClient::default_for(resolve_endpoint(&url, Cluster::http_url))?;
    let result: Value = client.call(&method, params).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_unsubscribe_request(args: &[String]) -> Result<()> {
    let [original, confirmation] = args else {
        bail!("usage: solrpc unsubscribe-request <original-request-json> <confirmation-json>");
    };
    let body = SubscriptionChannel::unsubscribe_request(original, confirmation)?;
    println!("{body}");
    Ok(())
}

fn cmd_clusters() {
    println!("Well-known clusters:\n");
    for cluster in Cluster::ALL {
        println!("  {:<13} {}", cluster.name(), cluster.http_url());
        println!("  {:<13} {}", "", cluster.ws_url());
        println!();
    }
}

/// Cluster names map to their well-known URL; anything else is used as given.
fn resolve_endpoint(value: &str, url_of: fn(&Cluster) -> &'static str) -> String {
    match value.parse::<Cluster>() {
        Ok(cluster) => url_of(&cluster).to_string(),
        Err(_) => value.to_string(),
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn parse_number<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_flag(args, flag)
        .map(|raw| raw.parse::<T>().with_context(|| format!("{flag} expects a number, got '{raw}'")))
        .transpose()
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positional_skips_flag_values() {
        let a = args(&["account", "--limit", "5", "devnet", "abc"]);
        assert_eq!(positional_args(&a), vec!["account", "devnet", "abc"]);
    }

    #[test]
    fn cluster_names_resolve() {
        assert_eq!(resolve_endpoint("devnet", Cluster::ws_url), "wss://api.devnet.solana.com");
        assert_eq!(resolve_endpoint("ws://10.0.0.1:8900", Cluster::ws_url), "ws://10.0.0.1:8900");
    }

    #[test]
    fn number_flags() {
        let a = args(&["--limit", "7"]);
        assert_eq!(parse_number::<u64>(&a, "--limit").unwrap(), Some(7));
        assert_eq!(parse_number::<u64>(&a, "--retry-limit").unwrap(), None);
        assert!(parse_number::<u64>(&args(&["--limit", "x"]), "--limit").is_err());
    }
}
