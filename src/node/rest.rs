//! Cosmos-SDK REST (gRPC-gateway) client

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{AccountInfo, BalanceReading, BroadcastReceipt, NodeApi, NodeStatus};
use crate::error::{Error, Result};
use crate::transfer::Amount;

const NODE_INFO_PATH: &str = "cosmos/base/tendermint/v1beta1/node_info";
const BROADCAST_PATH: &str = "cosmos/tx/v1beta1/txs";

/// Longest response body we keep in an error message
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct NodeInfoResponse {
    default_node_info: DefaultNodeInfo,
}

#[derive(Debug, Deserialize)]
struct DefaultNodeInfo {
    network: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Option<CoinJson>,
}

#[derive(Debug, Deserialize)]
struct CoinJson {
    denom: String,
    amount: String,
}

/// Error body produced by the gRPC gateway
#[derive(Debug, Deserialize)]
struct GatewayError {
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct BroadcastRequest<'a> {
    tx_bytes: String,
    mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    tx_response: TxResponse,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
}

/// REST client bound to one node URL
pub struct RestClient {
    client: Client,
    base: Url,
    url: String,
}

impl RestClient {
    /// Create a client for `url`. Only http(s) URLs are accepted.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(url)
            .map_err(|e| Error::Config(format!("Invalid endpoint URL {}: {}", url, e)))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Endpoint {} must use http or https",
                url
            )));
        }

        // Url::join replaces the last path segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            url: url.to_string(),
        })
    }

    fn route(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("Bad route {}: {}", path, e)))
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, String)> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<(StatusCode, String)> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::MalformedResponse(format!("{}: {}", e, truncate(body))))
}

fn expect_success<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            body: truncate(body),
        });
    }
    parse_json(body)
}

/// A 404 only means "no such account" when the gateway itself produced it.
/// Anything else (HTML, empty body, proxy page) means the route is wrong.
fn is_gateway_not_found(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::NOT_FOUND {
        return false;
    }

    match serde_json::from_str::<GatewayError>(body) {
        Ok(err) => {
            debug!("Gateway not found (code {}): {}", err.code, err.message);
            true
        }
        Err(_) => false,
    }
}

fn parse_balance(status: StatusCode, body: &str, denom: &str) -> Result<BalanceReading> {
    if is_gateway_not_found(status, body) {
        return Ok(BalanceReading::NoAccount);
    }

    let response: BalanceResponse = expect_success(status, body)?;
    let Some(coin) = response.balance else {
        return Ok(BalanceReading::Amount(Amount::ZERO));
    };

    if !coin.denom.is_empty() && coin.denom != denom {
        return Err(Error::MalformedResponse(format!(
            "asked for {} balance, got {}",
            denom, coin.denom
        )));
    }

    coin.amount
        .parse::<u128>()
        .map(|v| BalanceReading::Amount(Amount::new(v)))
        .map_err(|e| Error::MalformedResponse(format!("balance amount '{}': {}", coin.amount, e)))
}

fn parse_account(status: StatusCode, body: &str) -> Result<Option<AccountInfo>> {
    if is_gateway_not_found(status, body) {
        return Ok(None);
    }

    let value: Value = expect_success(status, body)?;
    let account = value
        .get("account")
        .ok_or_else(|| Error::MalformedResponse("missing 'account' field".into()))?;

    find_account_info(account)
        .map(Some)
        .ok_or_else(|| Error::MalformedResponse(format!("no account_number/sequence in {}", truncate(body))))
}

/// Vesting and module accounts nest the base account; search for the object
/// that carries both fields.
fn find_account_info(value: &Value) -> Option<AccountInfo> {
    let object = value.as_object()?;

    if let (Some(number), Some(sequence)) = (object.get("account_number"), object.get("sequence")) {
        return Some(AccountInfo {
            account_number: json_u64(number)?,
            sequence: json_u64(sequence)?,
        });
    }

    object.values().find_map(find_account_info)
}

fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn parse_broadcast(status: StatusCode, body: &str) -> Result<BroadcastReceipt> {
    let response: BroadcastResponse = expect_success(status, body)?;
    let tx = response.tx_response;

    if tx.code != 0 {
        return Err(Error::BroadcastRejected {
            code: tx.code,
            log: tx.raw_log,
        });
    }

    Ok(BroadcastReceipt { tx_hash: tx.txhash })
}

#[async_trait]
impl NodeApi for RestClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn node_status(&self) -> Result<NodeStatus> {
        let (status, body) = self.get(self.route(NODE_INFO_PATH)?).await?;
        let info: NodeInfoResponse = expect_success(status, &body)?;

        Ok(NodeStatus {
            network: info.default_node_info.network,
            version: info.default_node_info.version,
        })
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<BalanceReading> {
        let mut url = self.route(&format!("cosmos/bank/v1beta1/balances/{}/by_denom", address))?;
        url.query_pairs_mut().append_pair("denom", denom);

        let (status, body) = self.get(url).await?;
        parse_balance(status, &body, denom)
    }

    async fn account(&self, address: &str) -> Result<Option<AccountInfo>> {
        let url = self.route(&format!("cosmos/auth/v1beta1/accounts/{}", address))?;
        let (status, body) = self.get(url).await?;
        parse_account(status, &body)
    }

    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<BroadcastReceipt> {
        let request = BroadcastRequest {
            tx_bytes: STANDARD.encode(tx_bytes),
            mode: "BROADCAST_MODE_SYNC",
        };

        let url = self.route(BROADCAST_PATH)?;
        debug!("POST {} ({} tx bytes)", url, tx_bytes.len());

        let response = self.client.post(url).json(&request).send().await?;
        let (status, body) = read_body(response).await?;
        parse_broadcast(status, &body)
    }
}
