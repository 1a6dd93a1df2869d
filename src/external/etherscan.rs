use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::external::ethereum::EthereumClient;
use crate::external::price_oracle::PriceProviderError;
use crate::models::{EthAddress, EthTransaction, TxHash, TxReceipt};

const BASE_URL: &str = "https://api.etherscan.io/api";

pub struct EtherscanClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        query: &[(&str, String)],
    ) -> Result<T, PriceProviderError> {
        let mut request = self.client.get(BASE_URL).query(query);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        request
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TxListResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtherscanTx {
    hash: String,
    block_number: String,
    time_stamp: String,
    from: String,
    to: String,
    value: String,
    gas: String,
    gas_price: String,
    gas_used: String,
    input: String,
    nonce: String,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    contract_address: Option<String>,
    status: Option<String>,
    #[serde(rename = "type")]
    tx_type: Option<String>,
    #[serde(default)]
    logs: serde_json::Value,
}

fn parse_int(value: &str) -> Result<i64, PriceProviderError> {
    value
        .parse::<i64>()
        .map_err(|e| PriceProviderError::Parse(format!("{}: {}", value, e)))
}

fn parse_hex_int(value: &str) -> Result<i64, PriceProviderError> {
    i64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| PriceProviderError::Parse(format!("{}: {}", value, e)))
}

impl EtherscanTx {
    fn into_transaction(self) -> Result<EthTransaction, PriceProviderError> {
        let tx_hash = TxHash::from_hex(&self.hash)
            .ok_or_else(|| PriceProviderError::Parse(format!("invalid hash {}", self.hash)))?;

        Ok(EthTransaction {
            tx_hash,
            block_number: parse_int(&self.block_number)?,
            timestamp: parse_int(&self.time_stamp)?,
            from_address: self.from,
            to_address: if self.to.is_empty() { None } else { Some(self.to) },
            value: self.value,
            gas: self.gas,
            gas_price: self.gas_price,
            gas_used: self.gas_used,
            input_data: self.input,
            nonce: parse_int(&self.nonce)?,
        })
    }
}

#[async_trait]
impl EthereumClient for EtherscanClient {
    async fn query_transactions(
        &self,
        address: &EthAddress,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<EthTransaction>, AppError> {
        let body: TxListResponse = self
            .get(&[
                ("module", "account".to_string()),
                ("action", "txlist".to_string()),
                ("address", address.clone()),
                ("sort", "asc".to_string()),
            ])
            .await?;

        // "No transactions found" comes back with status 0 and an empty list
        if body.status != "1" && body.message != "No transactions found" {
            let reason = body.result.as_str().unwrap_or(&body.message).to_string();
            if reason.contains("rate limit") {
                return Err(AppError::RateLimited);
            }
            return Err(AppError::Remote(reason));
        }

        let raw: Vec<EtherscanTx> = serde_json::from_value(body.result)
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        let transactions = raw
            .into_iter()
            .map(EtherscanTx::into_transaction)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|t| t.timestamp >= start_ts && t.timestamp < end_ts)
            .collect::<Vec<_>>();

        debug!("Etherscan returned {} transactions for {}", transactions.len(), address);
        Ok(transactions)
    }

    async fn get_transaction_receipt(&self, tx_hash: &TxHash) -> Result<TxReceipt, AppError> {
        let body: ProxyResponse<RpcReceipt> = self
            .get(&[
                ("module", "proxy".to_string()),
                ("action", "eth_getTransactionReceipt".to_string()),
                ("txhash", tx_hash.to_string()),
            ])
            .await?;

        let receipt = body
            .result
            .ok_or_else(|| AppError::Remote(format!("No receipt returned for {}", tx_hash)))?;

        Ok(TxReceipt {
            tx_hash: tx_hash.clone(),
            contract_address: receipt.contract_address,
            status: receipt.status.as_deref() == Some("0x1"),
            tx_type: receipt
                .tx_type
                .as_deref()
                .map(parse_hex_int)
                .transpose()?
                .unwrap_or(0) as i32,
            logs: receipt.logs,
        })
    }
}
