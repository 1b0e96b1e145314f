//! A plain JSON-RPC [`BlockSource`] (§1 "the node client... is reduced to
//! exactly the shape the extractor drives it through"). One block fetch
//! costs `1 + len(transactions)` round trips (`eth_getBlockByNumber` plus
//! one `eth_getTransactionReceipt` per transaction) since this relay only
//! needs receipts for their logs and status, not full trace data.

use {
    abi_processor::{RawLog, RawReceipt, RawTransaction, TxStatus},
    async_trait::async_trait,
    extractor::{BlockSource, RawBlock},
    primitive_types::{H160, H256, U256},
    serde::Deserialize,
    serde_json::{json, Value},
    url::Url,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json-rpc error: {0}")]
    Rpc(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<Error> for extractor::Error {
    fn from(err: Error) -> Self {
        extractor::Error::Rpc(err.to_string())
    }
}

pub struct JsonRpcSource {
    client: reqwest::Client,
    url: Url,
}

impl JsonRpcSource {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, Error> {
        #[derive(Deserialize)]
        struct RpcError {
            message: String,
        }
        #[derive(Deserialize)]
        struct RpcResponse {
            result: Option<Value>,
            error: Option<RpcError>,
        }

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(Error::Rpc(error.message));
        }
        response
            .result
            .ok_or_else(|| Error::Malformed(format!("{method}: missing result")))
    }
}

fn parse_u64(value: &Value) -> Result<u64, Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Malformed("expected a hex string".to_string()))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|err| Error::Malformed(err.to_string()))
}

fn parse_u256(value: &Value) -> Result<U256, Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Malformed("expected a hex string".to_string()))?;
    U256::from_str_radix(s, 16).map_err(|err| Error::Malformed(err.to_string()))
}

fn parse_h160(value: &Value) -> Result<H160, Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Malformed("expected an address".to_string()))?;
    s.parse().map_err(|_| Error::Malformed(format!("bad address {s}")))
}

fn parse_h256(value: &Value) -> Result<H256, Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Malformed("expected a hash".to_string()))?;
    s.parse().map_err(|_| Error::Malformed(format!("bad hash {s}")))
}

fn parse_bytes(value: &Value) -> Result<Vec<u8>, Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Malformed("expected hex bytes".to_string()))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|err| Error::Malformed(err.to_string()))
}

fn parse_transaction(tx: &Value) -> Result<RawTransaction, Error> {
    Ok(RawTransaction {
        hash: parse_h256(&tx["hash"])?,
        from: parse_h160(&tx["from"])?,
        to: match tx["to"].as_str() {
            Some(_) => Some(parse_h160(&tx["to"])?),
            None => None,
        },
        input: parse_bytes(&tx["input"])?,
        value: parse_u256(&tx["value"])?,
        nonce: parse_u64(&tx["nonce"])?,
        gas: parse_u256(&tx["gas"])?,
        gas_price: parse_u256(&tx["gasPrice"])?,
    })
}

fn parse_log(log: &Value) -> Result<RawLog, Error> {
    let topics = log["topics"]
        .as_array()
        .ok_or_else(|| Error::Malformed("log.topics is not an array".to_string()))?
        .iter()
        .map(parse_h256)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RawLog {
        address: parse_h160(&log["address"])?,
        topics,
        data: parse_bytes(&log["data"])?,
        log_index: parse_u64(&log["logIndex"])?,
    })
}

#[async_trait]
impl BlockSource for JsonRpcSource {
    async fn tip(&self) -> Result<u64, extractor::Error> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        Ok(parse_u64(&result)?)
    }

    async fn block(&self, number: u64) -> Result<Option<RawBlock>, extractor::Error> {
        let block = self
            .call("eth_getBlockByNumber", json!([format!("0x{number:x}"), true]))
            .await?;
        if block.is_null() {
            return Ok(None);
        }

        let hash = parse_h256(&block["hash"])?;
        let parent_hash = parse_h256(&block["parentHash"])?;
        let timestamp = parse_u64(&block["timestamp"])?;
        let transactions = block["transactions"]
            .as_array()
            .ok_or_else(|| Error::Malformed("block.transactions is not an array".to_string()))?;

        let mut paired = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let parsed = parse_transaction(tx)?;
            let receipt = self
                .call("eth_getTransactionReceipt", json!([format!("{:#x}", parsed.hash)]))
                .await?;
            let status = match receipt["status"].as_str() {
                Some("0x1") => TxStatus::Success,
                Some(_) => TxStatus::Failed,
                None => TxStatus::Failed,
            };
            let gas_used = parse_u256(&receipt["gasUsed"])?;
            let logs = receipt["logs"]
                .as_array()
                .ok_or_else(|| Error::Malformed("receipt.logs is not an array".to_string()))?
                .iter()
                .map(parse_log)
                .collect::<Result<Vec<_>, _>>()?;
            paired.push((
                parsed,
                RawReceipt {
                    status,
                    gas_used,
                    logs,
                },
            ));
        }

        Ok(Some(RawBlock {
            number,
            hash,
            parent_hash,
            timestamp,
            transactions: paired,
        }))
    }

    async fn pending_transactions(&self) -> Result<Vec<RawTransaction>, extractor::Error> {
        let block = self
            .call("eth_getBlockByNumber", json!(["pending", true]))
            .await?;
        if block.is_null() {
            return Ok(Vec::new());
        }
        let transactions = block["transactions"]
            .as_array()
            .ok_or_else(|| Error::Malformed("block.transactions is not an array".to_string()))?;
        let parsed = transactions
            .iter()
            .map(parse_transaction)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parsed)
    }
}
