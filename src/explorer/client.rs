//! Etherscan-compatible HTTP client
//!
//! Issues `module=account&action=tokentx` requests over the full block range,
//! sorted ascending. Works against any explorer exposing the Etherscan API
//! shape (Etherscan, Polygonscan, Basescan, ...).
//!
//! Created: 2026-10-18

use super::{FetchError, TransferSource};
use crate::types::TransferRecord;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const START_BLOCK: &str = "0";
const END_BLOCK: &str = "999999999";

/// Message the explorer uses for an address with no token transfers
const NO_TRANSACTIONS: &str = "No transactions found";

/// Envelope returned by every explorer API call
#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    /// Array of transfers on success, error text otherwise
    pub result: serde_json::Value,
}

impl ExplorerResponse {
    /// Interpret the envelope as a transfer list
    pub fn into_records(self) -> Result<Vec<TransferRecord>, FetchError> {
        let ExplorerResponse {
            status,
            message,
            result,
        } = self;
        match result {
            serde_json::Value::Array(rows) if status == "1" => {
                Ok(rows.into_iter().map(decode_row).collect())
            }
            serde_json::Value::Array(rows)
                if status == "0" && rows.is_empty() && message.starts_with(NO_TRANSACTIONS) =>
            {
                Ok(Vec::new())
            }
            result => Err(FetchError::Api {
                status,
                message,
                detail: match result {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            }),
        }
    }
}

/// Rows that are not objects of strings become placeholder records carrying
/// the decode error; the engine then reports them as malformed instead of
/// losing the whole page.
fn decode_row(row: serde_json::Value) -> TransferRecord {
    let hash = row
        .get("hash")
        .and_then(|h| h.as_str())
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(row).unwrap_or_else(|e| {
        debug!("Undecodable transfer row {}: {}", hash, e);
        TransferRecord::undecodable(hash, e.to_string())
    })
}

/// Query string of a `tokentx` request for `address`
fn tokentx_query<'a>(address: &'a str, api_key: &'a str) -> [(&'static str, &'a str); 7] {
    [
        ("module", "account"),
        ("action", "tokentx"),
        ("address", address),
        ("startblock", START_BLOCK),
        ("endblock", END_BLOCK),
        ("sort", "asc"),
        ("apikey", api_key),
    ]
}

/// Parse a raw response body
pub fn parse_response(body: &str) -> Result<Vec<TransferRecord>, FetchError> {
    let response: ExplorerResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    response.into_records()
}

/// HTTP client for the explorer's token transfer list
pub struct ExplorerClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ExplorerClient {
    /// Create a client with a per-request timeout
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, address: &str) -> reqwest::RequestBuilder {
        self.client
            .get(&self.api_url)
            .query(&tokentx_query(address, &self.api_key))
    }
}

#[async_trait]
impl TransferSource for ExplorerClient {
    async fn fetch(&self, address: &str) -> Result<Vec<TransferRecord>, FetchError> {
        let response = self.request(address).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Explorer returned HTTP {} for {}", status, address);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let records = parse_response(&body)?;
        debug!("Fetched {} transfers for {}", records.len(), address);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [
                {"blockNumber":"1","timeStamp":"1600000000","hash":"0x01","from":"0xa","to":"0xb",
                 "value":"100","tokenName":"Moss Carbon Credit","tokenSymbol":"MCO2","tokenDecimal":"2"},
                {"blockNumber":"2","timeStamp":"1600000100","hash":"0x02","from":"0xb","to":"0xc",
                 "value":"50","tokenName":"Moss Carbon Credit","tokenSymbol":"MCO2","tokenDecimal":"2"}
            ]
        }"#;
        let records = parse_response(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash, "0x01");
        assert_eq!(records[1].to, "0xc");
    }

    #[test]
    fn test_parse_no_transactions() {
        let body = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        assert!(parse_response(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        match parse_response(body) {
            Err(FetchError::Api { message, detail, .. }) => {
                assert_eq!(message, "NOTOK");
                assert_eq!(detail, "Invalid API Key");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>502</html>"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_undecodable_rows_keep_error() {
        let body = r#"{"status":"1","message":"OK","result":[
            42,
            {"hash":"0x03","from":"0xa","to":"0xb","value":100,"tokenName":"Moss Carbon Credit"}
        ]}"#;
        let records = parse_response(body).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].hash.is_empty());
        assert!(records[0].decode_error.is_some());
        assert_eq!(records[1].hash, "0x03");
        let error = records[1].decode_error.as_deref().unwrap();
        assert!(error.contains("invalid type"), "{}", error);
    }

    #[test]
    fn test_tokentx_request_query() {
        let client = ExplorerClient::new(
            "https://api.etherscan.io/api",
            "KEY",
            Duration::from_secs(5),
        )
        .unwrap();
        let request = client.request("0xabc").build().unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/api");

        let query: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        let expected = [
            ("module", "account"),
            ("action", "tokentx"),
            ("address", "0xabc"),
            ("startblock", "0"),
            ("endblock", "999999999"),
            ("sort", "asc"),
            ("apikey", "KEY"),
        ];
        let expected: Vec<(String, String)> = expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(query, expected);
    }
}
