//! Chain API client for `/v1/chain/get_abi`, backed by `reqwest`.

use crate::query::ChainQuery;
use async_trait::async_trait;
use firehose_core::{Abi, QueryError};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GetAbiResponse {
    #[serde(default)]
    account_name: String,
    /// `null` for accounts without a deployed contract
    #[serde(default)]
    abi: Option<Abi>,
}

/// Fetches contract ABIs from a node's chain API.
#[derive(Debug, Clone)]
pub struct HttpChainQuery {
    endpoint: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpChainQuery {
    /// Client for the chain API at `endpoint` (e.g. `https://eos.greymass.com`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("firehose-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QueryError::Http(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_err(&self, e: reqwest::Error) -> QueryError {
        if e.is_timeout() {
            QueryError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else {
            QueryError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl ChainQuery for HttpChainQuery {
    async fn get_abi(&self, contract: &str) -> Result<Abi, QueryError> {
        let url = format!("{}/v1/chain/get_abi", self.endpoint);
        debug!(%url, contract, "get_abi");

        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "account_name": contract }))
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(QueryError::Status { status, body });
        }

        let body: GetAbiResponse = resp.json().await.map_err(|e| QueryError::InvalidAbi {
            account: contract.to_string(),
            reason: e.to_string(),
        })?;
        if body.abi.is_none() {
            debug!(account = %body.account_name, "account has no ABI");
        }
        Ok(body.abi.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_abi_parses_as_absent() {
        let body: GetAbiResponse =
            serde_json::from_str(r#"{"account_name": "alice", "abi": null}"#).unwrap();
        assert!(body.abi.is_none());
        let body: GetAbiResponse = serde_json::from_str(
            r#"{"account_name": "eosio.token", "abi": {"version": "eosio::abi/1.1", "tables": [{"name": "accounts", "type": "account"}]}}"#,
        )
        .unwrap();
        assert_eq!(body.abi.unwrap().tables[0].ty, "account");
    }

    #[test]
    fn endpoint_is_normalised() {
        let q = HttpChainQuery::new("http://localhost:8888/", Duration::from_secs(1)).unwrap();
        assert_eq!(q.endpoint(), "http://localhost:8888");
    }
}
