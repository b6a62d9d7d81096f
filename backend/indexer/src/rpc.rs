//! Solana JSON-RPC client for the stream accounts owned by the program.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried until
//!   `max_attempts` is exhausted.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProgramAccount {
    pub pubkey: String,
    pub account: AccountInfo,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountInfo {
    /// `[payload, encoding]`
    pub data: (String, String),
    pub owner: String,
}

impl AccountInfo {
    /// Raw account bytes.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let (payload, encoding) = &self.data;
        if encoding != "base64" {
            return Err(IndexerError::AccountDecode(format!(
                "unexpected account encoding {encoding}"
            )));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| IndexerError::AccountDecode(format!("bad base64 payload: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    value: Option<AccountInfo>,
}

/// Solana JSON-RPC endpoint plus retry policy.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    url: String,
    max_attempts: u32,
    initial_backoff: Duration,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

impl RpcClient {
    pub fn new(client: Client, url: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            client,
            url: url.into(),
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_secs(INITIAL_BACKOFF_SECS),
        }
    }

    /// Same endpoint with a different attempt budget.
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub fn with_initial_backoff(self, initial_backoff: Duration) -> Self {
        Self {
            initial_backoff,
            ..self
        }
    }

    /// Every account of `program_id` whose size is exactly `data_size` bytes.
    pub async fn get_program_accounts(
        &self,
        program_id: &str,
        data_size: u64,
    ) -> Result<Vec<ProgramAccount>> {
        let accounts: Vec<ProgramAccount> = self
            .call(
                "getProgramAccounts",
                program_accounts_params(program_id, data_size),
            )
            .await?;
        debug!("Fetched {} program accounts", accounts.len());
        Ok(accounts)
    }

    /// A single account, or `None` when it does not exist.
    pub async fn get_account_info(&self, address: &str) -> Result<Option<AccountInfo>> {
        let result: AccountInfoResult = self
            .call("getAccountInfo", account_info_params(address))
            .await?;
        Ok(result.value)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let retry_in = (attempt < self.max_attempts).then_some(backoff);

            let response = self
                .client
                .post(&self.url)
                .json(&json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": method,
                    "params": &params,
                }))
                .send()
                .await;

            let failure = match response {
                Err(e) if retry_in.is_none() => return Err(e.into()),
                Err(e) => format!("{method} request failed: {e}"),
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    format!("Rate-limited by RPC on {method}")
                }
                Ok(resp) => {
                    let body: RpcResponse<T> = resp.json().await?;

                    match body.error {
                        // Malformed request / unknown method / bad params will never succeed.
                        Some(err) if is_hard_error(err.code) => {
                            return Err(IndexerError::Rpc(format!(
                                "{method} hard error {}: {}",
                                err.code, err.message
                            )));
                        }
                        Some(err) => {
                            format!("{method} soft error {} {}", err.code, err.message)
                        }
                        None => {
                            return body.result.ok_or_else(|| {
                                IndexerError::Rpc(format!("Empty result from {method}"))
                            });
                        }
                    }
                }
            };

            let Some(delay) = retry_in else {
                return Err(IndexerError::Rpc(format!(
                    "{failure} (gave up after {attempt} attempts)"
                )));
            };
            warn!("{failure}; retrying in {delay:?}");
            tokio::time::sleep(delay).await;
            backoff = (backoff * 2).min(Duration::from_secs(MAX_BACKOFF_SECS));
        }
    }
}

fn is_hard_error(code: i64) -> bool {
    matches!(code, -32600 | -32601 | -32602)
}

fn program_accounts_params(program_id: &str, data_size: u64) -> Value {
    json!([
        program_id,
        {
            "encoding": "base64",
            "filters": [
                { "dataSize": data_size }
            ]
        }
    ])
}

fn account_info_params(address: &str) -> Value {
    json!([
        address,
        { "encoding": "base64" }
    ])
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
