//! Application configuration loaded from environment variables.

use std::str::FromStr;

use stream_accounting::MAX_FEE_BPS;

use crate::errors::{IndexerError, Result};

/// Largest `TOKEN_DECIMALS` accepted. A `u64` amount has at most 20 digits.
pub const MAX_TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Clone)]
pub struct Config {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,
    /// The streaming program address (base58)
    pub program_id: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to re-read the program's accounts
    pub poll_interval_secs: u64,
    /// Exact byte size of a stream account, used as a `dataSize` filter
    pub account_data_size: u64,
    /// Page size for `GET /streams` when the caller sends none
    pub default_page_limit: usize,
    /// Decimals used when rendering amounts for display
    pub token_decimals: u32,
    /// Attempts per RPC call before giving up
    pub rpc_max_attempts: u32,
    /// Fee quoted on validated withdrawals, in basis points
    pub withdrawal_fee_bps: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let program_id = lookup("PROGRAM_ID").ok_or_else(|| {
            IndexerError::Config("PROGRAM_ID environment variable is required".to_string())
        })?;
        if !is_pubkey(&program_id) {
            return Err(IndexerError::Config(format!(
                "PROGRAM_ID is not a base58 public key: {program_id}"
            )));
        }

        let token_decimals = parse_or(&lookup, "TOKEN_DECIMALS", 9)?;
        if token_decimals > MAX_TOKEN_DECIMALS {
            return Err(IndexerError::Config(format!(
                "TOKEN_DECIMALS must be at most {MAX_TOKEN_DECIMALS}, got {token_decimals}"
            )));
        }

        let withdrawal_fee_bps = parse_or(&lookup, "WITHDRAWAL_FEE_BPS", 0)?;
        if withdrawal_fee_bps > MAX_FEE_BPS {
            return Err(IndexerError::Config(format!(
                "WITHDRAWAL_FEE_BPS must be at most {MAX_FEE_BPS}, got {withdrawal_fee_bps}"
            )));
        }

        Ok(Config {
            rpc_url: lookup("RPC_URL")
                .unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string()),
            program_id,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./streams.db".to_string()),
            api_port: parse_or(&lookup, "API_PORT", 3001)?,
            poll_interval_secs: parse_or(&lookup, "POLL_INTERVAL_SECS", 30)?,
            account_data_size: parse_or(&lookup, "ACCOUNT_DATA_SIZE", 1000)?,
            default_page_limit: parse_or(&lookup, "DEFAULT_PAGE_LIMIT", 20)?,
            token_decimals,
            rpc_max_attempts: parse_or(&lookup, "RPC_MAX_ATTEMPTS", 5)?,
            withdrawal_fee_bps,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| IndexerError::Config(format!("Invalid {key}: {raw}"))),
        None => Ok(default),
    }
}

/// True when `value` decodes to a 32-byte base58 public key.
pub fn is_pubkey(value: &str) -> bool {
    bs58::decode(value)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}
