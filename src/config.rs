//! Config definition and processing for the gateway (spec.md §6).

use std::time::Duration;

use clap::Parser;
use displaydoc::Display;
use url::Url;

/// Missing or malformed configuration is fatal at startup (spec.md §7
/// `ConfigError`).
#[derive(Display, Debug)]
pub enum ConfigError {
    /// invalid configuration for `{field}`: {reason}
    Invalid {
        field: &'static str,
        reason: String,
    },
}

fn parse_url(s: &str) -> Result<Url, String> {
    Url::parse(s).map_err(|e| format!("invalid URL: {e}"))
}

fn parse_duration_secs(s: &str) -> Result<Duration, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("not an integer number of seconds: {s}"))?;
    Ok(Duration::from_secs(secs))
}

fn parse_id_list(s: &str) -> Result<Vec<u64>, String> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid asset id '{part}': {e}"))
        })
        .collect()
}

fn parse_url_list(s: &str) -> Result<Vec<Url>, String> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',').map(|part| parse_url(part.trim())).collect()
}

/// Command-line / environment configuration for the gateway.
#[derive(Clone, Debug, Parser)]
#[clap(name = "beam-gateway", about = "Custodial payment gateway for a BEAM-style node", version)]
pub struct Config {
    /// JSON-RPC endpoint of the wallet node.
    #[clap(long, env = "GATEWAY_NODE_RPC_URL", value_parser = parse_url)]
    pub node_rpc_url: Url,

    /// SQLite connection string for the ledger store.
    #[clap(long, env = "GATEWAY_DATABASE_URL", default_value = "gateway.sqlite")]
    pub database_url: String,

    /// Number of pooled ledger connections.
    #[clap(long, env = "GATEWAY_DB_CONNECTIONS", default_value = "8")]
    pub db_connections: u32,

    /// Confirmations required before a status=3 transaction is finalized.
    #[clap(long, env = "GATEWAY_CONFIRMATION_THRESHOLD", default_value = "10")]
    pub confirmation_threshold: i32,

    /// Price feed URL for the native token's USD rate (spec.md §4.3/§4.9).
    #[clap(long, env = "GATEWAY_NATIVE_PRICE_URL", value_parser = parse_url)]
    pub native_price_url: Option<Url>,

    /// Comma-separated webhook endpoints to notify of transaction lifecycle events.
    #[clap(long, env = "GATEWAY_WEBHOOK_URLS", value_parser = parse_url_list, default_value = "")]
    pub webhook_urls: Vec<Url>,

    /// Comma-separated asset ids to mark verified on sync.
    #[clap(long, env = "GATEWAY_VERIFIED_ASSET_IDS", value_parser = parse_id_list, default_value = "")]
    pub verified_asset_ids: Vec<u64>,

    /// Comma-separated asset ids to mark spam on sync.
    #[clap(long, env = "GATEWAY_SPAM_ASSET_IDS", value_parser = parse_id_list, default_value = "")]
    pub spam_asset_ids: Vec<u64>,

    /// Optional DEX contract id for the asset synchronizer's liquidity-pool rate lookup.
    #[clap(long, env = "GATEWAY_DEX_CONTRACT_ID")]
    pub dex_contract_id: Option<String>,

    /// Fast-loop cadence (projector, withdrawal queue).
    #[clap(long, env = "GATEWAY_FAST_LOOP_INTERVAL_SECS", value_parser = parse_duration_secs, default_value = "5")]
    pub fast_loop_interval: Duration,

    /// Slow-loop cadence (asset sync, address sync, auditor).
    #[clap(long, env = "GATEWAY_SLOW_LOOP_INTERVAL_SECS", value_parser = parse_duration_secs, default_value = "120")]
    pub slow_loop_interval: Duration,

    /// Webhook-loop cadence (dispatcher + failed-webhook replay).
    #[clap(long, env = "GATEWAY_WEBHOOK_LOOP_INTERVAL_SECS", value_parser = parse_duration_secs, default_value = "10")]
    pub webhook_loop_interval: Duration,

    /// Maximum webhook delivery attempts before a FailedWebhook row is persisted.
    #[clap(long, env = "GATEWAY_WEBHOOK_MAX_RETRIES", default_value = "5")]
    pub webhook_max_retries: u32,
}

impl Config {
    /// Parse from `std::env::args()` / environment variables, then apply the
    /// business-rule validation clap's derive can't express.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "webhook_max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.confirmation_threshold < 0 {
            return Err(ConfigError::Invalid {
                field: "confirmation_threshold",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_list() {
        assert_eq!(parse_id_list("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("").unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn rejects_malformed_id() {
        assert!(parse_id_list("1,x").is_err());
    }
}
