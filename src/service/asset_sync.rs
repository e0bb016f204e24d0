//! Asset synchronizer (spec.md §4.3). Cadence: slow loop.
//!
//! Grounded on `examples/original_source/process_payments.py`'s
//! `process_assets`/`sync_liquidity_pools`/`fetch_beam_price`: parse the
//! `K1=V1;K2=V2` metadata string, derive `decimals` from `NTH_RATIO`, tag
//! verified/spam by configured id sets, then optionally enrich with DEX
//! liquidity-pool rates priced off a fetched native/USD rate.

use std::collections::BTreeMap;

use serde_json::Value;
use slog::{debug, error, warn, Logger};
use url::Url;

use crate::{
    db::{native_price::NativePriceModel, Asset, AssetModel, LedgerDb, NativePrice, NewAsset},
    error::GatewayError,
    rpc::NodeClient,
};

const NATIVE_ASSET_ID: i64 = 0;
const DEFAULT_DECIMALS: i32 = 8;

/// `Asset 0` is fixed: the native token always exists with this metadata
/// (spec.md §3 "Asset 0 always exists with fixed metadata").
const NATIVE_ASSET_METADATA: &str = "UN=BEAM;SN=BEAM;N=Beam";

pub fn parse_metadata(metadata: &str) -> BTreeMap<String, String> {
    metadata
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn decimals_from_metadata(meta: &BTreeMap<String, String>) -> i32 {
    meta.get("NTH_RATIO")
        .and_then(|ratio| ratio.parse::<u64>().ok())
        .filter(|&ratio| ratio > 0)
        .map(|ratio| (ratio as f64).log10().trunc() as i32)
        .unwrap_or(DEFAULT_DECIMALS)
}

/// Fetches the native token's USD rate from `native_price_url` and stores it
/// (the `fetch_beam_price` step spec.md §4.9 runs ahead of asset sync).
/// Logged-and-skipped on any failure: a stale cached price is preferable to
/// aborting the slow loop.
pub fn fetch_native_price(
    price_url: Option<&Url>,
    ledger: &LedgerDb,
    now: i64,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let Some(url) = price_url else {
        return Ok(());
    };

    let price_usd = match reqwest::blocking::get(url.clone())
        .and_then(|resp| resp.json::<Value>())
    {
        Ok(body) => match body.pointer("/beam/usd").and_then(Value::as_f64) {
            Some(price) => price,
            None => {
                warn!(logger, "native price response missing beam.usd field"; "url" => url.as_str());
                return Ok(());
            }
        },
        Err(e) => {
            warn!(logger, "failed fetching native price"; "error" => %e);
            return Ok(());
        }
    };

    let mut conn = ledger.get_conn()?;
    NativePrice::set_beam_usd(price_usd, now, &mut conn)?;
    debug!(logger, "updated native price"; "price_usd" => price_usd);
    Ok(())
}

pub fn sync_assets(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    verified_asset_ids: &[u64],
    spam_asset_ids: &[u64],
    dex_contract_id: Option<&str>,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let mut conn = ledger.get_conn()?;
    if Asset::find(NATIVE_ASSET_ID, &mut conn)?.is_none() {
        Asset::upsert(
            &NewAsset {
                asset_id: NATIVE_ASSET_ID,
                metadata: NATIVE_ASSET_METADATA,
                decimals: DEFAULT_DECIMALS,
                is_verified: true,
                is_spam: false,
                rate_beam: Some(1.0),
                rate_usd: None,
            },
            &mut conn,
        )?;
    }

    let assets = match client.assets_list(true) {
        Ok(assets) => assets,
        Err(e) => {
            error!(logger, "asset sync: assets_list failed"; "error" => %e);
            return Ok(());
        }
    };

    for asset in assets {
        let meta = parse_metadata(&asset.metadata);
        let decimals = decimals_from_metadata(&meta);
        let is_verified = verified_asset_ids.contains(&asset.asset_id);
        let is_spam = spam_asset_ids.contains(&asset.asset_id);

        if let Err(e) = Asset::upsert(
            &NewAsset {
                asset_id: asset.asset_id as i64,
                metadata: &asset.metadata,
                decimals,
                is_verified,
                is_spam,
                rate_beam: None,
                rate_usd: None,
            },
            &mut conn,
        ) {
            error!(logger, "asset sync: upsert failed"; "asset_id" => asset.asset_id, "error" => %e);
        }
    }

    if let Some(contract_id) = dex_contract_id {
        if let Err(e) = sync_liquidity_pools(client, ledger, contract_id, logger) {
            error!(logger, "asset sync: liquidity pool sync failed"; "error" => %e);
        }
    }

    Ok(())
}

fn sync_liquidity_pools(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    contract_id: &str,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let response = client.invoke_contract(contract_id, "role=manager,action=pools_view")?;
    let Some(output) = response.get("output").and_then(Value::as_str) else {
        debug!(logger, "liquidity pool sync: no output in DEX response");
        return Ok(());
    };
    let parsed: Value = match serde_json::from_str(output) {
        Ok(v) => v,
        Err(e) => {
            warn!(logger, "liquidity pool sync: malformed DEX output"; "error" => %e);
            return Ok(());
        }
    };
    let Some(pools) = parsed.get("res").and_then(Value::as_array) else {
        return Ok(());
    };

    let mut conn = ledger.get_conn()?;
    let beam_price = NativePrice::get_beam_usd(&mut conn)?.map(|p| p.price_usd);

    for pool in pools {
        let aid1 = pool.get("aid1").and_then(Value::as_i64).unwrap_or(0);
        let aid2 = pool.get("aid2").and_then(Value::as_i64).unwrap_or(0);
        let rate1_2 = pool.get("k1_2").and_then(Value::as_f64).unwrap_or(0.0);
        let rate2_1 = pool.get("k2_1").and_then(Value::as_f64).unwrap_or(0.0);

        let (rate_beam_1, rate_beam_2) = if aid1 == NATIVE_ASSET_ID {
            (None, Some(rate1_2))
        } else if aid2 == NATIVE_ASSET_ID {
            (Some(rate2_1), None)
        } else {
            (None, None)
        };

        apply_pool_rate(&mut conn, aid1, rate_beam_1, beam_price, logger);
        apply_pool_rate(&mut conn, aid2, rate_beam_2, beam_price, logger);
    }

    Ok(())
}

fn apply_pool_rate(
    conn: &mut crate::db::Conn,
    asset_id: i64,
    rate_beam: Option<f64>,
    beam_price: Option<f64>,
    logger: &Logger,
) {
    let Some(rate_beam) = rate_beam else { return };
    let Some(existing) = Asset::find(asset_id, conn).ok().flatten() else {
        return;
    };
    let rate_usd = beam_price.map(|p| rate_beam * p);
    if let Err(e) = Asset::upsert(
        &NewAsset {
            asset_id,
            metadata: &existing.metadata,
            decimals: existing.decimals,
            is_verified: existing.is_verified,
            is_spam: existing.is_spam,
            rate_beam: Some(rate_beam),
            rate_usd,
        },
        conn,
    ) {
        error!(logger, "liquidity pool sync: rate upsert failed"; "asset_id" => asset_id, "error" => %e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kv_metadata() {
        let meta = parse_metadata("UN=Foo;SN=FOO;NTH_RATIO=100000000");
        assert_eq!(meta.get("UN").unwrap(), "Foo");
        assert_eq!(decimals_from_metadata(&meta), 8);
    }

    #[test]
    fn falls_back_to_default_decimals() {
        let meta = parse_metadata("UN=Foo");
        assert_eq!(decimals_from_metadata(&meta), DEFAULT_DECIMALS);
    }
}
