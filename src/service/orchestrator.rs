//! Scheduler / orchestrator (spec.md §4.9): three cooperatively scheduled
//! loops running concurrently on independent OS threads, grounded on the
//! teacher's `SyncThread`/`WebhookThread` (`Arc<AtomicBool>` stop trigger,
//! named `thread::Builder`, a `Drop` impl that stops and joins). Top-level
//! iteration errors are logged and alerted, never allowed to kill a loop
//! (spec.md §4.9/§7).

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use reqwest::blocking::Client;
use slog::{debug, error, Logger};
use url::Url;

use crate::{
    config::Config,
    db::LedgerDb,
    error::GatewayError,
    rpc::NodeClient,
    service::{
        alert::AlertSink, asset_sync, address_sync, auditor, projector, webhook, withdrawal_queue,
    },
};

pub struct GatewayThreads {
    fast: Option<JoinHandle<()>>,
    slow: Option<JoinHandle<()>>,
    webhook: Option<JoinHandle<()>>,
    stop_requested: Arc<AtomicBool>,
}

impl GatewayThreads {
    pub fn start(
        config: Config,
        client: Arc<dyn NodeClient>,
        ledger: LedgerDb,
        alert: Arc<dyn AlertSink>,
        logger: Logger,
    ) -> Self {
        let stop_requested = Arc::new(AtomicBool::new(false));

        let fast = Some(spawn_loop(
            "fast-loop",
            stop_requested.clone(),
            config.fast_loop_interval,
            logger.new(slog::o!("loop" => "fast")),
            {
                let client = client.clone();
                let ledger = ledger.clone();
                let alert = alert.clone();
                let threshold = config.confirmation_threshold;
                move |logger| fast_iteration(client.as_ref(), &ledger, alert.as_ref(), threshold, logger)
            },
        ));

        let slow = Some(spawn_loop(
            "slow-loop",
            stop_requested.clone(),
            config.slow_loop_interval,
            logger.new(slog::o!("loop" => "slow")),
            {
                let client = client.clone();
                let ledger = ledger.clone();
                let alert = alert.clone();
                let native_price_url = config.native_price_url.clone();
                let verified_asset_ids = config.verified_asset_ids.clone();
                let spam_asset_ids = config.spam_asset_ids.clone();
                let dex_contract_id = config.dex_contract_id.clone();
                move |logger| {
                    slow_iteration(
                        client.as_ref(),
                        &ledger,
                        alert.as_ref(),
                        native_price_url.as_ref(),
                        &verified_asset_ids,
                        &spam_asset_ids,
                        dex_contract_id.as_deref(),
                        logger,
                    )
                }
            },
        ));

        let webhook = Some(spawn_loop(
            "webhook-loop",
            stop_requested.clone(),
            config.webhook_loop_interval,
            logger.new(slog::o!("loop" => "webhook")),
            {
                let ledger = ledger.clone();
                let webhook_urls = config.webhook_urls.clone();
                let threshold = config.confirmation_threshold;
                let max_retries = config.webhook_max_retries;
                let http = Client::builder()
                    .timeout(Duration::from_secs(5))
                    .build()
                    .expect("failed constructing reqwest client");
                move |logger| webhook_iteration(&http, &ledger, &webhook_urls, threshold, max_retries, logger)
            },
        ));

        Self {
            fast,
            slow,
            webhook,
            stop_requested,
        }
    }

    pub fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        for handle in [self.fast.take(), self.slow.take(), self.webhook.take()]
            .into_iter()
            .flatten()
        {
            handle.join().expect("gateway thread panicked");
        }
    }
}

impl Drop for GatewayThreads {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_loop<F>(
    name: &'static str,
    stop_requested: Arc<AtomicBool>,
    interval: Duration,
    logger: Logger,
    mut iteration: F,
) -> JoinHandle<()>
where
    F: FnMut(&Logger) -> Result<(), GatewayError> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            debug!(logger, "loop started");
            loop {
                if stop_requested.load(Ordering::SeqCst) {
                    debug!(logger, "stop requested");
                    break;
                }
                if let Err(e) = iteration(&logger) {
                    error!(logger, "iteration failed"; "error" => %e);
                }
                thread::sleep(interval);
            }
        })
        .expect("failed starting gateway thread")
}

fn fast_iteration(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    alert: &dyn AlertSink,
    confirmation_threshold: i32,
    logger: &Logger,
) -> Result<(), GatewayError> {
    projector::project_transactions(client, ledger, confirmation_threshold, logger)?;
    withdrawal_queue::process_withdrawals(client, ledger, alert, logger)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn slow_iteration(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    alert: &dyn AlertSink,
    native_price_url: Option<&Url>,
    verified_asset_ids: &[u64],
    spam_asset_ids: &[u64],
    dex_contract_id: Option<&str>,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let now = chrono::Utc::now().timestamp();
    asset_sync::fetch_native_price(native_price_url, ledger, now, logger)?;
    asset_sync::sync_assets(
        client,
        ledger,
        verified_asset_ids,
        spam_asset_ids,
        dex_contract_id,
        logger,
    )?;
    address_sync::sync_addresses(client, ledger, logger)?;
    auditor::audit_balances(client, ledger, alert, logger)?;
    Ok(())
}

fn webhook_iteration(
    http: &Client,
    ledger: &LedgerDb,
    webhook_urls: &[Url],
    confirmation_threshold: i32,
    max_retries: u32,
    logger: &Logger,
) -> Result<(), GatewayError> {
    webhook::dispatch_webhooks(http, ledger, webhook_urls, confirmation_threshold, max_retries, logger)?;
    webhook::replay_failed_webhooks(http, ledger, logger)?;
    Ok(())
}
