//! BEAM custodial payment gateway: reconciliation/withdrawal engine.

use std::sync::Arc;

use beam_gateway::{
    config::Config,
    db::LedgerDb,
    logging::create_app_logger,
    rpc::HttpNodeClient,
    service::{alert::LogAlertSink, GatewayThreads},
};
use slog::info;

fn main() {
    let logger = create_app_logger();

    let config = Config::load().unwrap_or_else(|err| {
        eprintln!("configuration error: {err}");
        std::process::exit(1);
    });

    let ledger = LedgerDb::new_from_url(&config.database_url, config.db_connections)
        .expect("failed opening ledger store");

    let client: Arc<dyn beam_gateway::rpc::NodeClient> =
        Arc::new(HttpNodeClient::new(config.node_rpc_url.clone()));
    let alert = Arc::new(LogAlertSink::new(logger.clone()));

    info!(logger, "starting gateway";
        "node_rpc_url" => config.node_rpc_url.as_str(),
        "database_url" => &config.database_url,
    );

    let _threads = GatewayThreads::start(config, client, ledger, alert, logger.clone());

    // The three loops run forever on their own threads; park this one.
    loop {
        std::thread::park();
    }
}
