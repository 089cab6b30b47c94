use auth::ApiCredentials;
use binance_rest::BinanceRestClient;
use common::BinanceEnvironment;
use connector_binance::{
    open_user_data_stream, BinanceDiffStream, DiffStreamConfig, UserDataConfig, UserDataMessage,
};
use depth_cache::{DepthCacheManager, SyncConfig, SyncEvent};
use metrics::{create_metrics, SharedMetrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Interval for top of book and health logging.
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    common::init_logging();

    let symbols = std::env::args().skip(1).collect::<Vec<_>>();

    let symbols = if symbols.is_empty() {
        vec!["BTCUSDT".to_string()]
    } else {
        symbols
    };

    let environment = BinanceEnvironment::from_env();
    info!(symbols = ?symbols, environment = %environment, "Starting depth cache");

    let metrics = create_metrics();

    let rest_client = match BinanceRestClient::new(environment) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to build REST client");
            return;
        }
    };
    let diff_stream =
        BinanceDiffStream::new(DiffStreamConfig::new(environment)).with_metrics(metrics.clone());

    let manager = DepthCacheManager::from_shared(
        rest_client,
        Arc::new(diff_stream),
        SyncConfig::default(),
    )
    .with_metrics(metrics.clone());

    // Log sync state changes
    let mut sync_events = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = sync_events.recv().await {
            match event {
                SyncEvent::Synchronized {
                    symbol,
                    last_update_id,
                    replayed,
                } => info!(
                    symbol = %symbol,
                    last_update_id = ?last_update_id,
                    replayed,
                    "Synchronized"
                ),
                SyncEvent::Failed { symbol, error } => {
                    warn!(symbol = %symbol, error = %error, "Synchronization failed")
                }
                SyncEvent::Resyncing { symbol, .. } => info!(symbol = %symbol, "Resyncing"),
                SyncEvent::Updated { .. } | SyncEvent::Rejected { .. } => {}
            }
        }
    });

    manager.start_tracking(&symbols);

    // Create shutdown signal channel
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    let user_data = spawn_user_data_logger(environment, metrics.clone(), shutdown_rx.clone());

    let mut interval = tokio::time::interval(REPORT_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                for symbol in &symbols {
                    let bid = manager.best_bid(symbol);
                    let ask = manager.best_ask(symbol);
                    info!(
                        symbol = %symbol,
                        best_bid = ?bid.map(|l| l.price),
                        best_ask = ?ask.map(|l| l.price),
                        syncing = manager.is_syncing(symbol),
                        "Top of book"
                    );
                }
                let snapshot = metrics.snapshot();
                info!(
                    status = %snapshot.health_status(),
                    applied = snapshot.events_applied,
                    events_per_sec = format!("{:.1}", snapshot.events_per_second),
                    errors = snapshot.websocket_errors + snapshot.parse_errors,
                    gaps = snapshot.sequence_gaps,
                    "Health check"
                );
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    manager.stop_all();
    if let Some(handle) = user_data {
        let _ = handle.await;
    }

    // Print final metrics
    println!("\n{}", metrics.snapshot());

    info!("Shutdown complete");
}

/// Log account and order events when API credentials are configured.
fn spawn_user_data_logger(
    environment: BinanceEnvironment,
    metrics: SharedMetrics,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Option<tokio::task::JoinHandle<()>> {
    let credentials = match ApiCredentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            info!(reason = %e, "User data stream disabled");
            return None;
        }
    };

    let handle = tokio::spawn(async move {
        let rest_client = match BinanceRestClient::with_credentials(credentials, environment) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                error!(error = %e, "Failed to build authenticated REST client");
                return;
            }
        };
        if let Err(e) = rest_client.sync_time().await {
            warn!(error = %e, "Time sync failed, using local clock");
        }

        let mut stream =
            match open_user_data_stream(rest_client, UserDataConfig::default(), metrics).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "Failed to open user data stream");
                    return;
                }
            };

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(UserDataMessage::AccountInfo(payload))) => {
                        info!(balances = %payload["B"], "Account update")
                    }
                    Some(Ok(UserDataMessage::ExecutionReport(payload))) => info!(
                        symbol = %payload["s"],
                        status = %payload["X"],
                        "Execution report"
                    ),
                    Some(Ok(UserDataMessage::Other(payload))) => {
                        info!(event = %payload["e"], "Unhandled user data event")
                    }
                    Some(Err(e)) => warn!(error = %e, "User data stream error"),
                    None => break,
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        stream.close().await;
                        return;
                    }
                }
            }
        }
    });
    Some(handle)
}
