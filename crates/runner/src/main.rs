mod paper;

use std::sync::Arc;
use std::time::Duration;

use adapter::{AdapterConfig, BitmexAdapter, OrderIntent, SubmitIntent};
use common::{SharedClock, SystemClock};
use connector_core::{create_transport_channel, AdapterEvent, TransportEvent};
use execution_core::{InstrumentSpec, OrderSide, WalletUpdate};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::paper::PaperGateway;

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Price at which the paper gateway fills market orders.
const MARK_PRICE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);
const TICK_SIZE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

fn print_event(event: &AdapterEvent) {
    match event {
        AdapterEvent::OrderUpdated(order) => println!(
            "{} | order {} | {:?} {} {} @ {:?} | filled {} / {} | {:?}",
            order.modified_at_ms,
            order.order_id,
            order.side,
            order.size,
            order.symbol,
            order.limit_price,
            order.filled,
            order.size,
            order.status
        ),
        AdapterEvent::OrderExecuted(fill) => println!(
            "{} | fill {} | {} @ {} | exec {}",
            fill.timestamp_ms, fill.order_id, fill.quantity, fill.price, fill.exec_id
        ),
        AdapterEvent::Status(status) => println!(
            "status {} | position {} | upnl {} | volume {}",
            status.symbol, status.position, status.unrealized_pnl, status.volume
        ),
        AdapterEvent::Balance(balances) => {
            for balance in balances {
                println!("balance {} | {}", balance.currency, balance.balance);
            }
        }
        AdapterEvent::SystemText { message, category } => {
            println!("[{category:?}] {message}")
        }
        AdapterEvent::ConnectionLost { reason } => println!("connection lost: {reason}"),
        AdapterEvent::ConnectionRestored => println!("connection restored"),
        AdapterEvent::Market(market) => println!("market {}", market.symbol()),
    }
}

/// A market buy that fills right away and a bracketed limit buy below the mark.
async fn place_demo_orders(adapter: &BitmexAdapter, symbol: &str) {
    let market = OrderIntent::market(symbol, OrderSide::Buy, Decimal::from(100))
        .with_client_tag("paper-market");
    let bracket = OrderIntent::limit(
        symbol,
        OrderSide::Buy,
        Decimal::from(100),
        MARK_PRICE - Decimal::from(50),
    )
    .with_bracket(40, 20)
    .with_client_tag("paper-bracket");

    for intent in [market, bracket] {
        match adapter.submit(SubmitIntent::Single(intent)).await {
            Ok(ids) => info!(orders = ?ids, "Submitted"),
            Err(e) => error!(error = %e, "Submission failed"),
        }
    }
}

#[tokio::main]
async fn main() {
    common::init_logging();

    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "XBTUSD".to_string());
    let config = AdapterConfig::from_env();

    info!(
        symbol = %symbol,
        environment = %config.environment,
        "Starting paper trading session"
    );

    let (transport_tx, transport_rx) = create_transport_channel(config.event_channel_capacity);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let clock: SharedClock = Arc::new(SystemClock);

    let gateway = Arc::new(PaperGateway::new(transport_tx, clock.clone(), MARK_PRICE));
    let adapter = BitmexAdapter::new(config, gateway, Arc::new(event_tx), clock);

    adapter.handle(TransportEvent::Instrument(InstrumentSpec {
        symbol: symbol.clone(),
        tick_size: TICK_SIZE,
        multiplier: Decimal::ONE,
    }));
    adapter.handle(TransportEvent::Wallet(WalletUpdate {
        currency: "XBt".to_string(),
        amount: Some(100_000_000),
        prev_amount: Some(100_000_000),
    }));
    adapter.start();

    let pump_handle = adapter.spawn_pump(transport_rx);

    // Print adapter events as they arrive
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn periodic health reporter
    let health_metrics = adapter.metrics();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        let mut shutdown_rx = shutdown_rx;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = health_metrics.snapshot();
                    let status = snapshot.health_status();
                    info!(
                        status = %status,
                        reports = snapshot.reports_processed,
                        submissions = snapshot.submissions,
                        rejections = snapshot.submission_rejections,
                        unknown = snapshot.unknown_order_reports,
                        "Health check"
                    );
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    place_demo_orders(&adapter, &symbol).await;

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, initiating shutdown");
    }
    let _ = shutdown_tx.send(true);

    adapter.close().await;
    match pump_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Report pump error"),
        Err(e) => error!(error = %e, "Report pump panicked"),
    }
    printer.abort();

    // Print final metrics
    let snapshot = adapter.metrics().snapshot();
    println!("\n{}", snapshot);

    info!("Shutdown complete");
}
