//! The adapter facade handed to the front-end.

use std::sync::Arc;

use common::SharedClock;
use connector_core::{
    ConnectorError, EventSink, ExchangeGateway, TextCategory, TransportEvent, TransportReceiver,
};
use execution_core::{OrderDuration, OrderKind, OrderSnapshot, SharedInstrumentBook};
use metrics::SharedMetrics;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::composer::OrderSubmissionComposer;
use crate::config::AdapterConfig;
use crate::dispatch::OrderDispatcher;
use crate::error::AdapterError;
use crate::intent::{CancelIntent, MoveIntent, ResizeIntent, SubmitIntent};
use crate::pump::{run_report_pump, TransportRouter};
use crate::state::AdapterState;

/// Capabilities reported to the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedFeatures {
    pub market_data: bool,
    pub trading: bool,
    pub oco: bool,
    pub brackets: bool,
    /// Trailing stops are separate orders, not attached to an entry.
    pub trailing_stops_as_independent_orders: bool,
    pub balance: bool,
    pub durations: Vec<OrderDuration>,
    pub order_kinds: Vec<OrderKind>,
}

impl SupportedFeatures {
    fn market_data_only() -> Self {
        Self {
            market_data: true,
            trading: false,
            oco: false,
            brackets: false,
            trailing_stops_as_independent_orders: false,
            balance: false,
            durations: Vec::new(),
            order_kinds: Vec::new(),
        }
    }

    fn trading() -> Self {
        Self {
            market_data: true,
            trading: true,
            oco: true,
            brackets: true,
            trailing_stops_as_independent_orders: true,
            balance: true,
            durations: vec![OrderDuration::Gtc],
            order_kinds: vec![OrderKind::Limit, OrderKind::Market],
        }
    }
}

/// BitMEX order-state adapter.
///
/// Intents (submit, cancel, resize, move) run on the caller's task and
/// round-trip through the [`ExchangeGateway`]. Transport events are fed in
/// with [`handle`](Self::handle) or a pump spawned by
/// [`spawn_pump`](Self::spawn_pump). Both paths share the registries.
pub struct BitmexAdapter {
    state: Arc<AdapterState>,
    composer: OrderSubmissionComposer,
    dispatcher: OrderDispatcher,
    router: Arc<TransportRouter>,
    gateway: Arc<dyn ExchangeGateway>,
    trading_enabled: bool,
    shutdown_tx: watch::Sender<bool>,
}

impl BitmexAdapter {
    pub fn new(
        config: AdapterConfig,
        gateway: Arc<dyn ExchangeGateway>,
        sink: Arc<dyn EventSink>,
        clock: SharedClock,
    ) -> Self {
        let state = Arc::new(AdapterState::new(config, sink, clock));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            composer: OrderSubmissionComposer::new(state.clone(), gateway.clone()),
            dispatcher: OrderDispatcher::new(state.clone(), gateway.clone()),
            router: Arc::new(TransportRouter::new(state.clone())),
            state,
            gateway,
            trading_enabled: true,
            shutdown_tx,
        }
    }

    /// Enable or disable order entry (disabled when there are no credentials).
    pub fn with_trading(mut self, enabled: bool) -> Self {
        self.trading_enabled = enabled;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.state.config
    }

    pub fn is_trading_enabled(&self) -> bool {
        self.trading_enabled
    }

    /// Announce the session. Testnet sessions get a notice.
    pub fn start(&self) {
        let environment = self.state.config.environment;
        info!(
            environment = %environment,
            trading = self.trading_enabled,
            "adapter started"
        );
        if let Some(notice) = environment.session_notice() {
            self.state.emit_text(notice, TextCategory::Unclassified);
        }
    }

    pub fn supported_features(&self) -> SupportedFeatures {
        if self.trading_enabled {
            SupportedFeatures::trading()
        } else {
            SupportedFeatures::market_data_only()
        }
    }

    fn ensure_trading(&self) -> Result<(), AdapterError> {
        if self.trading_enabled {
            Ok(())
        } else {
            Err(AdapterError::TradingDisabled)
        }
    }

    /// Submit a single order, a bracket or an OCO list.
    ///
    /// Returns the temporary ids of the new orders.
    pub async fn submit(&self, intent: SubmitIntent) -> Result<Vec<String>, AdapterError> {
        self.ensure_trading()?;
        self.composer.submit(intent).await
    }

    pub async fn cancel(&self, intent: CancelIntent) -> Result<(), AdapterError> {
        self.ensure_trading()?;
        self.dispatcher.cancel(intent).await
    }

    pub async fn resize(&self, intent: ResizeIntent) -> Result<(), AdapterError> {
        self.ensure_trading()?;
        self.dispatcher.resize(intent).await
    }

    pub async fn move_order(&self, intent: MoveIntent) -> Result<(), AdapterError> {
        self.ensure_trading()?;
        self.dispatcher.move_order(intent).await
    }

    /// Apply one transport event on the caller's task.
    pub fn handle(&self, event: TransportEvent) {
        self.router.handle(event);
    }

    /// Spawn the background task delivering transport events.
    pub fn spawn_pump(
        &self,
        receiver: TransportReceiver,
    ) -> JoinHandle<Result<(), ConnectorError>> {
        let router = self.router.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(run_report_pump(router, receiver, shutdown_rx))
    }

    /// Stop the pump and the gateway feed. Working orders are not cancelled.
    pub async fn close(&self) {
        info!("closing adapter");
        if self.shutdown_tx.send_replace(true) {
            warn!("adapter already closed");
        }
        self.gateway.shutdown().await;
    }

    pub fn metrics(&self) -> SharedMetrics {
        self.state.metrics.clone()
    }

    pub fn instruments(&self) -> SharedInstrumentBook {
        self.state.instruments.clone()
    }

    /// Snapshot of an order by current or temporary id.
    pub fn order(&self, id: &str) -> Option<OrderSnapshot> {
        self.state
            .orders
            .get(id)
            .map(|mut record| record.publish(record.modified_at_ms()))
    }

    /// Snapshots of every live order.
    pub fn orders(&self) -> Vec<OrderSnapshot> {
        self.state
            .orders
            .snapshot_all()
            .into_iter()
            .map(|mut record| record.publish(record.modified_at_ms()))
            .collect()
    }

    /// Number of orders buffered for the next batch-end cancel.
    pub fn pending_batch_cancels(&self) -> usize {
        self.state.batch.len()
    }

    /// Number of submissions whose round-trip has not finished.
    pub fn pending_submissions(&self) -> usize {
        self.state.pending.len()
    }

    /// Link group of an order, when it has one.
    pub fn link_group_of(&self, id: &str) -> Option<Vec<String>> {
        if !self.state.orders.contains(id) {
            return None;
        }
        self.state.resolve_linked(id).members
    }

    /// Trailing distance of a registered trailing stop.
    pub fn trailing_offset(&self, id: &str) -> Option<Decimal> {
        let current = self.state.orders.current_id(id)?;
        self.state.trailing.offset(&current)
    }
}
