//! Test doubles: a recording gateway and an adapter harness.

use std::sync::Arc;

use async_trait::async_trait;
use common::FixedClock;
use connector_core::{
    AdapterEvent, ExchangeGateway, GatewayError, MovePayload, OrderPayload, Request,
    ResizePayload, TransportEvent,
};
use execution_core::{
    ContingencyType, ExecutionKind, ExecutionReport, InstrumentSpec, LinkInfo, OrderSnapshot,
    ReportedOrderStatus, TradeFill, TriggerState,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use crate::config::AdapterConfig;
use crate::provider::BitmexAdapter;

pub const NOW_MS: i64 = 1_700_000_000_000;
pub const SYMBOL: &str = "XBTUSD";

/// A request as the gateway received it.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Submit(Request<OrderPayload>),
    Cancel(Request<String>),
    Resize(Request<ResizePayload>),
    Amend(Request<MovePayload>),
    Shutdown,
}

/// Gateway that records every request and answers with a configurable error.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    failure: Mutex<Option<GatewayError>>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, error: GatewayError) {
        *self.failure.lock() = Some(error);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().last().cloned()
    }

    fn record(&self, sent: Sent) -> Result<(), GatewayError> {
        self.sent.lock().push(sent);
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExchangeGateway for RecordingGateway {
    async fn submit(&self, request: Request<OrderPayload>) -> Result<(), GatewayError> {
        self.record(Sent::Submit(request))
    }

    async fn cancel(&self, request: Request<String>) -> Result<(), GatewayError> {
        self.record(Sent::Cancel(request))
    }

    async fn resize(&self, request: Request<ResizePayload>) -> Result<(), GatewayError> {
        self.record(Sent::Resize(request))
    }

    async fn amend(&self, request: Request<MovePayload>) -> Result<(), GatewayError> {
        self.record(Sent::Amend(request))
    }

    async fn shutdown(&self) {
        self.sent.lock().push(Sent::Shutdown);
    }
}

/// An adapter wired to a recording gateway and an unbounded event channel,
/// with `XBTUSD` (tick 0.5) already known.
pub struct Harness {
    pub adapter: BitmexAdapter,
    pub gateway: Arc<RecordingGateway>,
    pub events: mpsc::UnboundedReceiver<AdapterEvent>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AdapterConfig::default())
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        let gateway = RecordingGateway::new();
        let (tx, events) = mpsc::unbounded_channel();
        let clock = Arc::new(FixedClock::new(NOW_MS));
        let adapter = BitmexAdapter::new(config, gateway.clone(), Arc::new(tx), clock.clone());
        adapter.handle(TransportEvent::Instrument(InstrumentSpec {
            symbol: SYMBOL.to_string(),
            tick_size: dec!(0.5),
            multiplier: dec!(100),
        }));
        Self {
            adapter,
            gateway,
            events,
            clock,
        }
    }

    /// Everything published since the last drain.
    pub fn drain(&mut self) -> Vec<AdapterEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Order snapshots published since the last drain.
    pub fn order_updates(&mut self) -> Vec<OrderSnapshot> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                AdapterEvent::OrderUpdated(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    pub fn report(&self, report: ExecutionReport) {
        self.adapter.handle(TransportEvent::Execution(report));
    }

    /// Acknowledge an unlinked order.
    pub fn ack(&self, temp_id: &str, real_id: &str) {
        self.report(new_report(real_id, temp_id, None, TriggerState::None));
    }

    /// Acknowledge a linked order.
    pub fn ack_linked(
        &self,
        temp_id: &str,
        real_id: &str,
        link_id: &str,
        contingency: ContingencyType,
        triggered: TriggerState,
    ) {
        let link = LinkInfo {
            link_id: link_id.to_string(),
            contingency,
        };
        self.report(new_report(real_id, temp_id, Some(link), triggered));
    }
}

pub fn new_report(
    real_id: &str,
    temp_id: &str,
    link: Option<LinkInfo>,
    triggered: TriggerState,
) -> ExecutionReport {
    ExecutionReport::new(
        real_id,
        temp_id,
        SYMBOL,
        NOW_MS,
        ExecutionKind::New {
            link,
            trailing_offset: None,
            triggered,
        },
    )
}

pub fn trade_report(
    real_id: &str,
    last_qty: Decimal,
    cum_qty: Decimal,
    leaves_qty: Decimal,
    order_status: ReportedOrderStatus,
) -> ExecutionReport {
    ExecutionReport::new(
        real_id,
        "",
        SYMBOL,
        NOW_MS + 1,
        ExecutionKind::Trade(TradeFill {
            exec_id: format!("exec-{cum_qty}"),
            last_qty,
            last_price: dec!(50000),
            cum_qty,
            leaves_qty,
            avg_price: Some(dec!(50000)),
            order_status,
        }),
    )
}

pub fn kind_report(real_id: &str, kind: ExecutionKind) -> ExecutionReport {
    ExecutionReport::new(real_id, "", SYMBOL, NOW_MS + 2, kind)
}
