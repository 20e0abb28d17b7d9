//! Paper gateway: acknowledges orders locally and fills market orders at a
//! fixed mark price.

use std::collections::HashMap;

use async_trait::async_trait;
use common::SharedClock;
use connector_core::{
    ExchangeGateway, GatewayError, MovePayload, OrderPayload, Request, ResizePayload,
    TransportEvent, TransportSender,
};
use execution_core::{
    Amendment, ExecutionKind, ExecutionReport, LinkInfo, OrderKind, ReportedOrderStatus,
    TradeFill, TriggerState,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

/// A resting paper order.
#[derive(Debug, Clone)]
struct PaperOrder {
    client_order_id: String,
    symbol: String,
    order_qty: Decimal,
    price: Option<Decimal>,
    stop_px: Option<Decimal>,
}

pub struct PaperGateway {
    transport: TransportSender,
    clock: SharedClock,
    mark_price: Decimal,
    orders: Mutex<HashMap<String, PaperOrder>>,
}

impl PaperGateway {
    pub fn new(transport: TransportSender, clock: SharedClock, mark_price: Decimal) -> Self {
        Self {
            transport,
            clock,
            mark_price,
            orders: Mutex::new(HashMap::new()),
        }
    }

    pub fn resting_orders(&self) -> usize {
        self.orders.lock().len()
    }

    fn report(&self, order_id: &str, order: &PaperOrder, kind: ExecutionKind) -> TransportEvent {
        TransportEvent::Execution(ExecutionReport::new(
            order_id,
            order.client_order_id.as_str(),
            order.symbol.as_str(),
            self.clock.now_ms(),
            kind,
        ))
    }

    fn accept(&self, payload: &OrderPayload) -> Vec<TransportEvent> {
        let order_id = Uuid::new_v4().to_string();
        let order = PaperOrder {
            client_order_id: payload.cl_ord_id.clone(),
            symbol: payload.symbol.clone(),
            order_qty: payload.order_qty,
            price: payload.price,
            stop_px: payload.stop_px,
        };
        let link = payload
            .cl_ord_link_id
            .clone()
            .zip(payload.contingency_type)
            .map(|(link_id, contingency)| LinkInfo {
                link_id,
                contingency,
            });

        let mut events = vec![self.report(
            &order_id,
            &order,
            ExecutionKind::New {
                link,
                trailing_offset: None,
                triggered: TriggerState::None,
            },
        )];

        if payload.ord_type == OrderKind::Market {
            debug!(order_id = %order_id, price = %self.mark_price, "paper fill");
            events.push(self.report(
                &order_id,
                &order,
                ExecutionKind::Trade(TradeFill {
                    exec_id: Uuid::new_v4().to_string(),
                    last_qty: order.order_qty,
                    last_price: self.mark_price,
                    cum_qty: order.order_qty,
                    leaves_qty: Decimal::ZERO,
                    avg_price: Some(self.mark_price),
                    order_status: ReportedOrderStatus::Filled,
                }),
            ));
        } else {
            self.orders.lock().insert(order_id, order);
        }
        events
    }

    async fn deliver(&self, events: Vec<TransportEvent>) -> Result<(), GatewayError> {
        for event in events {
            self.transport
                .send(event)
                .await
                .map_err(|_| GatewayError::Closed)?;
        }
        Ok(())
    }
}

fn not_found(order_id: &str) -> GatewayError {
    GatewayError::Rejected(format!("Not Found: {order_id}"))
}

fn replaced(order: &PaperOrder) -> ExecutionKind {
    ExecutionKind::Replaced(Amendment {
        leaves_qty: order.order_qty,
        order_qty: Some(order.order_qty),
        price: order.price,
        stop_price: order.stop_px,
    })
}

#[async_trait]
impl ExchangeGateway for PaperGateway {
    async fn submit(&self, request: Request<OrderPayload>) -> Result<(), GatewayError> {
        let events = request
            .items()
            .iter()
            .flat_map(|payload| self.accept(payload))
            .collect();
        self.deliver(events).await
    }

    async fn cancel(&self, request: Request<String>) -> Result<(), GatewayError> {
        let events = {
            let mut orders = self.orders.lock();
            if let Some(missing) = request.items().iter().find(|id| !orders.contains_key(*id)) {
                return Err(not_found(missing));
            }
            request
                .items()
                .iter()
                .filter_map(|id| orders.remove(id).map(|order| (id, order)))
                .map(|(id, order)| {
                    self.report(id, &order, ExecutionKind::Canceled { reason: None })
                })
                .collect::<Vec<_>>()
        };
        self.deliver(events).await
    }

    async fn resize(&self, request: Request<ResizePayload>) -> Result<(), GatewayError> {
        let events = {
            let mut orders = self.orders.lock();
            let mut events = Vec::with_capacity(request.len());
            for payload in request.items() {
                let order = orders
                    .get_mut(&payload.order_id)
                    .ok_or_else(|| not_found(&payload.order_id))?;
                order.order_qty = payload.order_qty;
                let kind = replaced(order);
                events.push(self.report(&payload.order_id, order, kind));
            }
            events
        };
        self.deliver(events).await
    }

    async fn amend(&self, request: Request<MovePayload>) -> Result<(), GatewayError> {
        let events = {
            let mut orders = self.orders.lock();
            let mut events = Vec::with_capacity(request.len());
            for payload in request.items() {
                let order = orders
                    .get_mut(&payload.order_id)
                    .ok_or_else(|| not_found(&payload.order_id))?;
                if payload.price.is_some() {
                    order.price = payload.price;
                }
                if payload.stop_px.is_some() {
                    order.stop_px = payload.stop_px;
                }
                let kind = replaced(order);
                events.push(self.report(&payload.order_id, order, kind));
            }
            events
        };
        self.deliver(events).await
    }

    async fn shutdown(&self) {
        info!(resting = self.resting_orders(), "paper gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::FixedClock;
    use connector_core::create_transport_channel;
    use execution_core::{OrderDuration, OrderSide};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn gateway() -> (PaperGateway, connector_core::TransportReceiver) {
        let (tx, rx) = create_transport_channel(16);
        let clock = Arc::new(FixedClock::new(1_000));
        (PaperGateway::new(tx, clock, dec!(50000)), rx)
    }

    fn payload(price: Option<Decimal>) -> OrderPayload {
        OrderPayload::new(
            "temp-1",
            "XBTUSD",
            OrderSide::Buy,
            dec!(10),
            price,
            None,
            OrderDuration::Gtc,
        )
    }

    fn kind(event: TransportEvent) -> ExecutionKind {
        match event {
            TransportEvent::Execution(report) => report.kind,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_market_order_fills_at_mark() {
        let (gateway, mut rx) = gateway();
        gateway.submit(Request::Single(payload(None))).await.unwrap();

        assert!(matches!(kind(rx.recv().await.unwrap()), ExecutionKind::New { .. }));
        match kind(rx.recv().await.unwrap()) {
            ExecutionKind::Trade(fill) => {
                assert_eq!(fill.last_price, dec!(50000));
                assert_eq!(fill.cum_qty, dec!(10));
                assert_eq!(fill.order_status, ReportedOrderStatus::Filled);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(gateway.resting_orders(), 0);
    }

    #[tokio::test]
    async fn test_limit_order_rests_until_cancelled() {
        let (gateway, mut rx) = gateway();
        gateway
            .submit(Request::Single(payload(Some(dec!(49000)))))
            .await
            .unwrap();

        let order_id = match rx.recv().await.unwrap() {
            TransportEvent::Execution(report) => {
                assert_eq!(report.client_order_id, "temp-1");
                report.order_id
            }
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(gateway.resting_orders(), 1);

        gateway.cancel(Request::Single(order_id.clone())).await.unwrap();
        assert!(matches!(
            kind(rx.recv().await.unwrap()),
            ExecutionKind::Canceled { .. }
        ));

        let again = gateway.cancel(Request::Single(order_id)).await;
        assert!(matches!(again, Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_resize_reports_replaced() {
        let (gateway, mut rx) = gateway();
        gateway
            .submit(Request::Single(payload(Some(dec!(49000)))))
            .await
            .unwrap();
        let order_id = match rx.recv().await.unwrap() {
            TransportEvent::Execution(report) => report.order_id,
            other => panic!("unexpected event {other:?}"),
        };

        gateway
            .resize(Request::Single(ResizePayload {
                order_id,
                order_qty: dec!(25),
            }))
            .await
            .unwrap();

        match kind(rx.recv().await.unwrap()) {
            ExecutionKind::Replaced(amendment) => {
                assert_eq!(amendment.leaves_qty, dec!(25));
                assert_eq!(amendment.price, Some(dec!(49000)));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
