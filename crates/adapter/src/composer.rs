//! Turns submit intents into registered orders and one outbound request.
//!
//! Every order of a submission is announced as `PendingSubmit` and
//! registered under a temporary id before the request leaves. When the
//! round-trip fails, every order of that submission is rejected.

use std::sync::Arc;

use connector_core::{AdapterEvent, ExchangeGateway, OrderPayload, Request};
use execution_core::{ContingencyType, OrderRecord, OrderSide, OrderStatus};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::AdapterError;
use crate::intent::{OrderIntent, SubmitIntent};
use crate::state::{AdapterState, Applied};

/// One order of a submission before it is registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedOrder {
    pub intent: OrderIntent,
    pub link: Option<(String, ContingencyType)>,
}

/// Stop-loss and take-profit prices of a bracket.
///
/// Buy: stop-loss below the entry, take-profit above. Sell: the inverse.
pub fn bracket_prices(
    side: OrderSide,
    entry_price: Decimal,
    stop_loss_offset: u32,
    take_profit_offset: u32,
    tick_size: Decimal,
) -> (Decimal, Decimal) {
    let direction = if side.is_buy() {
        Decimal::ONE
    } else {
        Decimal::NEGATIVE_ONE
    };
    let stop_loss = entry_price - direction * Decimal::from(stop_loss_offset) * tick_size;
    let take_profit = entry_price + direction * Decimal::from(take_profit_offset) * tick_size;
    (stop_loss, take_profit)
}

pub struct OrderSubmissionComposer {
    state: Arc<AdapterState>,
    gateway: Arc<dyn ExchangeGateway>,
}

impl OrderSubmissionComposer {
    pub(crate) fn new(state: Arc<AdapterState>, gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { state, gateway }
    }

    /// Expand an intent into the orders to submit.
    ///
    /// Brackets become entry, stop-loss and take-profit sharing a new link
    /// id; OCO lists share a new link id.
    pub fn compose(&self, intent: SubmitIntent) -> Result<Vec<ComposedOrder>, AdapterError> {
        match intent {
            SubmitIntent::Single(order) if order.is_bracket() => self.compose_bracket(order),
            SubmitIntent::Single(order) => Ok(vec![ComposedOrder {
                intent: order,
                link: None,
            }]),
            SubmitIntent::Oco(orders) => {
                if orders.is_empty() {
                    return Err(AdapterError::InvalidIntent("empty OCO list".into()));
                }
                let link_id = self.state.sequence.next_link_id();
                Ok(orders
                    .into_iter()
                    .map(|intent| ComposedOrder {
                        intent,
                        link: Some((link_id.clone(), ContingencyType::OneCancelsTheOther)),
                    })
                    .collect())
            }
        }
    }

    fn compose_bracket(&self, entry: OrderIntent) -> Result<Vec<ComposedOrder>, AdapterError> {
        let entry_price = entry.limit_price.ok_or_else(|| {
            AdapterError::InvalidIntent("bracket entry needs a limit price".into())
        })?;
        let tick_size = self
            .state
            .instruments
            .tick_size(&entry.symbol)
            .ok_or_else(|| AdapterError::UnknownInstrument(entry.symbol.clone()))?;

        let (stop_loss_price, take_profit_price) = bracket_prices(
            entry.side,
            entry_price,
            entry.stop_loss_offset,
            entry.take_profit_offset,
            tick_size,
        );

        let mut stop_loss = OrderIntent::stop(
            entry.symbol.as_str(),
            entry.side.opposite(),
            entry.size,
            stop_loss_price,
        );
        stop_loss.duration = entry.duration;
        stop_loss.client_tag = entry.client_tag.clone();

        let mut take_profit = OrderIntent::limit(
            entry.symbol.as_str(),
            entry.side.opposite(),
            entry.size,
            take_profit_price,
        );
        take_profit.duration = entry.duration;
        take_profit.client_tag = entry.client_tag.clone();

        debug!(
            symbol = %entry.symbol,
            entry = %entry_price,
            stop_loss = %stop_loss_price,
            take_profit = %take_profit_price,
            "composed bracket"
        );

        let link_id = self.state.sequence.next_link_id();
        Ok(vec![
            ComposedOrder {
                intent: entry,
                link: Some((link_id.clone(), ContingencyType::OneTriggersTheOther)),
            },
            ComposedOrder {
                intent: stop_loss,
                link: Some((link_id.clone(), ContingencyType::OneCancelsTheOther)),
            },
            ComposedOrder {
                intent: take_profit,
                link: Some((link_id, ContingencyType::OneCancelsTheOther)),
            },
        ])
    }

    /// Submit an intent. Returns the temporary ids of the created orders.
    pub async fn submit(&self, intent: SubmitIntent) -> Result<Vec<String>, AdapterError> {
        let composed = self.compose(intent)?;
        let is_bulk = composed.len() > 1;
        let now = self.state.now_ms();

        let mut ids = Vec::with_capacity(composed.len());
        let mut payloads = Vec::with_capacity(composed.len());
        for order in composed {
            let id = self.state.sequence.next_order_id();
            let duration = order
                .intent
                .duration
                .unwrap_or(self.state.config.default_duration);

            let record = OrderRecord::new(
                id.clone(),
                order.intent.symbol.clone(),
                order.intent.side,
                order.intent.size,
                order.intent.limit_price,
                order.intent.stop_price,
                duration,
                now,
            )
            .with_client_tag(order.intent.client_tag.clone());

            let mut payload = OrderPayload::new(
                id.as_str(),
                order.intent.symbol.as_str(),
                order.intent.side,
                order.intent.size,
                order.intent.limit_price,
                order.intent.stop_price,
                duration,
            )
            .with_text(order.intent.client_tag);

            if let Err(e) = self.state.announce_and_register(record) {
                // Ids are unique per process, so this only happens on misuse.
                self.abandon(&ids);
                return Err(e.into());
            }
            if let Some((link_id, contingency)) = order.link {
                self.state.links.register_membership(&link_id, &id, contingency);
                payload = payload.with_link(link_id, contingency);
            }

            ids.push(id);
            payloads.push(payload);
        }

        let submission = self.state.pending.open(ids.clone(), now);
        self.state.metrics.inc_submissions();
        info!(submission = %submission, orders = ?ids, "submitting orders");

        let request = if is_bulk {
            Request::Bulk(payloads)
        } else {
            Request::from_items(payloads)
        };
        let result = self.gateway.submit(request).await;

        // Cleared whatever the outcome.
        let settled = self
            .state
            .pending
            .settle(submission)
            .map(|s| s.order_ids)
            .unwrap_or_default();

        match result {
            Ok(()) => Ok(ids),
            Err(e) => {
                warn!(submission = %submission, error = %e, "submission rejected");
                self.state.metrics.inc_submission_rejections();
                let reason = e.to_string();
                for id in &settled {
                    self.reject(id, &reason);
                }
                Err(e.into())
            }
        }
    }

    fn reject(&self, id: &str, reason: &str) {
        match self
            .state
            .apply(id, |record| record.set_status(OrderStatus::Rejected))
        {
            Applied::Updated(_) => {}
            Applied::Terminal => debug!(order_id = %id, "rejected order already terminal"),
            Applied::Unknown => warn!(order_id = %id, "rejected order not registered"),
        }
        self.state.links.remove_member(id);
        self.state.emit(AdapterEvent::order_failure(
            self.state.config.rejection_message(reason),
        ));
    }

    /// Reject orders registered before a submission failed to build.
    fn abandon(&self, ids: &[String]) {
        for id in ids {
            self.reject(id, "submission aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, Sent, SYMBOL};
    use connector_core::{GatewayError, TextCategory};
    use rust_decimal_macros::dec;

    fn submitted(harness: &Harness) -> Request<OrderPayload> {
        match harness.gateway.last() {
            Some(Sent::Submit(request)) => request,
            other => panic!("expected a submit, got {other:?}"),
        }
    }

    #[test]
    fn test_bracket_prices_buy() {
        let (sl, tp) = bracket_prices(OrderSide::Buy, dec!(100), 10, 20, dec!(0.5));
        assert_eq!(sl, dec!(95));
        assert_eq!(tp, dec!(110));
    }

    #[test]
    fn test_bracket_prices_sell() {
        let (sl, tp) = bracket_prices(OrderSide::Sell, dec!(100), 10, 20, dec!(0.5));
        assert_eq!(sl, dec!(105));
        assert_eq!(tp, dec!(90));
    }

    #[tokio::test]
    async fn test_submit_single_announces_before_sending() {
        let mut h = Harness::new();
        let intent = OrderIntent::limit(SYMBOL, OrderSide::Buy, dec!(100), dec!(50000))
            .with_client_tag("scalp");

        let ids = h.adapter.submit(SubmitIntent::Single(intent)).await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids[0].contains("-temp-"));

        let updates = h.order_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].order_id, ids[0]);
        assert_eq!(updates[0].status, OrderStatus::PendingSubmit);
        assert_eq!(updates[0].client_tag.as_deref(), Some("scalp"));

        let Request::Single(payload) = submitted(&h) else {
            panic!("single order must not be sent as bulk");
        };
        assert_eq!(payload.cl_ord_id, ids[0]);
        assert_eq!(payload.price, Some(dec!(50000)));
        assert_eq!(payload.time_in_force, "GoodTillCancel");
        assert_eq!(payload.text.as_deref(), Some("scalp"));
        assert!(payload.cl_ord_link_id.is_none());

        assert_eq!(h.adapter.pending_submissions(), 0);
        assert_eq!(h.adapter.metrics().submissions(), 1);
    }

    #[tokio::test]
    async fn test_submit_buy_bracket() {
        let h = Harness::new();
        let entry =
            OrderIntent::limit(SYMBOL, OrderSide::Buy, dec!(10), dec!(100)).with_bracket(20, 10);

        let ids = h.adapter.submit(SubmitIntent::Single(entry)).await.unwrap();
        assert_eq!(ids.len(), 3);

        let Request::Bulk(payloads) = submitted(&h) else {
            panic!("bracket must be sent as bulk");
        };
        assert_eq!(
            payloads[0].contingency_type,
            Some(ContingencyType::OneTriggersTheOther)
        );
        assert_eq!(payloads[0].side, OrderSide::Buy);

        let stop_loss = &payloads[1];
        assert_eq!(stop_loss.side, OrderSide::Sell);
        assert_eq!(stop_loss.stop_px, Some(dec!(95)));
        assert_eq!(stop_loss.price, None);
        assert_eq!(
            stop_loss.contingency_type,
            Some(ContingencyType::OneCancelsTheOther)
        );

        let take_profit = &payloads[2];
        assert_eq!(take_profit.side, OrderSide::Sell);
        assert_eq!(take_profit.price, Some(dec!(110)));
        assert_eq!(take_profit.order_qty, dec!(10));

        let link = payloads[0].cl_ord_link_id.clone().unwrap();
        assert!(link.contains("-LINKED-"));
        assert!(payloads
            .iter()
            .all(|p| p.cl_ord_link_id.as_deref() == Some(link.as_str())));

        // Parent sits at the back of its group.
        let group = h.adapter.link_group_of(&ids[0]).unwrap();
        assert_eq!(group.len(), 3);
        assert_eq!(group.last(), Some(&ids[0]));
    }

    #[tokio::test]
    async fn test_submit_sell_bracket() {
        let h = Harness::new();
        let entry =
            OrderIntent::limit(SYMBOL, OrderSide::Sell, dec!(10), dec!(100)).with_bracket(20, 10);

        h.adapter.submit(SubmitIntent::Single(entry)).await.unwrap();

        let Request::Bulk(payloads) = submitted(&h) else {
            panic!("bracket must be sent as bulk");
        };
        assert_eq!(payloads[1].side, OrderSide::Buy);
        assert_eq!(payloads[1].stop_px, Some(dec!(105)));
        assert_eq!(payloads[2].side, OrderSide::Buy);
        assert_eq!(payloads[2].price, Some(dec!(90)));
    }

    #[tokio::test]
    async fn test_one_offset_is_not_a_bracket() {
        let h = Harness::new();
        let intent =
            OrderIntent::limit(SYMBOL, OrderSide::Buy, dec!(10), dec!(100)).with_bracket(20, 0);

        let ids = h.adapter.submit(SubmitIntent::Single(intent)).await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(matches!(submitted(&h), Request::Single(_)));
    }

    #[tokio::test]
    async fn test_invalid_brackets_send_nothing() {
        let h = Harness::new();

        let no_price = OrderIntent::market(SYMBOL, OrderSide::Buy, dec!(10)).with_bracket(20, 10);
        let err = h
            .adapter
            .submit(SubmitIntent::Single(no_price))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidIntent(_)));

        let unknown = OrderIntent::limit("ETHUSD", OrderSide::Buy, dec!(10), dec!(100))
            .with_bracket(20, 10);
        let err = h
            .adapter
            .submit(SubmitIntent::Single(unknown))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnknownInstrument(symbol) if symbol == "ETHUSD"));

        let err = h.adapter.submit(SubmitIntent::Oco(vec![])).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidIntent(_)));

        assert!(h.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_oco_members_share_link() {
        let h = Harness::new();
        let orders = vec![
            OrderIntent::limit(SYMBOL, OrderSide::Sell, dec!(10), dec!(110)),
            OrderIntent::stop(SYMBOL, OrderSide::Sell, dec!(10), dec!(90)),
        ];

        let ids = h.adapter.submit(SubmitIntent::Oco(orders)).await.unwrap();

        let Request::Bulk(payloads) = submitted(&h) else {
            panic!("OCO must be sent as bulk");
        };
        assert_eq!(payloads.len(), 2);
        assert!(payloads
            .iter()
            .all(|p| p.contingency_type == Some(ContingencyType::OneCancelsTheOther)));
        assert_eq!(payloads[0].cl_ord_link_id, payloads[1].cl_ord_link_id);

        let group = h.adapter.link_group_of(&ids[0]).unwrap();
        assert!(group.contains(&ids[0]) && group.contains(&ids[1]));
    }

    #[tokio::test]
    async fn test_submission_rejection_rejects_every_order() {
        let mut h = Harness::new();
        h.gateway.fail_with(GatewayError::Rejected(
            "Account has insufficient Available Balance".into(),
        ));
        let orders = vec![
            OrderIntent::limit(SYMBOL, OrderSide::Sell, dec!(10), dec!(110)),
            OrderIntent::stop(SYMBOL, OrderSide::Sell, dec!(10), dec!(90)),
        ];

        let err = h.adapter.submit(SubmitIntent::Oco(orders)).await.unwrap_err();
        assert!(matches!(err, AdapterError::Gateway(GatewayError::Rejected(_))));

        let events = h.drain();
        let rejected: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AdapterEvent::OrderUpdated(s) if s.status == OrderStatus::Rejected => {
                    Some(s.order_id.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(rejected.len(), 2);

        let failures: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AdapterEvent::SystemText { message, category } => Some((message, *category)),
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|(message, category)| {
            *category == TextCategory::OrderFailure
                && message.as_str()
                    == "The order was rejected: \nAccount has insufficient Available Balance"
        }));

        for id in &rejected {
            assert_eq!(h.adapter.order(id).unwrap().status, OrderStatus::Rejected);
            assert!(h.adapter.link_group_of(id).is_none());
        }
        assert_eq!(h.adapter.pending_submissions(), 0);
        assert_eq!(h.adapter.metrics().submission_rejections(), 1);
    }
}
