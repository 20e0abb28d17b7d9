//! Cancel, resize and move of working orders.
//!
//! Every operation consults the link index first and fans out to the
//! whole group when the target is linked. Fan-outs are sent as a single
//! bulk request.

use std::sync::Arc;

use connector_core::{
    AdapterEvent, ExchangeGateway, GatewayError, MovePayload, Request, ResizePayload,
};
use execution_core::{OrderRecord, OrderStatus};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::error::AdapterError;
use crate::intent::{CancelIntent, MoveIntent, ResizeIntent};
use crate::state::{AdapterState, Resolved};

pub struct OrderDispatcher {
    state: Arc<AdapterState>,
    gateway: Arc<dyn ExchangeGateway>,
}

impl OrderDispatcher {
    pub(crate) fn new(state: Arc<AdapterState>, gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { state, gateway }
    }

    /// Cancel an order, its link group, or a buffered batch.
    ///
    /// The batch buffer is empty after a batch end whatever the outcome.
    pub async fn cancel(&self, intent: CancelIntent) -> Result<(), AdapterError> {
        let Resolved { id, members, .. } = self.state.resolve_linked(&intent.order_id);

        if !intent.batch_end {
            debug!(order_id = %id, "buffering cancel");
            self.state.batch.push(&id);
            return Ok(());
        }

        let request = match self.state.batch.close(&id) {
            Some(ids) => {
                info!(count = ids.len(), "sending batched cancel");
                self.state.metrics.inc_bulk_cancels();
                Request::Bulk(ids)
            }
            None => match members {
                Some(members) => {
                    info!(order_id = %id, count = members.len(), "cancelling link group");
                    self.state.metrics.inc_bulk_cancels();
                    Request::Bulk(members)
                }
                None => Request::Single(id),
            },
        };

        self.gateway.cancel(request).await.map_err(|e| {
            warn!(error = %e, "cancel failed");
            self.report_failure(&e);
            AdapterError::from(e)
        })
    }

    /// Resize an order, or every member of its link group.
    ///
    /// Affected records go to `PendingModify` before the request leaves and
    /// return to their prior status if the exchange refuses.
    pub async fn resize(&self, intent: ResizeIntent) -> Result<(), AdapterError> {
        let Resolved { id, members, .. } = self.state.resolve_linked(&intent.order_id);
        if !self.state.orders.contains(&id) {
            return Err(AdapterError::UnknownOrder(intent.order_id));
        }

        let linked = members.is_some();
        let targets: Vec<String> = match members {
            Some(members) => members
                .into_iter()
                .filter(|member| self.state.orders.contains(member))
                .collect(),
            None => vec![id.clone()],
        };

        let now = self.state.now_ms();
        let marked = self.state.orders.update_many(&targets, |record| {
            if record.is_terminal() {
                return None;
            }
            self.state
                .modifying
                .insert(record.order_id().to_string(), record.status());
            record.set_status(OrderStatus::PendingModify);
            Some(record.publish(now))
        })?;

        let mut resized = Vec::with_capacity(marked.len());
        for snapshot in marked.into_iter().flatten() {
            resized.push(snapshot.order_id.clone());
            self.state.emit(AdapterEvent::OrderUpdated(snapshot));
        }
        if resized.is_empty() {
            return Err(AdapterError::InvalidIntent(format!(
                "order {id} is no longer working"
            )));
        }

        let payloads: Vec<ResizePayload> = resized
            .iter()
            .map(|order_id| ResizePayload {
                order_id: order_id.clone(),
                order_qty: intent.size,
            })
            .collect();
        let request = if linked {
            Request::Bulk(payloads)
        } else {
            Request::from_items(payloads)
        };

        if let Err(e) = self.gateway.resize(request).await {
            warn!(order_id = %id, error = %e, "resize rejected, rolling back");
            self.state.metrics.inc_modification_rejections();
            for order_id in &resized {
                self.state.apply(order_id, |record| {
                    if let Some((_, prior)) = self.state.modifying.remove(record.order_id()) {
                        if record.status() == OrderStatus::PendingModify {
                            record.set_status(prior);
                        }
                    }
                });
            }
            self.report_failure(&e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Move the limit and/or stop price of an order.
    ///
    /// Moving a bracket entry shifts both contingents by the same amount.
    pub async fn move_order(&self, intent: MoveIntent) -> Result<(), AdapterError> {
        let resolved = self.state.resolve_linked(&intent.order_id);
        let id = resolved.id;
        let record = self
            .state
            .orders
            .get(&id)
            .ok_or_else(|| AdapterError::UnknownOrder(intent.order_id.clone()))?;

        let request = if resolved.is_parent {
            self.bracket_move(&record, &intent)?
        } else if let Some(offset) = self.trailing_offset(&record, &intent) {
            debug!(order_id = %id, offset = %offset, "moving trailing stop");
            Request::Single(MovePayload::trailing(id.as_str(), offset))
        } else {
            Request::Single(MovePayload::prices(
                id.as_str(),
                intent.limit_price,
                intent.stop_price,
                record.is_stop_triggered(),
            ))
        };

        self.gateway.amend(request).await.map_err(|e| {
            warn!(order_id = %id, error = %e, "move rejected");
            self.state.metrics.inc_modification_rejections();
            self.report_failure(&e);
            AdapterError::from(e)
        })
    }

    fn bracket_move(
        &self,
        parent: &OrderRecord,
        intent: &MoveIntent,
    ) -> Result<Request<MovePayload>, AdapterError> {
        let parent_id = parent.order_id();
        let children = self.state.links.bracket_children(parent_id).map_err(|e| {
            error!(order_id = %parent_id, error = %e, "cannot move bracket");
            AdapterError::from(e)
        })?;

        let delta = price_delta(parent, intent)?;
        debug!(order_id = %parent_id, delta = %delta, "moving bracket");

        let mut payloads = Vec::with_capacity(3);
        payloads.push(MovePayload::prices(
            parent_id,
            intent.limit_price,
            intent.stop_price,
            parent.is_stop_triggered(),
        ));
        for child_id in &children {
            let child = self
                .state
                .orders
                .get(child_id)
                .ok_or_else(|| AdapterError::UnknownOrder(child_id.clone()))?;
            payloads.push(MovePayload::prices(
                child_id.as_str(),
                child.limit_price().map(|p| p + delta),
                child.stop_price().map(|p| p + delta),
                child.is_stop_triggered(),
            ));
        }
        Ok(Request::Bulk(payloads))
    }

    /// New trailing distance when the order is a registered trailing stop.
    ///
    /// The requested stop price is turned into a change of the offset.
    fn trailing_offset(&self, record: &OrderRecord, intent: &MoveIntent) -> Option<Decimal> {
        if !self.state.config.trailing_stops {
            return None;
        }
        let offset = self.state.trailing.offset(record.order_id())?;
        let step = match (intent.stop_price, record.stop_price()) {
            (Some(requested), Some(current)) => requested - current,
            _ => Decimal::ZERO,
        };
        Some(offset + step)
    }

    fn report_failure(&self, error: &GatewayError) {
        self.state.emit(AdapterEvent::order_failure(error.to_string()));
    }
}

/// Sum of the requested changes over the specified price fields.
fn price_delta(record: &OrderRecord, intent: &MoveIntent) -> Result<Decimal, AdapterError> {
    let mut delta = Decimal::ZERO;
    if let Some(requested) = intent.limit_price {
        let current = record.limit_price().ok_or_else(|| {
            AdapterError::InvalidIntent(format!("order {} has no limit price", record.order_id()))
        })?;
        delta += requested - current;
    }
    if let Some(requested) = intent.stop_price {
        let current = record.stop_price().ok_or_else(|| {
            AdapterError::InvalidIntent(format!("order {} has no stop price", record.order_id()))
        })?;
        delta += requested - current;
    }
    Ok(delta)
}
