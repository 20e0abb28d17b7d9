//! Execution report state machine.
//!
//! Reports arrive asynchronously and not strictly in order. Unknown ids are
//! logged and skipped; terminal orders are never touched again.

use std::sync::Arc;

use connector_core::AdapterEvent;
use execution_core::{
    Amendment, ExecutionInfo, ExecutionKind, ExecutionReport, LinkInfo, OrderRecord,
    OrderStatus, ReportedOrderStatus, TradeFill, TriggerState,
};
use rust_decimal::Decimal;
use tracing::{debug, error, trace, warn};

use crate::state::{AdapterState, Applied};

pub struct ExecutionReportProcessor {
    state: Arc<AdapterState>,
}

impl ExecutionReportProcessor {
    pub(crate) fn new(state: Arc<AdapterState>) -> Self {
        Self { state }
    }

    /// Apply one execution report.
    pub fn process(&self, report: ExecutionReport) {
        self.state.metrics.inc_reports_processed();
        trace!(
            order_id = %report.order_id,
            client_order_id = %report.client_order_id,
            kind = report.kind.name(),
            "execution report"
        );

        match &report.kind {
            ExecutionKind::New {
                link,
                trailing_offset,
                triggered,
            } => self.on_new(&report, link.as_ref(), *trailing_offset, *triggered),
            ExecutionKind::Replaced(amendment) | ExecutionKind::Restated(amendment) => {
                self.on_amendment(&report, amendment)
            }
            ExecutionKind::Trade(fill) => self.on_trade(&report, fill),
            ExecutionKind::Canceled { reason } => {
                if let Some(reason) = reason {
                    debug!(order_id = %report.order_id, reason = %reason, "order cancelled");
                }
                self.transition(&report, |record| record.set_status(OrderStatus::Cancelled));
            }
            ExecutionKind::TriggeredOrActivatedBySystem { triggered } => {
                self.on_triggered(&report, *triggered)
            }
            ExecutionKind::Rejected { reason } => self.on_rejected(&report, reason),
        }
    }

    /// Current registry id for a report: the exchange id first, then the
    /// client id it was submitted with.
    fn locate(&self, report: &ExecutionReport) -> Option<String> {
        self.state
            .orders
            .current_id(&report.order_id)
            .or_else(|| self.state.orders.current_id(&report.client_order_id))
    }

    fn unknown(&self, report: &ExecutionReport) {
        self.state.metrics.inc_unknown_order_reports();
        warn!(
            order_id = %report.order_id,
            client_order_id = %report.client_order_id,
            kind = report.kind.name(),
            "report for unknown order ignored"
        );
    }

    /// Apply `f` to the reported order and log what happened.
    fn transition(&self, report: &ExecutionReport, f: impl FnOnce(&mut OrderRecord)) -> Applied {
        let Some(id) = self.locate(report) else {
            self.unknown(report);
            return Applied::Unknown;
        };
        let applied = self.state.apply(&id, f);
        match &applied {
            Applied::Updated(snapshot) => debug!(
                order_id = %snapshot.order_id,
                status = ?snapshot.status,
                kind = report.kind.name(),
                "order updated"
            ),
            Applied::Terminal => debug!(
                order_id = %id,
                kind = report.kind.name(),
                "report for terminal order ignored"
            ),
            Applied::Unknown => self.unknown(report),
        }
        applied
    }

    fn on_new(
        &self,
        report: &ExecutionReport,
        link: Option<&LinkInfo>,
        trailing_offset: Option<Decimal>,
        triggered: TriggerState,
    ) {
        let Some(current) = self.locate(report) else {
            self.unknown(report);
            return;
        };
        if self
            .state
            .orders
            .get(&current)
            .is_some_and(|record| record.is_terminal())
        {
            debug!(order_id = %current, "acknowledgement for terminal order ignored");
            return;
        }
        let real = report.order_id.as_str();

        if let Err(e) = self.state.rename_order(&current, real, link) {
            error!(from = %current, to = %real, error = %e, "order rename failed");
            return;
        }
        if let Some(offset) = trailing_offset {
            self.state.trailing.register(real, offset);
        }

        let status = if triggered == TriggerState::NotTriggered {
            OrderStatus::Suspended
        } else {
            OrderStatus::Working
        };
        self.transition(report, |record| record.set_status(status));
    }

    /// A replace also settles a resize in flight: the order gets back the
    /// status it had before.
    fn on_amendment(&self, report: &ExecutionReport, amendment: &Amendment) {
        self.transition(report, |record| {
            record.apply_amendment(
                amendment.leaves_qty,
                amendment.order_qty,
                amendment.price,
                amendment.stop_price,
            );
            if let Some((_, prior)) = self.state.modifying.remove(record.order_id()) {
                if record.status() == OrderStatus::PendingModify {
                    record.set_status(prior);
                }
            }
        });
    }

    /// The execution event goes out before the order update it caused.
    fn on_trade(&self, report: &ExecutionReport, fill: &TradeFill) {
        let Some(id) = self.locate(report) else {
            self.unknown(report);
            return;
        };
        match self.state.orders.get(&id) {
            Some(record) if record.is_terminal() => {
                debug!(
                    order_id = %id,
                    exec_id = %fill.exec_id,
                    "fill for terminal order ignored"
                );
                return;
            }
            Some(_) => {}
            None => {
                self.unknown(report);
                return;
            }
        }

        if report.has_fill() {
            self.state.emit(AdapterEvent::OrderExecuted(ExecutionInfo {
                order_id: id.clone(),
                quantity: fill.last_qty,
                price: fill.last_price,
                exec_id: fill.exec_id.clone(),
                timestamp_ms: report.event_time_ms,
            }));
            if self
                .state
                .instruments
                .add_executed_volume(&report.symbol, fill.last_qty)
                .is_none()
            {
                warn!(symbol = %report.symbol, "fill for unknown instrument");
            }
        }

        self.transition(report, |record| {
            record.apply_fill(fill.cum_qty, fill.leaves_qty, fill.avg_price);
            if fill.order_status == ReportedOrderStatus::Filled {
                record.set_status(OrderStatus::Filled);
            }
        });
    }

    fn on_triggered(&self, report: &ExecutionReport, triggered: TriggerState) {
        match triggered {
            TriggerState::StopOrderTriggered => {
                self.transition(report, |record| record.set_stop_triggered(true));
            }
            TriggerState::Triggered => {
                self.transition(report, |record| match record.status() {
                    OrderStatus::Suspended => record.set_status(OrderStatus::Working),
                    // The resize settles on the triggered status.
                    OrderStatus::PendingModify => {
                        self.state
                            .modifying
                            .insert(record.order_id().to_string(), OrderStatus::Working);
                    }
                    _ => {}
                });
            }
            TriggerState::None | TriggerState::NotTriggered => {
                debug!(order_id = %report.order_id, ?triggered, "trigger report without effect");
            }
        }
    }

    fn on_rejected(&self, report: &ExecutionReport, reason: &str) {
        self.transition(report, |record| record.set_status(OrderStatus::Rejected));
        self.state.emit(AdapterEvent::order_failure(
            self.state.config.rejection_message(reason),
        ));
    }
}
