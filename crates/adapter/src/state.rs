//! Shared state behind every adapter component.

use std::sync::Arc;

use common::SharedClock;
use connector_core::{AdapterEvent, EventSink, TextCategory};
use dashmap::DashMap;
use execution_core::{
    create_instrument_book, create_order_registry, BalanceAggregator, BatchCancelAccumulator,
    LinkInfo, LinkageIndex, OrderRecord, OrderSnapshot, OrderStatus, PendingSubmissionTracker,
    RegistryError, SequenceGenerator, SharedInstrumentBook, SharedOrderRegistry,
    TrailingStopRegistry,
};
use metrics::{create_metrics, SharedMetrics};
use parking_lot::RwLock;
use tracing::debug;

use crate::config::AdapterConfig;

/// Result of applying a mutation to a registered order.
#[derive(Debug)]
pub(crate) enum Applied {
    /// The record changed and was published.
    Updated(OrderSnapshot),
    /// The record is terminal; nothing was touched.
    Terminal,
    /// No record under that id.
    Unknown,
}

/// An order id followed to its current name, with its link group read at
/// the same moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub id: String,
    /// Every member of the link group, the order included.
    pub members: Option<Vec<String>>,
    pub is_parent: bool,
}

/// Registries, counters and the event sink shared by the intent path and the
/// report path.
pub(crate) struct AdapterState {
    pub config: AdapterConfig,
    pub orders: SharedOrderRegistry,
    pub links: LinkageIndex,
    pub trailing: TrailingStopRegistry,
    pub batch: BatchCancelAccumulator,
    pub pending: PendingSubmissionTracker,
    /// Status each order had before its resize went out.
    pub modifying: DashMap<String, OrderStatus>,
    pub sequence: SequenceGenerator,
    pub balances: BalanceAggregator,
    pub instruments: SharedInstrumentBook,
    pub metrics: SharedMetrics,
    /// Held for writing while an order changes id, so the registry and the
    /// link index are never seen under different names.
    identities: RwLock<()>,
    sink: Arc<dyn EventSink>,
}

impl AdapterState {
    pub fn new(config: AdapterConfig, sink: Arc<dyn EventSink>, clock: SharedClock) -> Self {
        Self {
            config,
            orders: create_order_registry(),
            links: LinkageIndex::new(),
            trailing: TrailingStopRegistry::new(),
            batch: BatchCancelAccumulator::new(),
            pending: PendingSubmissionTracker::new(),
            modifying: DashMap::new(),
            sequence: SequenceGenerator::new(clock),
            balances: BalanceAggregator::new(),
            instruments: create_instrument_book(),
            metrics: create_metrics(),
            identities: RwLock::new(()),
            sink,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.sequence.now_ms()
    }

    pub fn emit(&self, event: AdapterEvent) {
        self.sink.publish(event);
    }

    pub fn emit_text(&self, message: impl Into<String>, category: TextCategory) {
        self.emit(AdapterEvent::text(message, category));
    }

    /// Give an order its exchange id everywhere it is tracked.
    ///
    /// An order the link index does not know yet joins `link` under the new
    /// id.
    pub fn rename_order(
        &self,
        from: &str,
        to: &str,
        link: Option<&LinkInfo>,
    ) -> Result<(), RegistryError> {
        let _guard = self.identities.write();
        self.orders.rename(from, to)?;
        if !self.links.rename_member(from, to) {
            if let Some(link) = link {
                self.links
                    .register_membership(&link.link_id, to, link.contingency);
            }
        }
        if from != to {
            if let Some((_, prior)) = self.modifying.remove(from) {
                self.modifying.insert(to.to_string(), prior);
            }
        }
        Ok(())
    }

    /// Current id of an order together with its link group.
    pub fn resolve_linked(&self, id: &str) -> Resolved {
        let _guard = self.identities.read();
        let id = self.orders.current_id(id).unwrap_or_else(|| id.to_string());
        Resolved {
            members: self.links.members_of(&id),
            is_parent: self.links.is_parent(&id),
            id,
        }
    }

    /// Publish a freshly built record, then register it.
    ///
    /// The front-end always hears about an id before any report can
    /// reference it.
    pub fn announce_and_register(&self, mut record: OrderRecord) -> Result<(), RegistryError> {
        let snapshot = record.publish(self.now_ms());
        self.emit(AdapterEvent::OrderUpdated(snapshot));
        self.orders.register(record)
    }

    /// Mutate a live record and publish the result.
    ///
    /// Terminal records are left alone. The lock is released before the
    /// snapshot goes out.
    pub fn apply(&self, id: &str, f: impl FnOnce(&mut OrderRecord)) -> Applied {
        let now = self.now_ms();
        let outcome = self.orders.update(id, |record| {
            if record.is_terminal() {
                return Applied::Terminal;
            }
            f(record);
            Applied::Updated(record.publish(now))
        });

        match outcome {
            Some(Applied::Updated(snapshot)) => {
                self.emit(AdapterEvent::OrderUpdated(snapshot.clone()));
                self.settle_terminal(&snapshot);
                Applied::Updated(snapshot)
            }
            Some(other) => other,
            None => Applied::Unknown,
        }
    }

    /// Drop bookkeeping for an order that just reached a terminal status.
    ///
    /// Filled and cancelled records leave the registry; rejected ones stay
    /// (frozen) so late reports still resolve.
    fn settle_terminal(&self, snapshot: &OrderSnapshot) {
        if !snapshot.status.is_terminal() {
            return;
        }
        let id = snapshot.order_id.as_str();
        if snapshot.status.is_final() {
            self.orders.remove(id);
        }
        self.trailing.remove(id);
        self.modifying.remove(id);
        if self.links.retire_member(id) {
            debug!(order_id = %id, "last member of link group finished");
        }
    }
}
