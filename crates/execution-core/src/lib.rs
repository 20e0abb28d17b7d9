//! Order-state core of the BitMEX adapter.
//!
//! This crate holds the shared state that both the intent path (submit,
//! cancel, resize, move) and the report path (execution reports, wallet,
//! margin and position updates) work on:
//!
//! - **Order model**: `OrderRecord`, `OrderSnapshot`, `OrderStatus`, `OrderKind`
//! - **Execution reports**: `ExecutionReport` with an exhaustive `ExecutionKind`
//! - **Registries**: `OrderRegistry` (atomic rename), `LinkageIndex` (OCO and
//!   bracket groups), `TrailingStopRegistry`, `BatchCancelAccumulator`
//! - **Correlation**: `SequenceGenerator` for temporary/link ids and
//!   `PendingSubmissionTracker` for in-flight submissions
//! - **Account state**: `BalanceAggregator`, `InstrumentBook` with live positions
//!
//! # Order Lifecycle
//!
//! 1. The composer generates `{ms}-temp-{n}` ids and registers the records
//!    in `PendingSubmit`
//! 2. The request is sent; an error rejects the whole submission
//! 3. A `New` report renames the record to the exchange id (`Working` or
//!    `Suspended`)
//! 4. Replace/restate/trade/trigger reports update it in place
//! 5. `Filled` and `Cancelled` records leave the registry
//!
//! Every registry locks internally and hands out owned values only, so no
//! lock is ever held across an outbound call.

mod balance;
mod batch;
mod correlation;
mod error;
mod execution;
mod instrument;
mod linkage;
mod order;
mod position;
mod registry;
mod trailing;

pub use balance::{BalanceAggregator, BalanceSnapshot, BalanceUpdate, MarginUpdate, WalletUpdate};
pub use batch::BatchCancelAccumulator;
pub use correlation::{
    PendingSubmission, PendingSubmissionTracker, SequenceGenerator, SubmissionId,
};
pub use error::{LinkageError, RegistryError};
pub use execution::{
    Amendment, ContingencyType, ExecutionInfo, ExecutionKind, ExecutionReport,
    HistoricalExecution, LinkInfo, OpenOrder, ReportedOrderStatus, TradeFill, TriggerState,
};
pub use instrument::{
    create_instrument_book, Instrument, InstrumentBook, InstrumentSpec, SharedInstrumentBook,
};
pub use linkage::{LinkageIndex, BRACKET_CHILDREN};
pub use order::{
    OrderDuration, OrderField, OrderKind, OrderRecord, OrderSide, OrderSnapshot, OrderStatus,
};
pub use position::{PositionSnapshot, PositionUpdate, StatusInfo};
pub use registry::{create_order_registry, OrderRegistry, SharedOrderRegistry};
pub use trailing::TrailingStopRegistry;
