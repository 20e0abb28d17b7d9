//! BitMEX order-state adapter.
//!
//! Keeps the local view of orders, link groups, trailing stops and balances
//! consistent with what the exchange reports, and turns front-end intents
//! into exchange requests:
//!
//! - [`OrderSubmissionComposer`] builds single, OCO and bracket submissions
//! - [`OrderDispatcher`] fans cancel, resize and move out across link groups
//! - [`ExecutionReportProcessor`] drives the order state machine
//! - [`AccountHandler`] merges balances and positions
//! - [`BitmexAdapter`] ties them together behind one facade

mod account;
mod composer;
mod config;
mod dispatch;
mod error;
mod intent;
mod processor;
mod provider;
mod pump;
mod state;

#[cfg(test)]
mod testing;

pub use account::{rate_limit_message, AccountHandler};
pub use composer::{bracket_prices, ComposedOrder, OrderSubmissionComposer};
pub use config::{AdapterConfig, DEFAULT_REJECTION_PREFIX};
pub use dispatch::OrderDispatcher;
pub use error::AdapterError;
pub use intent::{CancelIntent, MoveIntent, OrderIntent, ResizeIntent, SubmitIntent};
pub use processor::ExecutionReportProcessor;
pub use provider::{BitmexAdapter, SupportedFeatures};
pub use pump::{run_report_pump, TransportRouter};
