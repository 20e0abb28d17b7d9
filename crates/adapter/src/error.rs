//! Adapter error types.

use connector_core::GatewayError;
use execution_core::{LinkageError, RegistryError};
use thiserror::Error;

/// Errors returned by the intent operations (submit, cancel, resize, move).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The exchange or the transport refused the request.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Order registry inconsistency.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Link group inconsistency. Always a bug or corrupted exchange data.
    #[error("linkage error: {0}")]
    Linkage(#[from] LinkageError),

    /// The intent names an order the adapter does not know.
    #[error("unknown order: {0}")]
    UnknownOrder(String),

    /// No instrument parameters for this symbol.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The intent cannot be turned into a valid request.
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    /// Trading is disabled for this session (no credentials).
    #[error("trading is disabled")]
    TradingDisabled,
}
