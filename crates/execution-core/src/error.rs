//! Order-state error types.

use thiserror::Error;

/// Errors raised by the order registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No record under this identifier.
    #[error("unknown order: {0}")]
    UnknownOrder(String),

    /// A record already uses this identifier.
    #[error("order id already registered: {0}")]
    DuplicateOrder(String),
}

/// Errors raised by the link-group index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkageError {
    /// The order is not a member of any link group.
    #[error("order {0} is not part of a link group")]
    NotLinked(String),

    /// The group does not have the arity the operation requires.
    #[error("link group {link_id} is malformed: expected {expected} siblings of {order_id}, found {found}")]
    MalformedGroup {
        link_id: String,
        order_id: String,
        expected: usize,
        found: usize,
    },
}
