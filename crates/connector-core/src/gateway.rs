//! The outbound half of the transport: synchronous order round-trips.

use async_trait::async_trait;

use crate::payload::{MovePayload, OrderPayload, ResizePayload};
use crate::GatewayError;

/// One item or a bulk of items sent in a single request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request<T> {
    Single(T),
    Bulk(Vec<T>),
}

impl<T> Request<T> {
    /// `Single` for one item, `Bulk` otherwise.
    pub fn from_items(mut items: Vec<T>) -> Self {
        if items.len() == 1 {
            if let Some(item) = items.pop() {
                return Self::Single(item);
            }
        }
        Self::Bulk(items)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Bulk(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::Bulk(_))
    }

    pub fn items(&self) -> &[T] {
        match self {
            Self::Single(item) => std::slice::from_ref(item),
            Self::Bulk(items) => items,
        }
    }
}

/// Order-entry side of the exchange connection.
///
/// Every call is one request/response round-trip. `Err` carries the
/// exchange's error text (or a transport failure); `Ok` only means the
/// request was accepted, the resulting state arrives as execution reports.
/// Implementations do not retry.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Place new orders.
    async fn submit(&self, request: Request<OrderPayload>) -> Result<(), GatewayError>;

    /// Cancel orders by exchange id.
    async fn cancel(&self, request: Request<String>) -> Result<(), GatewayError>;

    /// Change order quantities.
    async fn resize(&self, request: Request<ResizePayload>) -> Result<(), GatewayError>;

    /// Change order prices or trailing distances.
    async fn amend(&self, request: Request<MovePayload>) -> Result<(), GatewayError>;

    /// Stop the realtime feed. Working orders are left alone.
    async fn shutdown(&self);
}
