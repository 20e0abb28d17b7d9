//! Correlation between a submit call and the orders it created.
//!
//! When submitting:
//! 1. Generate a temporary id per order (and a link id for OCO/bracket)
//! 2. Register the records and open a pending submission for their ids
//! 3. Send the request
//! 4. Settle the submission when the round-trip returns:
//!    a. success -> the records stay and wait for their `New` reports
//!    b. error   -> every record of that submission is rejected
//!
//! Each submit call gets its own [`SubmissionId`], so concurrent submissions
//! never share a pending set.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use common::SharedClock;
use dashmap::DashMap;
use tracing::warn;

/// Generator for temporary order ids and link ids.
///
/// Ids combine the wall-clock time with a per-process counter, so they are
/// unique within the process even when the clock stands still.
pub struct SequenceGenerator {
    clock: SharedClock,
    order_seq: AtomicU64,
    link_seq: AtomicU64,
}

impl SequenceGenerator {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            order_seq: AtomicU64::new(0),
            link_seq: AtomicU64::new(0),
        }
    }

    /// Format: `{epoch_ms}-temp-{n}`.
    pub fn next_order_id(&self) -> String {
        let n = self.order_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-temp-{}", self.clock.now_ms(), n)
    }

    /// Format: `{epoch_ms}-LINKED-{n}`.
    pub fn next_link_id(&self) -> String {
        let n = self.link_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-LINKED-{}", self.clock.now_ms(), n)
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

impl fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGenerator")
            .field("order_seq", &self.order_seq)
            .field("link_seq", &self.link_seq)
            .finish()
    }
}

/// Identifies one in-flight submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Orders created by one submit call.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub id: SubmissionId,
    /// Temporary ids of the orders, in submission order.
    pub order_ids: Vec<String>,
    pub created_at_ms: i64,
}

/// Thread-safe tracker of in-flight submissions.
#[derive(Debug, Default)]
pub struct PendingSubmissionTracker {
    next_id: AtomicU64,
    pending: DashMap<SubmissionId, PendingSubmission>,
}

impl PendingSubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a submission for freshly registered orders.
    ///
    /// Must be called before the request is sent.
    pub fn open(&self, order_ids: Vec<String>, created_at_ms: i64) -> SubmissionId {
        let id = SubmissionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pending.insert(
            id,
            PendingSubmission {
                id,
                order_ids,
                created_at_ms,
            },
        );
        id
    }

    /// Close a submission once its round-trip is over, returning its orders.
    pub fn settle(&self, id: SubmissionId) -> Option<PendingSubmission> {
        let settled = self.pending.remove(&id).map(|(_, submission)| submission);
        if settled.is_none() {
            warn!(submission = %id, "settling unknown submission");
        }
        settled
    }

    /// Number of in-flight submissions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
