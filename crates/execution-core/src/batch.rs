//! Accumulator for cancel requests arriving ahead of a batch-end marker.

use parking_lot::Mutex;

/// Ordered buffer of order ids waiting for a shared bulk cancel.
#[derive(Debug, Default)]
pub struct BatchCancelAccumulator {
    buffer: Mutex<Vec<String>>,
}

impl BatchCancelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a cancel that is not the end of its batch.
    pub fn push(&self, order_id: &str) {
        self.buffer.lock().push(order_id.to_string());
    }

    /// Close the batch with `order_id`.
    ///
    /// Returns `None` when nothing was buffered (a standalone cancel).
    /// Otherwise returns the whole batch including `order_id` and leaves the
    /// buffer empty, whatever happens to the submission afterwards.
    pub fn close(&self, order_id: &str) -> Option<Vec<String>> {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return None;
        }
        buffer.push(order_id.to_string());
        Some(std::mem::take(&mut *buffer))
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_cancel() {
        let batch = BatchCancelAccumulator::new();
        assert_eq!(batch.close("a"), None);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_batch_flush() {
        let batch = BatchCancelAccumulator::new();
        batch.push("a");
        batch.push("b");
        assert_eq!(batch.len(), 2);

        let flushed = batch.close("c").unwrap();
        assert_eq!(flushed, vec!["a", "b", "c"]);
        assert!(batch.is_empty());

        // Next batch starts clean.
        assert_eq!(batch.close("d"), None);
    }
}
