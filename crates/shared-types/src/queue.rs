//! The pending transaction queue shared between the RPC surface (producer)
//! and the block generator (consumer).
//!
//! Strict FIFO: transactions execute in insertion order within a height,
//! and a batch requeued after a lost race goes back to the front so the
//! original order is preserved.

use crate::transaction::TransactionData;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// FIFO queue of pending transaction records.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    inner: Mutex<VecDeque<TransactionData>>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly submitted transaction.
    pub fn push(&self, record: TransactionData) {
        self.inner.lock().push_back(record);
    }

    /// Take up to `max` records from the head (all of them when `None`).
    pub fn drain(&self, max: Option<usize>) -> Vec<TransactionData> {
        let mut queue = self.inner.lock();
        let count = match max {
            Some(max) => max.min(queue.len()),
            None => queue.len(),
        };
        queue.drain(..count).collect()
    }

    /// Put a batch back at the front, preserving its internal order.
    pub fn requeue_front(&self, batch: Vec<TransactionData>) {
        let mut queue = self.inner.lock();
        for record in batch.into_iter().rev() {
            queue.push_front(record);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
