use crate::config::EVENT_SHUFFLE_SEED;
use crate::error::{GulError, GulResult};
use crate::rng::Mt19937;
use crate::types::EventId;

/// An event assigned to this batch. `order` is its position within the
/// batch and only fixes output ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEvent {
    pub event_id: EventId,
    pub order: usize,
}

/// The `index`-th (1-based) of `count` event batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBatch {
    index: u32,
    count: u32,
}

impl EventBatch {
    pub fn new(index: u32, count: u32) -> GulResult<Self> {
        if index == 0 || index > count {
            return Err(GulError::InvalidBatch { index, count });
        }
        Ok(EventBatch { index, count })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Events of this batch.
    ///
    /// The full list is permuted with the fixed shuffle seed, then cut into
    /// `count` chunks of `ceil(N / count)` events. Every batch process
    /// computes the same permutation, so the chunks are disjoint and cover
    /// the full event set.
    pub fn select(&self, events: &[EventId]) -> Vec<BatchEvent> {
        let mut shuffled = events.to_vec();
        Mt19937::new(EVENT_SHUFFLE_SEED).shuffle(&mut shuffled);

        let chunk = shuffled.len().div_ceil(self.count as usize);
        let start = (chunk * (self.index as usize - 1)).min(shuffled.len());
        let end = (chunk * self.index as usize).min(shuffled.len());

        shuffled[start..end]
            .iter()
            .enumerate()
            .map(|(order, &event_id)| BatchEvent { event_id, order })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ids(range: std::ops::RangeInclusive<i32>) -> Vec<EventId> {
        range.map(EventId).collect()
    }

    fn event_ids(batch: &[BatchEvent]) -> Vec<i32> {
        batch.iter().map(|e| e.event_id.0).collect()
    }

    #[test]
    fn batch_beyond_count_is_rejected() {
        assert!(matches!(EventBatch::new(3, 2), Err(GulError::InvalidBatch { index: 3, count: 2 })));
        assert!(EventBatch::new(0, 2).is_err());
        assert!(EventBatch::new(2, 2).is_ok());
    }

    #[test]
    fn single_batch_is_the_fixed_permutation() {
        let events = ids(1..=10);
        let batch = EventBatch::new(1, 1).unwrap().select(&events);
        // Permutation of positions under seed 1234: [7, 2, 9, 1, 0, 8, 4, 5, 6, 3].
        assert_eq!(event_ids(&batch), vec![8, 3, 10, 2, 1, 9, 5, 6, 7, 4]);
        let orders: Vec<usize> = batch.iter().map(|e| e.order).collect();
        assert_eq!(orders, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn chunks_are_contiguous_slices_of_the_permutation() {
        let events = ids(1..=10);
        let first = EventBatch::new(1, 3).unwrap().select(&events);
        let last = EventBatch::new(3, 3).unwrap().select(&events);
        assert_eq!(event_ids(&first), vec![8, 3, 10, 2]);
        assert_eq!(event_ids(&last), vec![7, 4]);
        assert_eq!(last[0].order, 0);
    }

    #[test]
    fn batches_partition_the_event_set() {
        let events = ids(1..=97);
        let count = 7;
        let mut seen = HashSet::new();
        let mut total = 0;
        for index in 1..=count {
            let batch = EventBatch::new(index, count).unwrap().select(&events);
            total += batch.len();
            for e in batch {
                assert!(seen.insert(e.event_id), "event {:?} in two batches", e.event_id);
            }
        }
        assert_eq!(total, events.len());
    }

    #[test]
    fn batch_past_the_events_is_empty() {
        let events = ids(1..=4);
        assert!(EventBatch::new(5, 5).unwrap().select(&events).is_empty());
        assert_eq!(EventBatch::new(4, 5).unwrap().select(&events).len(), 1);
    }

    #[test]
    fn no_events_gives_an_empty_batch() {
        assert!(EventBatch::new(1, 3).unwrap().select(&[]).is_empty());
    }
}
