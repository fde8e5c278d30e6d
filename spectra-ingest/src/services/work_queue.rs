//! One-shot work dispatcher shared by ingest workers

use std::sync::{Mutex, PoisonError};

/// Pull-based cursor over a fixed list of items
///
/// Each item is handed out exactly once across all callers. Once exhausted the
/// queue stays exhausted; there is no refill and `next` never blocks.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Vec<T>,
    cursor: Mutex<usize>,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: Mutex::new(0),
        }
    }

    /// Claim the next item, or `None` once every item has been handed out
    pub fn next(&self) -> Option<&T> {
        // The cursor is a plain index; a panic while holding it cannot corrupt it
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);

        let item = self.items.get(*cursor)?;
        *cursor += 1;
        Some(item)
    }

    /// Total number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items not yet handed out
    pub fn remaining(&self) -> usize {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        self.items.len() - *cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_items_in_order_then_exhausted() {
        let queue = WorkQueue::new(vec!["a", "b", "c"]);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.next(), Some(&"a"));
        assert_eq!(queue.remaining(), 2);
        assert_eq!(queue.next(), Some(&"b"));
        assert_eq!(queue.next(), Some(&"c"));
        assert_eq!(queue.next(), None);
        assert_eq!(queue.next(), None);
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn test_empty_queue() {
        let queue: WorkQueue<u32> = WorkQueue::new(Vec::new());
        assert!(queue.is_empty());
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn test_each_item_claimed_once_across_threads() {
        let queue = Arc::new(WorkQueue::new((0..10_000).collect::<Vec<u32>>()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(item) = queue.next() {
                        claimed.push(*item);
                    }
                    claimed
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for item in handle.join().unwrap() {
                assert!(seen.insert(item), "item {} handed out twice", item);
                total += 1;
            }
        }

        assert_eq!(total, 10_000);
        assert_eq!(queue.remaining(), 0);
    }
}
