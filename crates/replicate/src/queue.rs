//! Ordered change queue with last-value collapsing.

use hashbrown::{HashMap, HashSet};
use ripple_core::ColumnId;
use ripple_storage::RemoteRowId;

use crate::change::Change;

/// Accumulates changes between flushes.
///
/// For columns in last-value mode, a queued update to the same
/// `(row, column)` is overwritten in place with the newer value, keeping its
/// original queue position. `Add` and `Delete` are never collapsed and end
/// the collapse window of their row.
///
/// The queue is unbounded; a producer that outpaces its flush interval keeps
/// growing it.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    changes: Vec<Change>,
    last_value: HashSet<ColumnId>,
    positions: HashMap<RemoteRowId, HashMap<ColumnId, usize>>,
}

impl ChangeQueue {
    pub fn new<I, S>(last_value_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            changes: Vec::new(),
            last_value: last_value_columns
                .into_iter()
                .map(|c| ColumnId::from(c.as_ref()))
                .collect(),
            positions: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns true if updates of `column` collapse to their last value.
    pub fn is_last_value(&self, column: &str) -> bool {
        self.last_value.contains(column)
    }

    pub fn push(&mut self, change: Change) {
        match change {
            Change::Update { row, column, value } if self.last_value.contains(&column) => {
                let slots = self.positions.entry(row).or_default();
                if let Some(&pos) = slots.get(&column) {
                    if let Some(Change::Update { value: queued, .. }) = self.changes.get_mut(pos) {
                        *queued = value;
                        return;
                    }
                }
                slots.insert(column.clone(), self.changes.len());
                self.changes.push(Change::Update { row, column, value });
            }
            Change::Add { row } | Change::Delete { row } => {
                self.positions.remove(&row);
                self.changes.push(change);
            }
            other => self.changes.push(other),
        }
    }

    /// Removes and returns everything queued, in order.
    pub fn drain(&mut self) -> Vec<Change> {
        self.positions.clear();
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::Value;

    fn update(row: RemoteRowId, column: &str, value: i32) -> Change {
        Change::Update {
            row,
            column: column.into(),
            value: Value::Int32(value),
        }
    }

    #[test]
    fn test_collapses_to_last_value() {
        let mut queue = ChangeQueue::new(["px"]);
        queue.push(Change::Add { row: 0 });
        for v in 0..50 {
            queue.push(update(0, "px", v));
        }
        assert!(queue.is_last_value("px"));
        assert_eq!(queue.drain(), [Change::Add { row: 0 }, update(0, "px", 49)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_other_columns_keep_every_update() {
        let mut queue = ChangeQueue::new(["px"]);
        queue.push(update(0, "qty", 1));
        queue.push(update(0, "px", 1));
        queue.push(update(0, "qty", 2));
        queue.push(update(0, "px", 2));
        assert_eq!(
            queue.drain(),
            [update(0, "qty", 1), update(0, "px", 2), update(0, "qty", 2)]
        );
    }

    #[test]
    fn test_add_and_delete_end_the_collapse_window() {
        let mut queue = ChangeQueue::new(["px"]);
        queue.push(Change::Add { row: 1 });
        queue.push(update(1, "px", 1));
        queue.push(Change::Delete { row: 1 });
        // Joined tables reuse row ids.
        queue.push(Change::Add { row: 1 });
        queue.push(update(1, "px", 2));
        queue.push(update(1, "px", 3));
        assert_eq!(
            queue.drain(),
            [
                Change::Add { row: 1 },
                update(1, "px", 1),
                Change::Delete { row: 1 },
                Change::Add { row: 1 },
                update(1, "px", 3),
            ]
        );
    }

    #[test]
    fn test_collapse_restarts_after_drain() {
        let mut queue = ChangeQueue::new(["px"]);
        queue.push(update(2, "px", 1));
        assert_eq!(queue.drain().len(), 1);
        queue.push(update(2, "px", 2));
        queue.push(update(2, "px", 3));
        assert_eq!(queue.drain(), [update(2, "px", 3)]);
    }

    #[test]
    fn test_rows_collapse_independently() {
        let mut queue = ChangeQueue::new(["px"]);
        for row in 0..3 {
            queue.push(Change::Add { row });
        }
        for v in 0..5 {
            for row in 0..3 {
                queue.push(update(row, "px", v * 10 + row as i32));
            }
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), 6);
        assert_eq!(drained[3..], [update(0, "px", 40), update(1, "px", 41), update(2, "px", 42)]);
    }
}
