//! Incremental join maintenance.
//!
//! The engine keeps, per join-key value, the source rows linked under that
//! key on each side and the pairings formed from them. For a key with left
//! rows `L` and right rows `R` the pairings are:
//!
//! - `L x R` when both are non-empty,
//! - `(l, None)` for every `l` when `R` is empty,
//! - `(None, r)` for every `r` when `L` is empty.
//!
//! A pairing exists while at least one side is set. It is part of the join
//! result, and owns a joined row id, only while the join type makes it
//! visible. Every operation returns the observable changes it caused, in the
//! order they happened, once the state is final.

use alloc::vec::Vec;
use hashbrown::HashMap;
use ripple_core::{RowIndex, Value};
use tracing::debug;

use super::join_type::{JoinSide, JoinType};
use super::row_ids::RowIdPool;

/// One observable change of the join result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinChange {
    /// A joined row became visible.
    Added(RowIndex),
    /// The given side of a visible joined row now points at a different
    /// source row, or at none.
    Updated(RowIndex, JoinSide),
    /// A joined row stopped being visible; its id is free for reuse.
    Deleted(RowIndex),
}

type PairingId = u64;

#[derive(Clone, Copy, Debug)]
struct Pairing {
    left: Option<RowIndex>,
    right: Option<RowIndex>,
    /// Joined row id, while visible.
    row: Option<RowIndex>,
}

impl Pairing {
    #[inline]
    fn side(&self, side: JoinSide) -> Option<RowIndex> {
        match side {
            JoinSide::Left => self.left,
            JoinSide::Right => self.right,
        }
    }

    #[inline]
    fn set_side(&mut self, side: JoinSide, row: Option<RowIndex>) {
        match side {
            JoinSide::Left => self.left = row,
            JoinSide::Right => self.right = row,
        }
    }
}

/// Rows and pairings sharing one key value.
#[derive(Debug, Default)]
struct RowGroup {
    left: Vec<RowIndex>,
    right: Vec<RowIndex>,
    /// In creation order.
    pairings: Vec<PairingId>,
}

impl RowGroup {
    #[inline]
    fn rows(&self, side: JoinSide) -> &Vec<RowIndex> {
        match side {
            JoinSide::Left => &self.left,
            JoinSide::Right => &self.right,
        }
    }

    #[inline]
    fn rows_mut(&mut self, side: JoinSide) -> &mut Vec<RowIndex> {
        match side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        }
    }
}

/// Stateful operator maintaining the pairings of a two-table equi-join.
///
/// The engine does not read tables itself: callers feed it the source row
/// and its current key value.
#[derive(Debug)]
pub struct JoinEngine {
    join_type: JoinType,
    groups: HashMap<Value, RowGroup>,
    pairings: HashMap<PairingId, Pairing>,
    next_pairing: PairingId,
    /// Reverse index: source row -> key it is linked under.
    left_keys: HashMap<RowIndex, Value>,
    right_keys: HashMap<RowIndex, Value>,
    /// Joined row id -> pairing.
    rows: Vec<Option<PairingId>>,
    ids: RowIdPool,
    row_count: usize,
}

impl JoinEngine {
    pub fn new(join_type: JoinType) -> Self {
        Self {
            join_type,
            groups: HashMap::new(),
            pairings: HashMap::new(),
            next_pairing: 0,
            left_keys: HashMap::new(),
            right_keys: HashMap::new(),
            rows: Vec::new(),
            ids: RowIdPool::new(),
            row_count: 0,
        }
    }

    #[inline]
    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    /// Returns the number of visible joined rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of distinct key values currently linked.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if `row` is a visible joined row.
    pub fn contains_row(&self, row: RowIndex) -> bool {
        matches!(self.rows.get(row), Some(Some(_)))
    }

    /// Returns the visible joined row ids in ascending order.
    pub fn row_indices(&self) -> Vec<RowIndex> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(row, _)| row)
            .collect()
    }

    /// Resolves the source row of `side` for joined row `row`.
    ///
    /// Returns `None` when the joined row does not exist or that side is
    /// unmatched.
    pub fn source_row(&self, side: JoinSide, row: RowIndex) -> Option<RowIndex> {
        let pid = self.rows.get(row).copied().flatten()?;
        self.pairings.get(&pid).and_then(|p| p.side(side))
    }

    #[inline]
    pub fn left_row(&self, row: RowIndex) -> Option<RowIndex> {
        self.source_row(JoinSide::Left, row)
    }

    #[inline]
    pub fn right_row(&self, row: RowIndex) -> Option<RowIndex> {
        self.source_row(JoinSide::Right, row)
    }

    /// Returns the key `source` is linked under, if it is linked.
    pub fn key_of(&self, side: JoinSide, source: RowIndex) -> Option<&Value> {
        self.keys(side).get(&source)
    }

    /// Returns the visible joined rows that reference `source`.
    pub fn joined_rows_of(&self, side: JoinSide, source: RowIndex) -> Vec<RowIndex> {
        let Some(group) = self.key_of(side, source).and_then(|k| self.groups.get(k)) else {
            return Vec::new();
        };
        group
            .pairings
            .iter()
            .filter_map(|pid| self.pairings.get(pid))
            .filter(|p| p.side(side) == Some(source))
            .filter_map(|p| p.row)
            .collect()
    }

    /// Links `source` under `key`, or moves it there if it is linked under a
    /// different key. Linking again under the same key changes nothing.
    pub fn link(&mut self, side: JoinSide, source: RowIndex, key: Value) -> Vec<JoinChange> {
        let mut changes = Vec::new();
        if let Some(current) = self.keys(side).get(&source).cloned() {
            if current == key {
                return changes;
            }
            debug!(?side, source, from = %current, to = %key, "join key changed");
            self.unlink_into(side, source, &mut changes);
        }
        self.link_into(side, source, key, &mut changes);
        changes
    }

    /// Removes `source` from the join, as on deletion of the source row.
    pub fn unlink(&mut self, side: JoinSide, source: RowIndex) -> Vec<JoinChange> {
        let mut changes = Vec::new();
        self.unlink_into(side, source, &mut changes);
        changes
    }

    fn keys(&self, side: JoinSide) -> &HashMap<RowIndex, Value> {
        match side {
            JoinSide::Left => &self.left_keys,
            JoinSide::Right => &self.right_keys,
        }
    }

    fn keys_mut(&mut self, side: JoinSide) -> &mut HashMap<RowIndex, Value> {
        match side {
            JoinSide::Left => &mut self.left_keys,
            JoinSide::Right => &mut self.right_keys,
        }
    }

    fn link_into(
        &mut self,
        side: JoinSide,
        source: RowIndex,
        key: Value,
        changes: &mut Vec<JoinChange>,
    ) {
        self.keys_mut(side).insert(source, key.clone());

        let group = self.groups.entry(key.clone()).or_default();
        group.rows_mut(side).push(source);
        let others = group.rows(side.other()).clone();
        let pairings = &self.pairings;
        let slots: Vec<PairingId> = group
            .pairings
            .iter()
            .copied()
            .filter(|pid| pairings.get(pid).is_some_and(|p| p.side(side).is_none()))
            .collect();

        if others.is_empty() {
            // First row on this side with nothing to pair against.
            let pid = self.create(side, Some(source), None, changes);
            self.attach(&key, pid);
        } else if !slots.is_empty() {
            // This side was empty: every other-side row sits in an unmatched
            // slot waiting for it.
            for pid in slots {
                if let Some(pairing) = self.pairings.get_mut(&pid) {
                    pairing.set_side(side, Some(source));
                }
                self.refresh(pid, side, changes);
            }
        } else {
            for other in others {
                let pid = self.create(side, Some(source), Some(other), changes);
                self.attach(&key, pid);
            }
        }
    }

    fn unlink_into(&mut self, side: JoinSide, source: RowIndex, changes: &mut Vec<JoinChange>) {
        let Some(key) = self.keys_mut(side).remove(&source) else {
            return;
        };
        let Some(group) = self.groups.get_mut(&key) else {
            return;
        };
        group.rows_mut(side).retain(|r| *r != source);
        let last_on_side = group.rows(side).is_empty();
        let pairings = &self.pairings;
        let affected: Vec<PairingId> = group
            .pairings
            .iter()
            .copied()
            .filter(|pid| pairings.get(pid).and_then(|p| p.side(side)) == Some(source))
            .collect();

        let mut destroyed = Vec::new();
        for pid in affected {
            let paired = self
                .pairings
                .get(&pid)
                .is_some_and(|p| p.side(side.other()).is_some());
            if paired && last_on_side {
                // The counterpart loses its last pairing and keeps an
                // unmatched slot.
                if let Some(pairing) = self.pairings.get_mut(&pid) {
                    pairing.set_side(side, None);
                }
                self.refresh(pid, side, changes);
            } else {
                self.destroy(pid, changes);
                destroyed.push(pid);
            }
        }

        if let Some(group) = self.groups.get_mut(&key) {
            group.pairings.retain(|pid| !destroyed.contains(pid));
            if group.pairings.is_empty() {
                self.groups.remove(&key);
            }
        }
    }

    fn attach(&mut self, key: &Value, pid: PairingId) {
        if let Some(group) = self.groups.get_mut(key) {
            group.pairings.push(pid);
        }
    }

    fn create(
        &mut self,
        side: JoinSide,
        this: Option<RowIndex>,
        other: Option<RowIndex>,
        changes: &mut Vec<JoinChange>,
    ) -> PairingId {
        let pid = self.next_pairing;
        self.next_pairing += 1;
        let mut pairing = Pairing {
            left: None,
            right: None,
            row: None,
        };
        pairing.set_side(side, this);
        pairing.set_side(side.other(), other);
        self.pairings.insert(pid, pairing);
        self.refresh(pid, side, changes);
        pid
    }

    fn destroy(&mut self, pid: PairingId, changes: &mut Vec<JoinChange>) {
        if let Some(Pairing { row: Some(id), .. }) = self.pairings.remove(&pid) {
            self.release(id);
            changes.push(JoinChange::Deleted(id));
        }
    }

    /// Reconciles the visibility of a pairing after `side` changed.
    fn refresh(&mut self, pid: PairingId, side: JoinSide, changes: &mut Vec<JoinChange>) {
        let Some(pairing) = self.pairings.get(&pid) else {
            return;
        };
        let visible = self
            .join_type
            .is_visible(pairing.left.is_some(), pairing.right.is_some());
        match (pairing.row, visible) {
            (Some(id), true) => changes.push(JoinChange::Updated(id, side)),
            (Some(id), false) => {
                self.set_row(pid, None);
                self.release(id);
                changes.push(JoinChange::Deleted(id));
            }
            (None, true) => {
                let id = self.ids.allocate();
                if self.rows.len() <= id {
                    self.rows.resize(id + 1, None);
                }
                self.rows[id] = Some(pid);
                self.row_count += 1;
                self.set_row(pid, Some(id));
                changes.push(JoinChange::Added(id));
            }
            (None, false) => {}
        }
    }

    fn set_row(&mut self, pid: PairingId, row: Option<RowIndex>) {
        if let Some(pairing) = self.pairings.get_mut(&pid) {
            pairing.row = row;
        }
    }

    fn release(&mut self, id: RowIndex) {
        if let Some(slot) = self.rows.get_mut(id) {
            *slot = None;
        }
        self.ids.release(id);
        self.row_count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use super::JoinChange::*;
    use super::JoinSide::*;

    fn key(k: i32) -> Value {
        Value::Int32(k)
    }

    fn pairs(engine: &JoinEngine) -> Vec<(Option<RowIndex>, Option<RowIndex>)> {
        engine
            .row_indices()
            .into_iter()
            .map(|row| (engine.left_row(row), engine.right_row(row)))
            .collect()
    }

    #[test]
    fn test_inner_one_to_many() {
        let mut engine = JoinEngine::new(JoinType::Inner);
        assert!(engine.link(Left, 0, key(401)).is_empty());
        assert_eq!(engine.row_count(), 0);

        assert_eq!(engine.link(Right, 0, key(401)), vec![Added(0)]);
        assert_eq!(pairs(&engine), vec![(Some(0), Some(0))]);

        assert_eq!(engine.link(Right, 1, key(401)), vec![Added(1)]);
        assert_eq!(pairs(&engine), vec![(Some(0), Some(0)), (Some(0), Some(1))]);
        assert_eq!(engine.row_count(), 2);
    }

    #[test]
    fn test_one_left_to_many_existing_rights() {
        let mut engine = JoinEngine::new(JoinType::Inner);
        for r in 0..3 {
            engine.link(Right, r, key(7));
        }
        let changes = engine.link(Left, 9, key(7));
        assert_eq!(changes, vec![Added(0), Added(1), Added(2)]);
        assert_eq!(
            pairs(&engine),
            vec![(Some(9), Some(0)), (Some(9), Some(1)), (Some(9), Some(2))]
        );
    }

    #[test]
    fn test_many_to_many_is_cross_product() {
        let mut engine = JoinEngine::new(JoinType::Inner);
        engine.link(Left, 0, key(1));
        engine.link(Left, 1, key(1));
        engine.link(Right, 0, key(1));
        engine.link(Right, 1, key(1));
        let mut got = pairs(&engine);
        got.sort();
        assert_eq!(
            got,
            vec![
                (Some(0), Some(0)),
                (Some(0), Some(1)),
                (Some(1), Some(0)),
                (Some(1), Some(1)),
            ]
        );
    }

    #[test]
    fn test_inner_delete_removes_joined_rows() {
        let mut engine = JoinEngine::new(JoinType::Inner);
        engine.link(Left, 0, key(1));
        engine.link(Right, 0, key(1));
        engine.link(Right, 1, key(1));

        assert_eq!(engine.unlink(Right, 0), vec![Deleted(0)]);
        assert_eq!(pairs(&engine), vec![(Some(0), Some(1))]);

        assert_eq!(engine.unlink(Left, 0), vec![Deleted(1)]);
        assert_eq!(engine.row_count(), 0);

        // The remaining right row keeps the key group alive.
        assert_eq!(engine.group_count(), 1);
        engine.unlink(Right, 1);
        assert_eq!(engine.group_count(), 0);
    }

    #[test]
    fn test_left_outer_surfaces_unmatched_left() {
        let mut engine = JoinEngine::new(JoinType::LeftOuter);
        assert_eq!(engine.link(Left, 0, key(5)), vec![Added(0)]);
        assert_eq!(pairs(&engine), vec![(Some(0), None)]);

        // The first right row fills the slot in place.
        assert_eq!(engine.link(Right, 3, key(5)), vec![Updated(0, Right)]);
        assert_eq!(pairs(&engine), vec![(Some(0), Some(3))]);

        // A second right row pairs as a new joined row.
        assert_eq!(engine.link(Right, 4, key(5)), vec![Added(1)]);

        // Deleting one right keeps the other pairing.
        assert_eq!(engine.unlink(Right, 3), vec![Deleted(0)]);
        // Deleting the last right blanks the left's last pairing.
        assert_eq!(engine.unlink(Right, 4), vec![Updated(1, Right)]);
        assert_eq!(pairs(&engine), vec![(Some(0), None)]);

        // Unmatched rights are never surfaced.
        assert!(engine.link(Right, 8, key(6)).is_empty());
        assert_eq!(engine.row_count(), 1);
    }

    #[test]
    fn test_right_outer_mirrors_left_outer() {
        let mut engine = JoinEngine::new(JoinType::RightOuter);
        assert!(engine.link(Left, 0, key(5)).is_empty());
        assert_eq!(engine.link(Right, 0, key(5)), vec![Added(0)]);
        assert_eq!(engine.unlink(Left, 0), vec![Updated(0, Left)]);
        assert_eq!(pairs(&engine), vec![(None, Some(0))]);
        assert_eq!(engine.unlink(Right, 0), vec![Deleted(0)]);
        assert_eq!(engine.group_count(), 0);
    }

    #[test]
    fn test_full_outer_blanks_instead_of_deleting() {
        let mut engine = JoinEngine::new(JoinType::FullOuter);
        engine.link(Left, 0, key(1));
        engine.link(Right, 0, key(1));
        assert_eq!(pairs(&engine), vec![(Some(0), Some(0))]);

        assert_eq!(engine.unlink(Left, 0), vec![Updated(0, Left)]);
        assert_eq!(pairs(&engine), vec![(None, Some(0))]);
        assert_eq!(engine.row_count(), 1);

        assert_eq!(engine.unlink(Right, 0), vec![Deleted(0)]);
        assert_eq!(engine.row_count(), 0);
        assert_eq!(engine.group_count(), 0);
    }

    #[test]
    fn test_full_outer_one_to_many_delete() {
        let mut engine = JoinEngine::new(JoinType::FullOuter);
        engine.link(Left, 0, key(1));
        engine.link(Right, 0, key(1));
        engine.link(Right, 1, key(1));
        assert_eq!(engine.row_count(), 2);

        // The left row is the last left for the key: both rights keep an
        // unmatched slot.
        assert_eq!(engine.unlink(Left, 0), vec![Updated(0, Left), Updated(1, Left)]);
        assert_eq!(pairs(&engine), vec![(None, Some(0)), (None, Some(1))]);

        // A new left fills every slot.
        assert_eq!(engine.link(Left, 5, key(1)), vec![Updated(0, Left), Updated(1, Left)]);
        assert_eq!(pairs(&engine), vec![(Some(5), Some(0)), (Some(5), Some(1))]);

        // A second left pairs with both rights; removing it drops only its
        // own pairings.
        assert_eq!(engine.link(Left, 6, key(1)), vec![Added(2), Added(3)]);
        assert_eq!(engine.unlink(Left, 6), vec![Deleted(2), Deleted(3)]);
        assert_eq!(engine.row_count(), 2);
    }

    #[test]
    fn test_row_ids_recycled_lowest_first() {
        let mut engine = JoinEngine::new(JoinType::Inner);
        engine.link(Left, 0, key(1));
        for r in 0..3 {
            engine.link(Right, r, key(1));
        }
        engine.link(Left, 1, key(2));
        engine.link(Right, 3, key(2));
        assert_eq!(engine.row_indices(), vec![0, 1, 2, 3]);

        engine.unlink(Left, 0);
        for r in 0..3 {
            engine.unlink(Right, r);
        }
        assert_eq!(engine.row_indices(), vec![3]);

        engine.link(Left, 10, key(1));
        assert_eq!(engine.link(Right, 10, key(1)), vec![Added(0)]);
        assert_eq!(engine.link(Right, 11, key(1)), vec![Added(1)]);
        assert_eq!(engine.link(Right, 12, key(1)), vec![Added(2)]);
        assert_eq!(engine.link(Right, 13, key(1)), vec![Added(4)]);
    }

    #[test]
    fn test_key_change_relinks() {
        let mut engine = JoinEngine::new(JoinType::Inner);
        engine.link(Left, 0, key(1));
        engine.link(Right, 0, key(1));
        engine.link(Right, 1, key(2));

        assert!(engine.link(Left, 0, key(1)).is_empty());

        let changes = engine.link(Left, 0, key(2));
        assert_eq!(changes, vec![Deleted(0), Added(0)]);
        assert_eq!(pairs(&engine), vec![(Some(0), Some(1))]);
        assert_eq!(engine.key_of(Left, 0), Some(&key(2)));
    }

    #[test]
    fn test_joined_rows_of() {
        let mut engine = JoinEngine::new(JoinType::LeftOuter);
        engine.link(Left, 0, key(1));
        engine.link(Right, 0, key(1));
        engine.link(Right, 1, key(1));
        engine.link(Right, 2, key(9));
        assert_eq!(engine.joined_rows_of(Left, 0), vec![0, 1]);
        assert_eq!(engine.joined_rows_of(Right, 1), vec![1]);
        assert!(engine.joined_rows_of(Right, 2).is_empty());
        assert!(engine.joined_rows_of(Left, 42).is_empty());
    }

    #[test]
    fn test_unlink_unknown_row_is_noop() {
        let mut engine = JoinEngine::new(JoinType::FullOuter);
        assert!(engine.unlink(Left, 3).is_empty());
        assert_eq!(engine.source_row(Left, 0), None);
        assert!(!engine.contains_row(0));
    }
}
