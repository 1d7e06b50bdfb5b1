//! Property-based tests for incremental join maintenance.
//!
//! These tests apply random add/delete/re-key/update sequences to both
//! sources and verify, after every step, that the joined table equals a
//! from-scratch nested loop join of the current source rows.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use proptest::prelude::*;
use ripple_core::schema::SchemaBuilder;
use ripple_core::{DataType, RowIndex};
use ripple_incremental::{join, JoinType, JoinedTable};
use ripple_reactive::TableUpdate;
use ripple_storage::{ReactiveTable, ReactiveTableExt, Table};

type Pair = (Option<RowIndex>, Option<RowIndex>);

#[derive(Clone, Debug)]
enum Op {
    AddLeft(i32),
    AddRight(i32),
    DeleteLeft(usize),
    DeleteRight(usize),
    RekeyLeft(usize, i32),
    RekeyRight(usize, i32),
    SetPayload(usize, i32),
}

/// Small key domain so that groups collide often.
fn key_strategy() -> impl Strategy<Value = i32> {
    0i32..4
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => key_strategy().prop_map(Op::AddLeft),
        3 => key_strategy().prop_map(Op::AddRight),
        1 => any::<usize>().prop_map(Op::DeleteLeft),
        1 => any::<usize>().prop_map(Op::DeleteRight),
        1 => (any::<usize>(), key_strategy()).prop_map(|(i, k)| Op::RekeyLeft(i, k)),
        1 => (any::<usize>(), key_strategy()).prop_map(|(i, k)| Op::RekeyRight(i, k)),
        1 => (any::<usize>(), -100i32..100).prop_map(|(i, v)| Op::SetPayload(i, v)),
    ]
}

fn join_type_strategy() -> impl Strategy<Value = JoinType> {
    prop::sample::select(JoinType::ALL.to_vec())
}

fn side_table(name: &str) -> Table {
    Table::new(
        SchemaBuilder::new(name)
            .unwrap()
            .add_column(format!("{}.key", name), DataType::Int32)
            .unwrap()
            .add_column(format!("{}.payload", name), DataType::Int32)
            .unwrap()
            .build()
            .unwrap(),
    )
}

/// The live rows of one source, as the test model sees them.
#[derive(Default)]
struct Side {
    rows: Vec<(RowIndex, i32)>,
}

impl Side {
    fn pick(&self, i: usize) -> Option<usize> {
        if self.rows.is_empty() {
            None
        } else {
            Some(i % self.rows.len())
        }
    }
}

/// Nested loop recomputation of the join result.
fn expected_pairs(join_type: JoinType, left: &Side, right: &Side) -> Vec<Pair> {
    let keep_left = matches!(join_type, JoinType::LeftOuter | JoinType::FullOuter);
    let keep_right = matches!(join_type, JoinType::RightOuter | JoinType::FullOuter);
    let mut pairs = Vec::new();
    for &(l, lk) in &left.rows {
        let mut matched = false;
        for &(r, rk) in &right.rows {
            if lk == rk {
                pairs.push((Some(l), Some(r)));
                matched = true;
            }
        }
        if !matched && keep_left {
            pairs.push((Some(l), None));
        }
    }
    if keep_right {
        for &(r, rk) in &right.rows {
            if !left.rows.iter().any(|&(_, lk)| lk == rk) {
                pairs.push((None, Some(r)));
            }
        }
    }
    pairs.sort();
    pairs
}

fn actual_pairs(joined: &JoinedTable) -> Vec<Pair> {
    let mut pairs: Vec<Pair> = joined
        .row_indices()
        .into_iter()
        .map(|row| (joined.left_row(row), joined.right_row(row)))
        .collect();
    pairs.sort();
    pairs
}

fn add(table: &Table, side: &mut Side, key: i32) {
    let row = table.add_row();
    table.set_value(&format!("{}.key", table.name()), row, key).unwrap();
    side.rows.push((row, key));
}

fn delete(table: &Table, side: &mut Side, i: usize) {
    if let Some(i) = side.pick(i) {
        let (row, _) = side.rows.remove(i);
        table.delete_row(row).unwrap();
    }
}

fn rekey(table: &Table, side: &mut Side, i: usize, key: i32) {
    if let Some(i) = side.pick(i) {
        let row = side.rows[i].0;
        table.set_value(&format!("{}.key", table.name()), row, key).unwrap();
        side.rows[i].1 = key;
    }
}

proptest! {
    /// Property: the incrementally maintained join always equals a nested
    /// loop join of the current sources, for every join type.
    #[test]
    fn join_matches_nested_loop(
        join_type in join_type_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let left = side_table("l");
        let right = side_table("r");
        let joined = join(left.clone(), "l.key", right.clone(), "r.key", join_type).unwrap();

        // Live joined rows as the stream reports them, including rows that
        // only exist between a row's Add and its key write.
        let live = Rc::new(RefCell::new(BTreeSet::new()));
        let peak = Rc::new(Cell::new(0usize));
        let (live_clone, peak_clone) = (live.clone(), peak.clone());
        let _token = joined.subscribe(move |u: &TableUpdate| {
            let mut live = live_clone.borrow_mut();
            if u.is_add() {
                live.insert(u.row_index());
            } else if u.is_delete() {
                live.remove(&u.row_index());
            }
            peak_clone.set(peak_clone.get().max(live.len()));
        });

        let mut left_model = Side::default();
        let mut right_model = Side::default();

        for op in ops {
            match op {
                Op::AddLeft(k) => add(&left, &mut left_model, k),
                Op::AddRight(k) => add(&right, &mut right_model, k),
                Op::DeleteLeft(i) => delete(&left, &mut left_model, i),
                Op::DeleteRight(i) => delete(&right, &mut right_model, i),
                Op::RekeyLeft(i, k) => rekey(&left, &mut left_model, i, k),
                Op::RekeyRight(i, k) => rekey(&right, &mut right_model, i, k),
                Op::SetPayload(i, v) => {
                    if let Some(i) = right_model.pick(i) {
                        right.set_value("r.payload", right_model.rows[i].0, v).unwrap();
                    }
                }
            }

            let expected = expected_pairs(join_type, &left_model, &right_model);
            prop_assert_eq!(actual_pairs(&joined), expected.clone());
            prop_assert_eq!(joined.row_count(), expected.len());

            // Lowest-first reuse keeps ids below the peak row count.
            if let Some(&highest) = joined.row_indices().last() {
                prop_assert!(highest < peak.get());
            }

            // Joined reads resolve through the mapping, unmatched sides read defaults.
            for row in joined.row_indices() {
                let payload = joined.get::<i32>("r.payload", row).unwrap();
                match joined.right_row(row) {
                    Some(r) => prop_assert_eq!(payload, right.get::<i32>("r.payload", r).unwrap()),
                    None => prop_assert_eq!(payload, 0),
                }
            }
        }
    }

    /// Property: an observer replaying Add/Delete reconstructs exactly the
    /// live joined rows, never sees a duplicate Add or a Delete of an
    /// unknown row, and only sees Updates for live rows.
    #[test]
    fn observed_stream_is_consistent(
        join_type in join_type_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let left = side_table("l");
        let right = side_table("r");
        let joined = join(left.clone(), "l.key", right.clone(), "r.key", join_type).unwrap();

        let live = Rc::new(RefCell::new(BTreeSet::new()));
        let violation = Rc::new(Cell::new(false));
        let live_clone = live.clone();
        let violation_clone = violation.clone();
        let _token = joined.subscribe(move |u: &TableUpdate| {
            let mut live = live_clone.borrow_mut();
            let ok = if u.is_add() {
                live.insert(u.row_index())
            } else if u.is_delete() {
                live.remove(&u.row_index())
            } else {
                live.contains(&u.row_index())
            };
            if !ok {
                violation_clone.set(true);
            }
        });

        let mut left_model = Side::default();
        let mut right_model = Side::default();
        for op in ops {
            match op {
                Op::AddLeft(k) => add(&left, &mut left_model, k),
                Op::AddRight(k) => add(&right, &mut right_model, k),
                Op::DeleteLeft(i) => delete(&left, &mut left_model, i),
                Op::DeleteRight(i) => delete(&right, &mut right_model, i),
                Op::RekeyLeft(i, k) => rekey(&left, &mut left_model, i, k),
                Op::RekeyRight(i, k) => rekey(&right, &mut right_model, i, k),
                Op::SetPayload(i, v) => {
                    if let Some(i) = right_model.pick(i) {
                        right.set_value("r.payload", right_model.rows[i].0, v).unwrap();
                    }
                }
            }
            prop_assert!(!violation.get());
            let observed: Vec<RowIndex> = live.borrow().iter().copied().collect();
            prop_assert_eq!(observed, joined.row_indices());
        }
    }
}
