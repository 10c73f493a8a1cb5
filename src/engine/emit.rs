//! Step emission shared by every procedure.
//!
//! A procedure never builds a [`Step`] by hand. It reports what it just did
//! (compared, wrote, settled) and the emitter takes the snapshot, attaches the
//! current settled set and queues the result for the trace iterator.

use std::collections::{BTreeSet, VecDeque};
use std::ops::Range;

use crate::step::{SortValue, Step};

#[derive(Debug)]
pub(crate) struct Emitter<V> {
    pending: VecDeque<Step<V>>,
    settled: BTreeSet<usize>,
}

impl<V: SortValue> Emitter<V> {
    pub(crate) fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            settled: BTreeSet::new(),
        }
    }

    /// Queue a comparison step over `indices`.
    pub(crate) fn compare(&mut self, array: &[V], indices: &[usize]) {
        self.compare_snapshot(array.to_vec(), indices);
    }

    /// Queue a write step over `indices`.
    pub(crate) fn swap(&mut self, array: &[V], indices: &[usize]) {
        self.swap_snapshot(array.to_vec(), indices);
    }

    /// Queue an unannotated step.
    pub(crate) fn plain(&mut self, array: &[V]) {
        let sorted = self.sorted_snapshot();
        self.pending.push_back(Step::plain(array.to_vec(), sorted));
    }

    /// Like [`Emitter::compare`] for procedures whose visible array is not
    /// their working buffer.
    pub(crate) fn compare_snapshot(&mut self, snapshot: Vec<V>, indices: &[usize]) {
        let sorted = self.sorted_snapshot();
        self.pending.push_back(Step {
            array: snapshot,
            comparing: distinct(indices),
            swapping: Vec::new(),
            sorted,
        });
    }

    pub(crate) fn swap_snapshot(&mut self, snapshot: Vec<V>, indices: &[usize]) {
        let sorted = self.sorted_snapshot();
        self.pending.push_back(Step {
            array: snapshot,
            comparing: Vec::new(),
            swapping: distinct(indices),
            sorted,
        });
    }

    pub(crate) fn settle(&mut self, index: usize) {
        self.settled.insert(index);
    }

    pub(crate) fn settle_range(&mut self, range: Range<usize>) {
        self.settled.extend(range);
    }

    /// Number of settled indices.
    #[cfg(test)]
    pub(crate) fn settled_len(&self) -> usize {
        self.settled.len()
    }

    pub(crate) fn terminal(&mut self, array: Vec<V>) {
        self.settled.extend(0..array.len());
        self.pending.push_back(Step::terminal(array));
    }

    pub(crate) fn pop(&mut self) -> Option<Step<V>> {
        self.pending.pop_front()
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    fn sorted_snapshot(&self) -> Vec<usize> {
        self.settled.iter().copied().collect()
    }
}

/// Drop repeated indices, keeping first-seen order.
fn distinct(indices: &[usize]) -> Vec<usize> {
    match indices {
        [] => Vec::new(),
        [a] => vec![*a],
        [a, b] if a == b => vec![*a],
        [a, b] => vec![*a, *b],
        _ => {
            let mut seen = BTreeSet::new();
            indices.iter().copied().filter(|i| seen.insert(*i)).collect()
        }
    }
}
