//! The step protocol shared by every algorithm.
//!
//! A [`Step`] is one snapshot of sort progress: the full array as it stands,
//! plus the indices the algorithm just compared, just wrote, or considers
//! settled. Consumers (rendering, audio) derive everything they show from
//! these four fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element contract for traced sorts.
///
/// Every ordering decision inside the engine is made on [`SortValue::key`].
/// Carrying extra payload alongside the key is how stability becomes
/// observable: two elements with equal keys but different payloads must come
/// out of a stable algorithm in input order.
///
/// # Examples
///
/// ```
/// use sortrace::SortValue;
///
/// assert_eq!(42_i64.key(), 42);
/// assert_eq!(42_i64.with_key(7), 7);
/// ```
pub trait SortValue: Copy + Send + Sync + fmt::Debug + 'static {
    /// The integer key this element sorts by.
    fn key(&self) -> i64;

    /// A copy of this element carrying a different key.
    ///
    /// Used where an algorithm has to manufacture values (padding sentinels,
    /// sign flips); the payload of `self` is preserved.
    #[must_use]
    fn with_key(&self, key: i64) -> Self;
}

impl SortValue for i64 {
    #[inline]
    fn key(&self) -> i64 {
        *self
    }

    #[inline]
    fn with_key(&self, key: i64) -> Self {
        key
    }
}

/// One snapshot of an algorithm run.
///
/// Invariants upheld by the engine:
/// - every index lies in `0..array.len()`;
/// - `array` is an owned copy, never shared with an earlier step;
/// - `comparing` and `swapping` are never both non-empty;
/// - index lists contain no duplicates and `sorted` is ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step<V = i64> {
    /// Full snapshot of the working array.
    pub array: Vec<V>,
    /// Indices just read for a comparison, in emission order.
    pub comparing: Vec<usize>,
    /// Indices just written.
    pub swapping: Vec<usize>,
    /// Indices in their final position, ascending.
    pub sorted: Vec<usize>,
}

impl<V> Step<V> {
    /// A step carrying no annotations other than `sorted`.
    #[must_use]
    pub const fn plain(array: Vec<V>, sorted: Vec<usize>) -> Self {
        Self {
            array,
            comparing: Vec::new(),
            swapping: Vec::new(),
            sorted,
        }
    }

    /// The terminal step: everything settled.
    #[must_use]
    pub fn terminal(array: Vec<V>) -> Self {
        let sorted = (0..array.len()).collect();
        Self::plain(array, sorted)
    }

    /// Returns true if this step reports a comparison.
    #[must_use]
    pub fn is_comparison(&self) -> bool {
        !self.comparing.is_empty()
    }

    /// Returns true if this step reports a write.
    #[must_use]
    pub fn is_swap(&self) -> bool {
        !self.swapping.is_empty()
    }

    /// Returns true if every index of the array is marked settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.sorted.len() == self.array.len()
            && self.sorted.iter().copied().eq(0..self.array.len())
    }

    /// Length of the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }
}

impl<V: SortValue> Step<V> {
    /// The keys of the snapshot.
    #[must_use]
    pub fn keys(&self) -> Vec<i64> {
        self.array.iter().map(SortValue::key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_marks_full_range() {
        let step = Step::terminal(vec![3_i64, 1, 2]);
        assert_eq!(step.sorted, vec![0, 1, 2]);
        assert!(step.is_settled());
        assert!(!step.is_comparison());
        assert!(!step.is_swap());
    }

    #[test]
    fn empty_terminal_is_settled() {
        let step: Step<i64> = Step::terminal(Vec::new());
        assert!(step.is_empty());
        assert!(step.is_settled());
    }

    #[test]
    fn partial_sorted_is_not_settled() {
        let step = Step::plain(vec![1_i64, 2, 3], vec![0, 2]);
        assert!(!step.is_settled());
    }

    #[test]
    fn step_serializes_with_field_names() {
        let step = Step {
            array: vec![2_i64, 1],
            comparing: vec![0, 1],
            swapping: vec![],
            sorted: vec![],
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["array"], serde_json::json!([2, 1]));
        assert_eq!(json["comparing"], serde_json::json!([0, 1]));

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }
}
