//! Resumable building blocks shared between procedures.
//!
//! Each kernel operates on a caller-owned buffer and an explicit index range.
//! `advance` performs one bounded unit of work, queues the steps it produced
//! and returns `false` once the kernel has nothing left to do.

use std::ops::Range;

use super::emit::Emitter;
use crate::step::SortValue;

/// Returns the index holding the median key among `a`, `b`, `c`.
pub(crate) fn median_of_three<V: SortValue>(buf: &[V], a: usize, b: usize, c: usize) -> usize {
    let (ka, kb, kc) = (buf[a].key(), buf[b].key(), buf[c].key());
    if (ka <= kb && kb <= kc) || (kc <= kb && kb <= ka) {
        b
    } else if (kb <= ka && ka <= kc) || (kc <= ka && ka <= kb) {
        a
    } else {
        c
    }
}

/// `floor(log2(n))` for `n >= 1`, zero otherwise.
pub(crate) fn floor_log2(n: usize) -> u32 {
    if n == 0 {
        0
    } else {
        usize::BITS - 1 - n.leading_zeros()
    }
}

/// Integer square root, rounded down.
pub(crate) fn floor_sqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let mut x = (n as f64).sqrt() as usize;
    while x.saturating_mul(x) > n {
        x -= 1;
    }
    while (x + 1).saturating_mul(x + 1) <= n {
        x += 1;
    }
    x
}

// ── Gapped insertion ────────────────────────────────────────────────────

#[derive(Debug)]
struct Hole<V> {
    origin: usize,
    pos: usize,
    value: V,
}

/// Gapped insertion sort over a range. A gap of 1 is plain insertion sort.
#[derive(Debug)]
pub(crate) struct InsertionRun<V> {
    lo: usize,
    hi: usize,
    gap: usize,
    next: usize,
    hole: Option<Hole<V>>,
    settle_prefix: bool,
}

impl<V: SortValue> InsertionRun<V> {
    pub(crate) fn new(range: Range<usize>, gap: usize) -> Self {
        let gap = gap.max(1);
        Self {
            lo: range.start,
            hi: range.end,
            gap,
            next: range.start + gap,
            hole: None,
            settle_prefix: false,
        }
    }

    /// Settle the growing sorted prefix as elements are placed.
    pub(crate) fn settling_prefix(mut self) -> Self {
        self.settle_prefix = true;
        self
    }

    pub(crate) fn advance(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        let gap = self.gap;
        let Some(hole) = self.hole.as_mut() else {
            if self.next >= self.hi {
                return false;
            }
            let origin = self.next;
            self.next += 1;
            if self.settle_prefix {
                out.settle_range(self.lo..origin);
            }
            self.hole = Some(Hole {
                origin,
                pos: origin,
                value: buf[origin],
            });
            return true;
        };

        if hole.pos >= self.lo + gap && buf[hole.pos - gap].key() > hole.value.key() {
            let from = hole.pos - gap;
            out.compare(buf, &[from, hole.pos]);
            buf[hole.pos] = buf[from];
            out.swap(buf, &[from, hole.pos]);
            hole.pos = from;
            return true;
        }

        if self.settle_prefix {
            out.settle_range(self.lo..hole.origin + 1);
        }
        if hole.pos != hole.origin {
            buf[hole.pos] = hole.value;
            out.swap(buf, &[hole.pos]);
        }
        self.hole = None;
        true
    }
}

// ── Heap sort over a range ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum HeapPhase {
    Build { remaining: usize },
    Extract { end: usize },
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Sift {
    root: usize,
    size: usize,
}

/// Max-heap sort of `lo..lo + len`, settling each extracted position.
#[derive(Debug)]
pub(crate) struct HeapRun {
    lo: usize,
    len: usize,
    phase: HeapPhase,
    sift: Option<Sift>,
}

impl HeapRun {
    pub(crate) fn new(range: Range<usize>) -> Self {
        let len = range.end - range.start;
        Self {
            lo: range.start,
            len,
            phase: HeapPhase::Build { remaining: len / 2 },
            sift: None,
        }
    }

    pub(crate) fn advance<V: SortValue>(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        if let Some(sift) = self.sift {
            self.sift = self.sift_level(sift, buf, out);
            return true;
        }

        match self.phase {
            HeapPhase::Build { remaining } if remaining > 0 => {
                self.phase = HeapPhase::Build { remaining: remaining - 1 };
                self.sift = Some(Sift {
                    root: remaining - 1,
                    size: self.len,
                });
                true
            }
            HeapPhase::Build { .. } => {
                self.phase = if self.len == 0 {
                    HeapPhase::Done
                } else {
                    HeapPhase::Extract { end: self.len - 1 }
                };
                true
            }
            HeapPhase::Extract { end } if end > 0 => {
                buf.swap(self.lo, self.lo + end);
                out.settle(self.lo + end);
                out.swap(buf, &[self.lo, self.lo + end]);
                self.sift = Some(Sift { root: 0, size: end });
                self.phase = HeapPhase::Extract { end: end - 1 };
                true
            }
            HeapPhase::Extract { .. } => {
                out.settle(self.lo);
                self.phase = HeapPhase::Done;
                false
            }
            HeapPhase::Done => false,
        }
    }

    /// One level of sift-down. Returns the next level to sift, if any.
    fn sift_level<V: SortValue>(&self, sift: Sift, buf: &mut [V], out: &mut Emitter<V>) -> Option<Sift> {
        let lo = self.lo;
        let Sift { root, size } = sift;
        let mut largest = root;
        let left = 2 * root + 1;
        let right = left + 1;

        if left < size {
            out.compare(buf, &[lo + largest, lo + left]);
            if buf[lo + left].key() > buf[lo + largest].key() {
                largest = left;
            }
        }
        if right < size {
            out.compare(buf, &[lo + largest, lo + right]);
            if buf[lo + right].key() > buf[lo + largest].key() {
                largest = right;
            }
        }

        if largest == root {
            return None;
        }
        buf.swap(lo + root, lo + largest);
        out.swap(buf, &[lo + root, lo + largest]);
        Some(Sift { root: largest, size })
    }
}

// ── Buffered two-way merge ──────────────────────────────────────────────

/// Stable merge of `lo..mid` and `mid..hi` through copies of both halves.
#[derive(Debug)]
pub(crate) struct MergeRun<V> {
    lo: usize,
    mid: usize,
    left: Vec<V>,
    right: Vec<V>,
    i: usize,
    j: usize,
    k: usize,
    settle: bool,
}

impl<V: SortValue> MergeRun<V> {
    pub(crate) fn new(buf: &[V], lo: usize, mid: usize, hi: usize) -> Self {
        Self {
            lo,
            mid,
            left: buf[lo..mid].to_vec(),
            right: buf[mid..hi].to_vec(),
            i: 0,
            j: 0,
            k: lo,
            settle: false,
        }
    }

    /// Settle each output position as it is written.
    pub(crate) fn settling(mut self, settle: bool) -> Self {
        self.settle = settle;
        self
    }

    pub(crate) fn advance(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        let has_left = self.i < self.left.len();
        let has_right = self.j < self.right.len();

        let value = match (has_left, has_right) {
            (true, true) => {
                out.compare(buf, &[self.lo + self.i, self.mid + self.j]);
                if self.left[self.i].key() <= self.right[self.j].key() {
                    self.i += 1;
                    self.left[self.i - 1]
                } else {
                    self.j += 1;
                    self.right[self.j - 1]
                }
            }
            (true, false) => {
                self.i += 1;
                self.left[self.i - 1]
            }
            (false, true) => {
                self.j += 1;
                self.right[self.j - 1]
            }
            (false, false) => return false,
        };

        buf[self.k] = value;
        if self.settle {
            out.settle(self.k);
        }
        out.swap(buf, &[self.k]);
        self.k += 1;
        true
    }
}

// ── In-place reversal ───────────────────────────────────────────────────

/// Reverses a range one swap at a time.
#[derive(Debug)]
pub(crate) struct Reversal {
    front: usize,
    back: usize,
}

impl Reversal {
    pub(crate) fn new(range: Range<usize>) -> Self {
        Self {
            front: range.start,
            back: range.end,
        }
    }

    pub(crate) fn advance<V: SortValue>(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        if self.back <= self.front + 1 {
            return false;
        }
        let (a, b) = (self.front, self.back - 1);
        buf.swap(a, b);
        out.swap(buf, &[a, b]);
        self.front += 1;
        self.back -= 1;
        true
    }
}

// ── Lomuto partition ────────────────────────────────────────────────────

/// Result of one partition unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Partition {
    Running,
    Placed(usize),
}

/// Lomuto partition of the inclusive segment `lo..=hi` around `buf[hi]`.
#[derive(Debug)]
pub(crate) struct LomutoRun {
    lo: usize,
    hi: usize,
    store: usize,
    scan: usize,
    choose_pivot: bool,
    take_equal: bool,
}

impl LomutoRun {
    /// `median_pivot` first parks the median of three at `hi`; `take_equal`
    /// moves keys equal to the pivot to the left side.
    pub(crate) fn new(lo: usize, hi: usize, median_pivot: bool, take_equal: bool) -> Self {
        Self {
            lo,
            hi,
            store: lo,
            scan: lo,
            choose_pivot: median_pivot,
            take_equal,
        }
    }

    pub(crate) fn advance<V: SortValue>(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> Partition {
        if self.choose_pivot {
            self.choose_pivot = false;
            let mid = self.lo + (self.hi - self.lo) / 2;
            let pivot = median_of_three(buf, self.lo, mid, self.hi);
            if pivot != self.hi {
                buf.swap(pivot, self.hi);
                out.swap(buf, &[pivot, self.hi]);
            }
            return Partition::Running;
        }

        if self.scan < self.hi {
            let j = self.scan;
            self.scan += 1;
            out.compare(buf, &[j, self.hi]);
            let (key, pivot) = (buf[j].key(), buf[self.hi].key());
            let goes_left = if self.take_equal { key <= pivot } else { key < pivot };
            if goes_left {
                if self.store != j {
                    buf.swap(self.store, j);
                    out.swap(buf, &[self.store, j]);
                }
                self.store += 1;
            }
            return Partition::Running;
        }

        buf.swap(self.store, self.hi);
        out.swap(buf, &[self.store, self.hi]);
        Partition::Placed(self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut f: impl FnMut() -> bool) {
        let mut guard = 0;
        while f() {
            guard += 1;
            assert!(guard < 1_000_000, "kernel did not terminate");
        }
    }

    #[test]
    fn median_of_three_picks_middle_key() {
        let buf = [5_i64, 1, 9];
        assert_eq!(median_of_three(&buf, 0, 1, 2), 0);
        let buf = [1_i64, 5, 9];
        assert_eq!(median_of_three(&buf, 0, 1, 2), 1);
        let buf = [1_i64, 9, 5];
        assert_eq!(median_of_three(&buf, 0, 1, 2), 2);
    }

    #[test]
    fn floor_log2_matches_definition() {
        assert_eq!(floor_log2(1), 0);
        assert_eq!(floor_log2(2), 1);
        assert_eq!(floor_log2(17), 4);
        assert_eq!(floor_log2(1024), 10);
    }

    #[test]
    fn floor_sqrt_rounds_down() {
        assert_eq!(floor_sqrt(0), 0);
        assert_eq!(floor_sqrt(1), 1);
        assert_eq!(floor_sqrt(15), 3);
        assert_eq!(floor_sqrt(16), 4);
        assert_eq!(floor_sqrt(1_000_000), 1000);
    }

    #[test]
    fn insertion_sorts_subrange_only() {
        let mut buf = vec![9_i64, 4, 3, 2, 1, 0];
        let mut out = Emitter::new();
        let mut run = InsertionRun::new(1..5, 1);
        drain(|| run.advance(&mut buf, &mut out));
        assert_eq!(buf, vec![9, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn gapped_insertion_sorts_each_chain() {
        let mut buf = vec![5_i64, 4, 3, 2, 1, 0];
        let mut out = Emitter::new();
        let mut run = InsertionRun::new(0..6, 2);
        drain(|| run.advance(&mut buf, &mut out));
        assert_eq!(buf, vec![1, 0, 3, 2, 5, 4]);
    }

    #[test]
    fn heap_run_sorts_and_settles_range() {
        let mut buf = vec![100_i64, 7, 3, 9, 1, 5, -100];
        let mut out = Emitter::new();
        let mut run = HeapRun::new(1..6);
        drain(|| run.advance(&mut buf, &mut out));
        assert_eq!(buf, vec![100, 1, 3, 5, 7, 9, -100]);
        assert_eq!(out.settled_len(), 5);
    }

    #[test]
    fn merge_run_is_stable() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        struct Tag(i64, u8);
        impl SortValue for Tag {
            fn key(&self) -> i64 {
                self.0
            }
            fn with_key(&self, key: i64) -> Self {
                Tag(key, self.1)
            }
        }

        let mut buf = vec![Tag(1, 0), Tag(2, 1), Tag(1, 2), Tag(2, 3)];
        let mut out = Emitter::new();
        let mut run = MergeRun::new(&buf, 0, 2, 4);
        drain(|| run.advance(&mut buf, &mut out));
        assert_eq!(buf, vec![Tag(1, 0), Tag(1, 2), Tag(2, 1), Tag(2, 3)]);
    }

    #[test]
    fn reversal_reverses_range() {
        let mut buf = vec![0_i64, 1, 2, 3, 4];
        let mut out = Emitter::new();
        let mut run = Reversal::new(1..5);
        drain(|| run.advance(&mut buf, &mut out));
        assert_eq!(buf, vec![0, 4, 3, 2, 1]);
    }

    #[test]
    fn lomuto_places_pivot() {
        let mut buf = vec![3_i64, 8, 1, 9, 5];
        let mut out = Emitter::new();
        let mut run = LomutoRun::new(0, 4, false, false);
        let placed = loop {
            if let Partition::Placed(p) = run.advance(&mut buf, &mut out) {
                break p;
            }
        };
        assert_eq!(buf[placed], 5);
        assert!(buf[..placed].iter().all(|v| *v < 5));
        assert!(buf[placed + 1..].iter().all(|v| *v >= 5));
    }
}
