//! Partition sorts: quick, intro and pattern-defeating quicksort.
//!
//! All three share one driver. Pending segments live on an explicit stack,
//! each carrying its own depth budget, and exactly one kernel is active at a
//! time (a partition, a small-segment insertion, a heap fallback or a run
//! reversal).

use std::mem;
use std::ops::Range;

use super::emit::Emitter;
use super::kernels::{
    floor_log2, median_of_three, HeapRun, InsertionRun, LomutoRun, Partition, Reversal,
};
use super::Procedure;
use crate::step::SortValue;

/// Segments at or below this length are finished by insertion sort.
const SMALL_SEGMENT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Quick,
    Intro,
    Pdq,
}

#[derive(Debug, Clone)]
struct Segment {
    range: Range<usize>,
    budget: u32,
}

enum Active<V> {
    Idle,
    Lomuto { run: LomutoRun, seg: Segment },
    Hoare { run: HoareRun, seg: Segment },
    Insert { run: InsertionRun<V>, range: Range<usize> },
    Heap(HeapRun),
    Reverse { run: Reversal, range: Range<usize> },
}

pub(crate) struct Segmented<V> {
    buf: Vec<V>,
    flavor: Flavor,
    stack: Vec<Segment>,
    active: Active<V>,
}

impl<V: SortValue> Segmented<V> {
    /// Median-of-three pivot parked at the high end, Lomuto partition.
    pub(crate) fn quick(buf: Vec<V>) -> Self {
        Self::with_budget(buf, Flavor::Quick, 0)
    }

    /// Depth-limited quicksort with insertion and heap fallbacks.
    pub(crate) fn intro(buf: Vec<V>) -> Self {
        let budget = 2 * floor_log2(buf.len());
        Self::with_budget(buf, Flavor::Intro, budget)
    }

    /// Pattern-defeating quicksort.
    pub(crate) fn pdq(buf: Vec<V>) -> Self {
        let budget = floor_log2(buf.len());
        Self::with_budget(buf, Flavor::Pdq, budget)
    }

    fn with_budget(buf: Vec<V>, flavor: Flavor, budget: u32) -> Self {
        let stack = vec![Segment {
            range: 0..buf.len(),
            budget,
        }];
        Self {
            buf,
            flavor,
            stack,
            active: Active::Idle,
        }
    }

    fn begin(&self, seg: Segment, out: &mut Emitter<V>) -> Active<V> {
        let range = seg.range.clone();
        let len = range.len();
        if len == 0 {
            return Active::Idle;
        }
        let (lo, hi) = (range.start, range.end - 1);

        match self.flavor {
            Flavor::Quick => {
                if len == 1 {
                    out.settle(lo);
                    return Active::Idle;
                }
                Active::Lomuto {
                    run: LomutoRun::new(lo, hi, true, false),
                    seg,
                }
            }
            Flavor::Intro => {
                if len <= SMALL_SEGMENT {
                    return insert(range);
                }
                if seg.budget == 0 {
                    return Active::Heap(HeapRun::new(range));
                }
                Active::Lomuto {
                    run: LomutoRun::new(lo, hi, false, true),
                    seg,
                }
            }
            Flavor::Pdq => {
                if len <= SMALL_SEGMENT {
                    return insert(range);
                }
                let keys = &self.buf[range.clone()];
                if keys.windows(2).all(|w| w[0].key() <= w[1].key()) {
                    out.settle_range(range);
                    return Active::Idle;
                }
                if keys.windows(2).all(|w| w[0].key() >= w[1].key()) {
                    return Active::Reverse {
                        run: Reversal::new(range.clone()),
                        range,
                    };
                }
                if seg.budget == 0 {
                    return Active::Heap(HeapRun::new(range));
                }
                Active::Hoare {
                    run: HoareRun::new(lo, hi),
                    seg,
                }
            }
        }
    }

    /// Settles the placed pivot and queues both sides, left on top.
    fn split(&mut self, seg: Segment, pivot: usize, out: &mut Emitter<V>) {
        out.settle(pivot);
        let Segment { range, budget } = seg;
        let budget = match self.flavor {
            Flavor::Quick => budget,
            Flavor::Intro => budget.saturating_sub(1),
            Flavor::Pdq => {
                let size = range.len();
                let (left, right) = (pivot - range.start, range.end - 1 - pivot);
                if left * 8 < size || right * 8 < size {
                    budget.saturating_sub(1)
                } else {
                    budget
                }
            }
        };
        self.stack.push(Segment {
            range: pivot + 1..range.end,
            budget,
        });
        self.stack.push(Segment {
            range: range.start..pivot,
            budget,
        });
    }
}

fn insert<V: SortValue>(range: Range<usize>) -> Active<V> {
    Active::Insert {
        run: InsertionRun::new(range.clone(), 1),
        range,
    }
}

impl<V: SortValue> Procedure<V> for Segmented<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let active = mem::replace(&mut self.active, Active::Idle);
        self.active = match active {
            Active::Idle => match self.stack.pop() {
                Some(seg) => self.begin(seg, out),
                None => return false,
            },
            Active::Lomuto { mut run, seg } => match run.advance(&mut self.buf, out) {
                Partition::Running => Active::Lomuto { run, seg },
                Partition::Placed(pivot) => {
                    self.split(seg, pivot, out);
                    Active::Idle
                }
            },
            Active::Hoare { mut run, seg } => match run.advance(&mut self.buf, out) {
                Partition::Running => Active::Hoare { run, seg },
                Partition::Placed(pivot) => {
                    self.split(seg, pivot, out);
                    Active::Idle
                }
            },
            Active::Insert { mut run, range } => {
                if run.advance(&mut self.buf, out) {
                    Active::Insert { run, range }
                } else {
                    out.settle_range(range);
                    Active::Idle
                }
            }
            Active::Heap(mut run) => {
                if run.advance(&mut self.buf, out) {
                    Active::Heap(run)
                } else {
                    Active::Idle
                }
            }
            Active::Reverse { mut run, range } => {
                if run.advance(&mut self.buf, out) {
                    Active::Reverse { run, range }
                } else {
                    out.settle_range(range);
                    Active::Idle
                }
            }
        };
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoarePhase {
    Pivot,
    Left,
    Right,
    Exchange,
}

/// Two-pointer partition of `lo..=hi` around a median-of-three pivot parked
/// at `lo`.
#[derive(Debug)]
struct HoareRun {
    lo: usize,
    hi: usize,
    i: usize,
    j: usize,
    phase: HoarePhase,
}

impl HoareRun {
    fn new(lo: usize, hi: usize) -> Self {
        Self {
            lo,
            hi,
            i: lo + 1,
            j: hi,
            phase: HoarePhase::Pivot,
        }
    }

    fn advance<V: SortValue>(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> Partition {
        let lo = self.lo;
        match self.phase {
            HoarePhase::Pivot => {
                let mid = lo + (self.hi - lo) / 2;
                let pivot = median_of_three(buf, lo, mid, self.hi);
                if pivot != lo {
                    buf.swap(pivot, lo);
                    out.swap(buf, &[pivot, lo]);
                }
                self.phase = HoarePhase::Left;
            }
            HoarePhase::Left => {
                if self.i <= self.j {
                    out.compare(buf, &[self.i, lo]);
                    if buf[self.i].key() < buf[lo].key() {
                        self.i += 1;
                        return Partition::Running;
                    }
                }
                self.phase = HoarePhase::Right;
            }
            HoarePhase::Right => {
                if self.i <= self.j {
                    out.compare(buf, &[self.j, lo]);
                    if buf[self.j].key() > buf[lo].key() {
                        self.j -= 1;
                        return Partition::Running;
                    }
                }
                self.phase = HoarePhase::Exchange;
            }
            HoarePhase::Exchange => {
                if self.i >= self.j {
                    if self.j != lo {
                        buf.swap(lo, self.j);
                        out.swap(buf, &[lo, self.j]);
                    }
                    return Partition::Placed(self.j);
                }
                buf.swap(self.i, self.j);
                out.swap(buf, &[self.i, self.j]);
                self.i += 1;
                self.j -= 1;
                self.phase = HoarePhase::Left;
            }
        }
        Partition::Running
    }
}
