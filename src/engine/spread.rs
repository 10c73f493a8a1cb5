//! Adaptive bucket ("spread") sort.
//!
//! A segment is either finished by insertion sort (small, or a key range
//! narrower than its length) or scattered into up to 256 buckets by a shift
//! of `key - min`, written back, and each bucket queued as a new segment.
//! Negative keys are sorted as magnitudes in a prefix and restored reversed.
//! The magnitude of `k` is stored as `!k` (that is `-k - 1`), which orders
//! like `-k` and stays in range for `i64::MIN`.

use std::mem;
use std::ops::Range;

use super::emit::Emitter;
use super::kernels::{floor_log2, floor_sqrt, InsertionRun};
use super::Procedure;
use crate::step::SortValue;

const SMALL_SEGMENT: usize = 16;
const MAX_BUCKETS: usize = 256;

#[derive(Debug, Clone)]
enum Task {
    Segment(Range<usize>),
    /// Turn the sorted magnitudes in `0..k` back into ascending negatives.
    Restore(usize),
}

enum Active<V> {
    Idle,
    Insert {
        run: InsertionRun<V>,
        range: Range<usize>,
    },
    Scatter {
        range: Range<usize>,
        min: i64,
        shift: u32,
        i: usize,
        buckets: Vec<Vec<(V, usize)>>,
    },
    Gather {
        range: Range<usize>,
        items: Vec<(V, usize)>,
        bounds: Vec<Range<usize>>,
        i: usize,
    },
    Restore {
        magnitudes: Vec<V>,
        i: usize,
    },
}

pub(crate) struct Spread<V> {
    buf: Vec<V>,
    tasks: Vec<Task>,
    active: Active<V>,
    split_pending: bool,
}

impl<V: SortValue> Spread<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let split_pending = buf.iter().any(|v| v.key() < 0);
        let tasks = if split_pending {
            Vec::new()
        } else {
            vec![Task::Segment(0..buf.len())]
        };
        Self {
            buf,
            tasks,
            active: Active::Idle,
            split_pending,
        }
    }

    /// Moves negative magnitudes to the front and non-negatives behind them,
    /// as one write step.
    fn split_signs(&mut self, out: &mut Emitter<V>) {
        let mut negatives = Vec::new();
        let mut rest = Vec::new();
        for (from, value) in self.buf.iter().copied().enumerate() {
            if value.key() < 0 {
                negatives.push((value.with_key(!value.key()), from));
            } else {
                rest.push((value, from));
            }
        }

        let k = negatives.len();
        let mut changed = Vec::new();
        for (at, (value, from)) in negatives.into_iter().chain(rest).enumerate() {
            if at < k || from != at {
                changed.push(at);
            }
            self.buf[at] = value;
        }
        out.swap(&self.buf, &changed);

        let n = self.buf.len();
        self.tasks.push(Task::Segment(k..n));
        self.tasks.push(Task::Restore(k));
        self.tasks.push(Task::Segment(0..k));
    }

    fn begin(&self, range: Range<usize>) -> Active<V> {
        let size = range.len();
        if size == 0 {
            return Active::Idle;
        }
        if size <= SMALL_SEGMENT {
            return insert(range);
        }

        let keys = self.buf[range.clone()].iter().map(SortValue::key);
        let (min, max) = keys.fold((i64::MAX, i64::MIN), |(lo, hi), k| (lo.min(k), hi.max(k)));
        let spread = (i128::from(max) - i128::from(min)) as u128;
        if spread < size as u128 {
            return insert(range);
        }

        let bucket_count = floor_sqrt(size).clamp(2, MAX_BUCKETS);
        let significant = u128::BITS - spread.leading_zeros();
        let shift = significant.saturating_sub(floor_log2(bucket_count));
        Active::Scatter {
            range,
            min,
            shift,
            i: 0,
            buckets: vec![Vec::new(); bucket_count],
        }
    }
}

fn insert<V: SortValue>(range: Range<usize>) -> Active<V> {
    Active::Insert {
        run: InsertionRun::new(range.clone(), 1),
        range,
    }
}

impl<V: SortValue> Procedure<V> for Spread<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if self.split_pending {
            self.split_pending = false;
            self.split_signs(out);
            return true;
        }

        let active = mem::replace(&mut self.active, Active::Idle);
        self.active = match active {
            Active::Idle => match self.tasks.pop() {
                None => return false,
                Some(Task::Segment(range)) => self.begin(range),
                Some(Task::Restore(k)) => Active::Restore {
                    magnitudes: self.buf[..k].to_vec(),
                    i: 0,
                },
            },
            Active::Insert { mut run, range } => {
                if run.advance(&mut self.buf, out) {
                    Active::Insert { run, range }
                } else {
                    out.settle_range(range);
                    Active::Idle
                }
            }
            Active::Scatter {
                range,
                min,
                shift,
                i,
                mut buckets,
            } => {
                let at = range.start + i;
                if at < range.end {
                    let value = self.buf[at];
                    let offset = (i128::from(value.key()) - i128::from(min)) as u128;
                    let slot = usize::try_from(offset >> shift).unwrap_or(usize::MAX);
                    let last = buckets.len() - 1;
                    buckets[slot.min(last)].push((value, at));
                    out.compare(&self.buf, &[at]);
                    Active::Scatter {
                        range,
                        min,
                        shift,
                        i: i + 1,
                        buckets,
                    }
                } else {
                    let mut bounds = Vec::new();
                    let mut start = range.start;
                    for bucket in &buckets {
                        if !bucket.is_empty() {
                            bounds.push(start..start + bucket.len());
                            start += bucket.len();
                        }
                    }
                    Active::Gather {
                        range,
                        items: buckets.into_iter().flatten().collect(),
                        bounds,
                        i: 0,
                    }
                }
            }
            Active::Gather {
                range,
                items,
                bounds,
                i,
            } => {
                if let Some(&(value, from)) = items.get(i) {
                    let at = range.start + i;
                    self.buf[at] = value;
                    if from != at {
                        out.swap(&self.buf, &[at]);
                    }
                    Active::Gather {
                        range,
                        items,
                        bounds,
                        i: i + 1,
                    }
                } else {
                    for bucket in bounds.into_iter().rev() {
                        if bucket.len() == 1 {
                            out.settle(bucket.start);
                        } else {
                            self.tasks.push(Task::Segment(bucket));
                        }
                    }
                    Active::Idle
                }
            }
            Active::Restore { magnitudes, i } => {
                if let Some(magnitude) = magnitudes.len().checked_sub(i + 1).map(|j| magnitudes[j]) {
                    self.buf[i] = magnitude.with_key(!magnitude.key());
                    out.settle(i);
                    out.swap(&self.buf, &[i]);
                    Active::Restore { magnitudes, i: i + 1 }
                } else {
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
