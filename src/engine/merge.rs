//! Merge family: top-down merge sort, in-place block merge, simplified Tim sort.

use std::collections::VecDeque;
use std::mem;
use std::ops::Range;

use super::emit::Emitter;
use super::kernels::{InsertionRun, MergeRun, Reversal};
use super::Procedure;
use crate::step::SortValue;

/// Block merge hands segments at or below this length to insertion sort.
const BLOCK_SMALL: usize = 16;

/// Minimum run length parameter for Tim sort.
const MIN_MERGE: usize = 32;

#[derive(Debug, Clone)]
enum Task {
    Sort(Range<usize>),
    Merge { lo: usize, mid: usize, hi: usize },
}

/// Splits so the left half takes the extra element.
fn midpoint(range: &Range<usize>) -> usize {
    range.start + (range.len() + 1) / 2
}

/// Queues the halves of `range` followed by their merge, left half on top.
fn push_halves(tasks: &mut Vec<Task>, range: Range<usize>) {
    let mid = midpoint(&range);
    tasks.push(Task::Merge {
        lo: range.start,
        mid,
        hi: range.end,
    });
    tasks.push(Task::Sort(mid..range.end));
    tasks.push(Task::Sort(range.start..mid));
}

pub(crate) struct TopDown<V> {
    buf: Vec<V>,
    tasks: Vec<Task>,
    merging: Option<MergeRun<V>>,
}

impl<V: SortValue> TopDown<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let tasks = vec![Task::Sort(0..buf.len())];
        Self {
            buf,
            tasks,
            merging: None,
        }
    }
}

impl<V: SortValue> Procedure<V> for TopDown<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if let Some(run) = self.merging.as_mut() {
            if run.advance(&mut self.buf, out) {
                return true;
            }
            self.merging = None;
        }

        match self.tasks.pop() {
            None => false,
            Some(Task::Sort(range)) => {
                if range.len() > 1 {
                    push_halves(&mut self.tasks, range);
                }
                true
            }
            Some(Task::Merge { lo, mid, hi }) => {
                // only the outermost merge writes final positions
                let full = lo == 0 && hi == self.buf.len();
                self.merging = Some(MergeRun::new(&self.buf, lo, mid, hi).settling(full));
                true
            }
        }
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Rotation-based merge of `start1..start2` and `start2..hi` without an
/// auxiliary buffer.
#[derive(Debug)]
struct RotationMerge<V> {
    start1: usize,
    start2: usize,
    hi: usize,
    settle: bool,
    shifting: Option<(V, usize)>,
}

impl<V: SortValue> RotationMerge<V> {
    fn advance(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        if let Some((value, index)) = self.shifting {
            if index > self.start1 {
                buf[index] = buf[index - 1];
                out.swap(buf, &[index, index - 1]);
                self.shifting = Some((value, index - 1));
                return true;
            }
            buf[self.start1] = value;
            self.shifting = None;
            self.advance_left(out);
            out.swap(buf, &[self.start1 - 1]);
            self.start2 += 1;
            return true;
        }

        if self.start1 >= self.start2 || self.start2 >= self.hi {
            if self.settle {
                out.settle_range(self.start1..self.hi);
            }
            return false;
        }

        out.compare(buf, &[self.start1, self.start2]);
        if buf[self.start1].key() <= buf[self.start2].key() {
            self.advance_left(out);
        } else {
            self.shifting = Some((buf[self.start2], self.start2));
        }
        true
    }

    fn advance_left(&mut self, out: &mut Emitter<V>) {
        if self.settle {
            out.settle(self.start1);
        }
        self.start1 += 1;
    }
}

enum BlockActive<V> {
    Idle,
    Insert(InsertionRun<V>),
    Merge(RotationMerge<V>),
}

/// In-place stable merge sort.
pub(crate) struct Block<V> {
    buf: Vec<V>,
    tasks: Vec<Task>,
    active: BlockActive<V>,
}

impl<V: SortValue> Block<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let tasks = vec![Task::Sort(0..buf.len())];
        Self {
            buf,
            tasks,
            active: BlockActive::Idle,
        }
    }
}

impl<V: SortValue> Procedure<V> for Block<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let still_running = match &mut self.active {
            BlockActive::Idle => false,
            BlockActive::Insert(run) => run.advance(&mut self.buf, out),
            BlockActive::Merge(run) => run.advance(&mut self.buf, out),
        };
        if still_running {
            return true;
        }
        self.active = BlockActive::Idle;

        match self.tasks.pop() {
            None => false,
            Some(Task::Sort(range)) => {
                if range.len() <= BLOCK_SMALL {
                    self.active = BlockActive::Insert(InsertionRun::new(range, 1));
                } else {
                    push_halves(&mut self.tasks, range);
                }
                true
            }
            Some(Task::Merge { lo, mid, hi }) => {
                let full = lo == 0 && hi == self.buf.len();
                // halves already in order at the boundary
                if self.buf[mid - 1].key() <= self.buf[mid].key() {
                    if full {
                        out.settle_range(lo..hi);
                    }
                    return true;
                }
                self.active = BlockActive::Merge(RotationMerge {
                    start1: lo,
                    start2: mid,
                    hi,
                    settle: full,
                    shifting: None,
                });
                true
            }
        }
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// CPython-style minimum run length.
fn min_run(mut n: usize) -> usize {
    let mut r = 0;
    while n >= MIN_MERGE {
        r |= n & 1;
        n >>= 1;
    }
    n + r
}

/// Extends a sorted prefix `start..j` up to `target` by binary insertion.
#[derive(Debug)]
struct BinaryExtension<V> {
    start: usize,
    j: usize,
    target: usize,
    current: Option<Insertion<V>>,
}

#[derive(Debug, Clone, Copy)]
struct Insertion<V> {
    value: V,
    left: usize,
    right: usize,
    shift: Option<usize>,
}

impl<V: SortValue> BinaryExtension<V> {
    fn advance(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        let Some(ins) = self.current.as_mut() else {
            if self.j >= self.target {
                return false;
            }
            self.current = Some(Insertion {
                value: buf[self.j],
                left: self.start,
                right: self.j,
                shift: None,
            });
            return true;
        };

        if let Some(index) = ins.shift {
            if index > ins.left {
                buf[index] = buf[index - 1];
                out.swap(buf, &[index - 1, index]);
                ins.shift = Some(index - 1);
                return true;
            }
            if ins.left != self.j {
                buf[ins.left] = ins.value;
                out.swap(buf, &[ins.left]);
            }
            self.current = None;
            self.j += 1;
            return true;
        }

        if ins.left < ins.right {
            let mid = ins.left + (ins.right - ins.left) / 2;
            out.compare(buf, &[mid, self.j]);
            if buf[mid].key() <= ins.value.key() {
                ins.left = mid + 1;
            } else {
                ins.right = mid;
            }
        } else {
            ins.shift = Some(self.j);
        }
        true
    }
}

enum TimPhase<V> {
    Scan,
    Reverse {
        run: Reversal,
        start: usize,
        end: usize,
    },
    Extend(BinaryExtension<V>),
    Merge(MergeRun<V>),
}

/// Simplified Tim sort: natural runs, binary-insertion extension, FIFO merges.
pub(crate) struct Tim<V> {
    buf: Vec<V>,
    min_run: usize,
    cursor: usize,
    runs: VecDeque<Range<usize>>,
    phase: TimPhase<V>,
}

impl<V: SortValue> Tim<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let min_run = min_run(buf.len());
        Self {
            buf,
            min_run,
            cursor: 0,
            runs: VecDeque::new(),
            phase: TimPhase::Scan,
        }
    }

    fn extend(&self, start: usize, end: usize) -> TimPhase<V> {
        let target = self.buf.len().min(start + (end - start).max(self.min_run));
        TimPhase::Extend(BinaryExtension {
            start,
            j: end,
            target,
            current: None,
        })
    }

    /// Starts the next FIFO merge, or reports that one run remains.
    fn next_merge(&mut self) -> Option<TimPhase<V>> {
        if self.runs.len() < 2 {
            return None;
        }
        let first = self.runs.pop_front()?;
        let second = self.runs.pop_front()?;
        self.runs.push_front(first.start..second.end);
        let full = first.start == 0 && second.end == self.buf.len();
        Some(TimPhase::Merge(
            MergeRun::new(&self.buf, first.start, second.start, second.end).settling(full),
        ))
    }
}

impl<V: SortValue> Procedure<V> for Tim<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        let phase = mem::replace(&mut self.phase, TimPhase::Scan);
        self.phase = match phase {
            TimPhase::Scan => {
                if self.cursor >= n {
                    match self.next_merge() {
                        Some(merge) => merge,
                        None => return false,
                    }
                } else {
                    let start = self.cursor;
                    let mut end = start + 1;
                    let descending = end < n && self.buf[end].key() < self.buf[end - 1].key();
                    if descending {
                        while end < n && self.buf[end].key() < self.buf[end - 1].key() {
                            end += 1;
                        }
                        TimPhase::Reverse {
                            run: Reversal::new(start..end),
                            start,
                            end,
                        }
                    } else {
                        while end < n && self.buf[end].key() >= self.buf[end - 1].key() {
                            end += 1;
                        }
                        self.extend(start, end)
                    }
                }
            }
            TimPhase::Reverse { mut run, start, end } => {
                if run.advance(&mut self.buf, out) {
                    TimPhase::Reverse { run, start, end }
                } else {
                    self.extend(start, end)
                }
            }
            TimPhase::Extend(mut ext) => {
                if ext.advance(&mut self.buf, out) {
                    TimPhase::Extend(ext)
                } else {
                    self.runs.push_back(ext.start..ext.target);
                    self.cursor = ext.target;
                    TimPhase::Scan
                }
            }
            TimPhase::Merge(mut run) => {
                if run.advance(&mut self.buf, out) {
                    TimPhase::Merge(run)
                } else {
                    TimPhase::Scan
                }
            }
        };
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}
