//! Selection family: selection, heap, cycle, pancake, tournament.
//!
//! Each of these repeatedly locates an extreme element of the unsorted region
//! and moves it into its final place, which is settled immediately.

use std::mem;

use super::emit::Emitter;
use super::kernels::{HeapRun, Reversal};
use super::Procedure;
use crate::step::SortValue;

pub(crate) struct Selection<V> {
    buf: Vec<V>,
    i: usize,
    min: usize,
    j: usize,
}

impl<V: SortValue> Selection<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self {
            buf,
            i: 0,
            min: 0,
            j: 1,
        }
    }
}

impl<V: SortValue> Procedure<V> for Selection<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        if self.i + 1 >= n {
            return false;
        }
        if self.j < n {
            out.compare(&self.buf, &[self.min, self.j]);
            if self.buf[self.j].key() < self.buf[self.min].key() {
                self.min = self.j;
            }
            self.j += 1;
            return true;
        }

        out.settle(self.i);
        if self.min == self.i {
            out.plain(&self.buf);
        } else {
            self.buf.swap(self.i, self.min);
            out.swap(&self.buf, &[self.i, self.min]);
        }
        self.i += 1;
        self.min = self.i;
        self.j = self.i + 1;
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

pub(crate) struct Heap<V> {
    buf: Vec<V>,
    run: HeapRun,
}

impl<V: SortValue> Heap<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let run = HeapRun::new(0..buf.len());
        Self { buf, run }
    }
}

impl<V: SortValue> Procedure<V> for Heap<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        self.run.advance(&mut self.buf, out)
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

#[derive(Debug, Clone, Copy)]
enum CyclePhase {
    Begin,
    Scan { i: usize, first: bool },
    Place { first: bool },
}

/// Write-minimizing cycle sort.
pub(crate) struct Cycle<V> {
    buf: Vec<V>,
    start: usize,
    item: Option<V>,
    pos: usize,
    phase: CyclePhase,
}

impl<V: SortValue> Cycle<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self {
            buf,
            start: 0,
            item: None,
            pos: 0,
            phase: CyclePhase::Begin,
        }
    }

    fn close_cycle(&mut self, out: &mut Emitter<V>) {
        out.settle(self.start);
        self.start += 1;
        self.item = None;
        self.phase = CyclePhase::Begin;
    }
}

impl<V: SortValue> Procedure<V> for Cycle<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        match self.phase {
            CyclePhase::Begin => {
                if self.start + 1 >= n {
                    return false;
                }
                out.settle_range(0..self.start);
                self.item = Some(self.buf[self.start]);
                self.pos = self.start;
                self.phase = CyclePhase::Scan {
                    i: self.start + 1,
                    first: true,
                };
            }
            CyclePhase::Scan { i, first } => {
                let Some(item) = self.item else {
                    self.close_cycle(out);
                    return true;
                };
                if i < n {
                    out.compare(&self.buf, &[i, self.start]);
                    if self.buf[i].key() < item.key() {
                        self.pos += 1;
                    }
                    self.phase = CyclePhase::Scan { i: i + 1, first };
                } else {
                    self.phase = CyclePhase::Place { first };
                }
            }
            CyclePhase::Place { first } => {
                let Some(item) = self.item else {
                    self.close_cycle(out);
                    return true;
                };
                if first && self.pos == self.start {
                    self.close_cycle(out);
                    return true;
                }
                while self.pos + 1 < n && self.buf[self.pos].key() == item.key() {
                    self.pos += 1;
                }
                if self.buf[self.pos].key() != item.key() {
                    let displaced = mem::replace(&mut self.buf[self.pos], item);
                    self.item = Some(displaced);
                    out.swap(&self.buf, &[self.pos]);
                }
                if self.pos == self.start {
                    self.close_cycle(out);
                } else {
                    self.pos = self.start;
                    self.phase = CyclePhase::Scan {
                        i: self.start + 1,
                        first: false,
                    };
                }
            }
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

#[derive(Debug)]
enum PancakePhase {
    Scan { i: usize, max: usize },
    Flip { flip: Reversal, then: Option<usize> },
}

/// Prefix-flip sort.
pub(crate) struct Pancake<V> {
    buf: Vec<V>,
    size: usize,
    phase: PancakePhase,
}

impl<V: SortValue> Pancake<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let size = buf.len();
        Self {
            buf,
            size,
            phase: PancakePhase::Scan { i: 1, max: 0 },
        }
    }

    fn next_size(&mut self, out: &mut Emitter<V>) {
        out.settle(self.size - 1);
        self.size -= 1;
        self.phase = PancakePhase::Scan { i: 1, max: 0 };
    }
}

impl<V: SortValue> Procedure<V> for Pancake<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if self.size <= 1 {
            return false;
        }
        match &mut self.phase {
            PancakePhase::Scan { i, max } if *i < self.size => {
                out.compare(&self.buf, &[*i, *max]);
                if self.buf[*i].key() > self.buf[*max].key() {
                    *max = *i;
                }
                *i += 1;
            }
            PancakePhase::Scan { max, .. } => {
                let (max, last) = (*max, self.size - 1);
                if max == last {
                    self.next_size(out);
                } else if max > 0 {
                    self.phase = PancakePhase::Flip {
                        flip: Reversal::new(0..max + 1),
                        then: Some(last),
                    };
                } else {
                    self.phase = PancakePhase::Flip {
                        flip: Reversal::new(0..last + 1),
                        then: None,
                    };
                }
            }
            PancakePhase::Flip { flip, then } => {
                if !flip.advance(&mut self.buf, out) {
                    match then.take() {
                        Some(last) => {
                            self.phase = PancakePhase::Flip {
                                flip: Reversal::new(0..last + 1),
                                then: None,
                            };
                        }
                        None => self.next_size(out),
                    }
                }
            }
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Winner-tree selection: each extraction plays a full knockout over the
/// unsorted prefix and moves the champion to the end.
pub(crate) struct Tournament<V> {
    buf: Vec<V>,
    end: usize,
    round: Vec<usize>,
    next: Vec<usize>,
    i: usize,
}

impl<V: SortValue> Tournament<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let end = buf.len().saturating_sub(1);
        Self {
            buf,
            end,
            round: Vec::new(),
            next: Vec::new(),
            i: 0,
        }
    }
}

impl<V: SortValue> Procedure<V> for Tournament<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if self.round.is_empty() {
            if self.end == 0 {
                return false;
            }
            self.round = (0..=self.end).collect();
            self.next.clear();
            self.i = 0;
            return true;
        }

        if let [winner] = self.round[..] {
            if winner != self.end {
                self.buf.swap(winner, self.end);
                out.swap(&self.buf, &[winner, self.end]);
            }
            out.settle(self.end);
            self.end -= 1;
            self.round.clear();
            return true;
        }

        if self.i >= self.round.len() {
            self.round = mem::take(&mut self.next);
            self.i = 0;
            return true;
        }

        let left = self.round[self.i];
        match self.round.get(self.i + 1) {
            Some(&right) => {
                out.compare(&self.buf, &[left, right]);
                let champion = if self.buf[left].key() >= self.buf[right].key() {
                    left
                } else {
                    right
                };
                self.next.push(champion);
            }
            // odd contender advances without a match
            None => self.next.push(left),
        }
        self.i += 2;
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}
