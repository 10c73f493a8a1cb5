//! Compare-exchange sorts: bubble, cocktail shaker, odd-even, comb, gnome.
//!
//! One unit of work is one comparison plus the exchange it may trigger.

use super::emit::Emitter;
use super::Procedure;
use crate::step::SortValue;

/// Compares `buf[a]` against `buf[b]` (`a < b`) and swaps them if out of order.
fn exchange<V: SortValue>(buf: &mut [V], out: &mut Emitter<V>, a: usize, b: usize) -> bool {
    out.compare(buf, &[a, b]);
    if buf[a].key() > buf[b].key() {
        buf.swap(a, b);
        out.swap(buf, &[a, b]);
        true
    } else {
        false
    }
}

pub(crate) struct Bubble<V> {
    buf: Vec<V>,
    pass: usize,
    j: usize,
}

impl<V: SortValue> Bubble<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self { buf, pass: 0, j: 0 }
    }
}

impl<V: SortValue> Procedure<V> for Bubble<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        if self.pass + 1 >= n {
            return false;
        }
        if self.j + 1 >= n - self.pass {
            // the pass carried its maximum to the end of the unsorted region
            out.settle(n - 1 - self.pass);
            self.pass += 1;
            self.j = 0;
            return true;
        }
        exchange(&mut self.buf, out, self.j, self.j + 1);
        self.j += 1;
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

#[derive(Debug, Clone, Copy)]
enum Sweep {
    Forward(usize),
    Backward(usize),
}

pub(crate) struct Cocktail<V> {
    buf: Vec<V>,
    start: usize,
    end: usize,
    swapped: bool,
    sweep: Sweep,
    done: bool,
}

impl<V: SortValue> Cocktail<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let end = buf.len().saturating_sub(1);
        Self {
            buf,
            start: 0,
            end,
            swapped: false,
            sweep: Sweep::Forward(0),
            done: false,
        }
    }
}

impl<V: SortValue> Procedure<V> for Cocktail<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if self.done {
            return false;
        }
        match self.sweep {
            Sweep::Forward(i) if i < self.end => {
                self.swapped |= exchange(&mut self.buf, out, i, i + 1);
                self.sweep = Sweep::Forward(i + 1);
            }
            Sweep::Forward(_) => {
                if !self.swapped {
                    self.done = true;
                    return false;
                }
                out.settle(self.end);
                self.swapped = false;
                self.end -= 1;
                self.sweep = Sweep::Backward(self.end);
            }
            Sweep::Backward(i) if i > self.start => {
                self.swapped |= exchange(&mut self.buf, out, i - 1, i);
                self.sweep = Sweep::Backward(i - 1);
            }
            Sweep::Backward(_) => {
                if !self.swapped {
                    self.done = true;
                    return false;
                }
                out.settle(self.start);
                self.swapped = false;
                self.start += 1;
                self.sweep = Sweep::Forward(self.start);
            }
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Alternating even-indexed and odd-indexed pair passes.
pub(crate) struct OddEven<V> {
    buf: Vec<V>,
    i: usize,
    clean: bool,
}

impl<V: SortValue> OddEven<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self {
            buf,
            i: 0,
            clean: true,
        }
    }
}

impl<V: SortValue> Procedure<V> for OddEven<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        if self.i + 1 < n {
            if exchange(&mut self.buf, out, self.i, self.i + 1) {
                self.clean = false;
            }
            self.i += 2;
            return true;
        }
        if self.i % 2 == 0 {
            self.i = 1;
            return true;
        }
        // a full even+odd round without exchanges means sorted
        if self.clean {
            return false;
        }
        self.clean = true;
        self.i = 0;
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

pub(crate) struct Comb<V> {
    buf: Vec<V>,
    gap: usize,
    i: usize,
    swapped: bool,
}

impl<V: SortValue> Comb<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let gap = buf.len();
        Self {
            buf,
            gap,
            // forces the first shrink
            i: usize::MAX,
            swapped: true,
        }
    }
}

impl<V: SortValue> Procedure<V> for Comb<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        if self.i.saturating_add(self.gap) >= n {
            if self.gap <= 1 && !self.swapped {
                return false;
            }
            // shrink factor 1.3
            self.gap = (self.gap * 10 / 13).max(1);
            self.swapped = false;
            self.i = 0;
            return true;
        }
        let j = self.i + self.gap;
        self.swapped |= exchange(&mut self.buf, out, self.i, j);
        self.i += 1;
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

pub(crate) struct Gnome<V> {
    buf: Vec<V>,
    index: usize,
}

impl<V: SortValue> Gnome<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self { buf, index: 1 }
    }
}

impl<V: SortValue> Procedure<V> for Gnome<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if self.index >= self.buf.len() {
            return false;
        }
        if exchange(&mut self.buf, out, self.index - 1, self.index) {
            self.index = (self.index - 1).max(1);
        } else {
            self.index += 1;
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}
