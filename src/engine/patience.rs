//! Patience sort: deal into piles by binary search, then merge the pile tops
//! through a min-heap keyed by `(key, input index)`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::emit::Emitter;
use super::Procedure;
use crate::step::SortValue;

#[derive(Debug, Clone, Copy)]
struct Card<V> {
    value: V,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct Search {
    left: usize,
    right: usize,
}

pub(crate) struct Patience<V> {
    buf: Vec<V>,
    piles: Vec<Vec<Card<V>>>,
    /// Card being dealt and its pile search, if dealing.
    deal: usize,
    search: Option<Search>,
    /// `(key, input index, pile)` of every pile top.
    tops: BinaryHeap<Reverse<(i64, usize, usize)>>,
    write: usize,
    merging: bool,
}

impl<V: SortValue> Patience<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self {
            buf,
            piles: Vec::new(),
            deal: 0,
            search: None,
            tops: BinaryHeap::new(),
            write: 0,
            merging: false,
        }
    }

    fn push_top(&mut self, pile: usize) {
        if let Some(card) = self.piles[pile].last() {
            self.tops.push(Reverse((card.value.key(), card.index, pile)));
        }
    }

    fn deal_one(&mut self, out: &mut Emitter<V>) {
        let i = self.deal;
        let value = self.buf[i];
        let search = self.search.get_or_insert(Search {
            left: 0,
            right: self.piles.len(),
        });

        if search.left < search.right {
            let mid = search.left + (search.right - search.left) / 2;
            let Some(top) = self.piles[mid].last() else {
                search.right = mid;
                return;
            };
            out.compare(&self.buf, &[i, top.index]);
            // equal keys go to a later pile so no pile buries an earlier equal key
            if value.key() < top.value.key() {
                search.right = mid;
            } else {
                search.left = mid + 1;
            }
            return;
        }

        let pile = search.left;
        self.search = None;
        let card = Card { value, index: i };
        match self.piles.get_mut(pile) {
            Some(stack) => stack.push(card),
            None => self.piles.push(vec![card]),
        }
        out.swap(&self.buf, &[i]);
        self.deal += 1;
    }
}

impl<V: SortValue> Procedure<V> for Patience<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        if !self.merging {
            if self.deal < n {
                self.deal_one(out);
                return true;
            }
            for pile in 0..self.piles.len() {
                self.push_top(pile);
            }
            self.merging = true;
            return true;
        }

        if self.write >= n {
            return false;
        }
        let Some(Reverse((_, index, pile))) = self.tops.pop() else {
            return false;
        };
        out.compare(&self.buf, &[self.write, index]);
        let Some(card) = self.piles[pile].pop() else {
            return false;
        };
        self.buf[self.write] = card.value;
        out.settle(self.write);
        out.swap(&self.buf, &[self.write]);
        self.write += 1;
        self.push_top(pile);
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}
