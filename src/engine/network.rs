//! Bitonic sorting networks.
//!
//! Both variants pad the buffer to the next power of two with a sentinel one
//! above the largest key and drop it again before the terminal step, so
//! intermediate snapshots may be longer than the input.

use super::emit::Emitter;
use super::Procedure;
use crate::step::SortValue;

/// A buffer padded to a power-of-two length.
///
/// Padding slots are tracked by flag and order after every real element,
/// so a sentinel that saturates to an equal key never displaces one.
struct Padded<V> {
    values: Vec<V>,
    padding: Vec<bool>,
}

impl<V: SortValue> Padded<V> {
    fn new(mut values: Vec<V>) -> Self {
        let n = values.len();
        let size = n.next_power_of_two();
        if let Some(max) = values.iter().copied().max_by_key(SortValue::key) {
            let sentinel = max.with_key(max.key().saturating_add(1));
            values.resize(size, sentinel);
        }
        let mut padding = vec![false; n];
        padding.resize(values.len(), true);
        Self { values, padding }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn rank(&self, i: usize) -> (i64, bool) {
        (self.values[i].key(), self.padding[i])
    }

    /// Swaps `a` and `b` if they are out of order for the given direction.
    fn order(&mut self, a: usize, b: usize, ascending: bool) -> bool {
        let (ra, rb) = (self.rank(a), self.rank(b));
        if (ascending && ra > rb) || (!ascending && ra < rb) {
            self.values.swap(a, b);
            self.padding.swap(a, b);
            true
        } else {
            false
        }
    }

    fn into_values(self) -> Vec<V> {
        self.values
            .into_iter()
            .zip(self.padding)
            .filter_map(|(value, pad)| (!pad).then_some(value))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Sort { low: usize, count: usize, ascending: bool },
    Merge { low: usize, count: usize, ascending: bool },
}

#[derive(Debug, Clone, Copy)]
struct Pairs {
    i: usize,
    end: usize,
    k: usize,
    ascending: bool,
}

/// Recursive bitonic network, one step per comparator.
pub(crate) struct Bitonic<V> {
    buf: Padded<V>,
    tasks: Vec<Task>,
    pairs: Option<Pairs>,
}

impl<V: SortValue> Bitonic<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let buf = Padded::new(buf);
        let tasks = vec![Task::Sort {
            low: 0,
            count: buf.len(),
            ascending: true,
        }];
        Self {
            buf,
            tasks,
            pairs: None,
        }
    }
}

impl<V: SortValue> Procedure<V> for Bitonic<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if let Some(pairs) = self.pairs.as_mut() {
            if pairs.i < pairs.end {
                let (a, b) = (pairs.i, pairs.i + pairs.k);
                out.compare(&self.buf.values, &[a, b]);
                if self.buf.order(a, b, pairs.ascending) {
                    out.swap(&self.buf.values, &[a, b]);
                }
                pairs.i += 1;
                return true;
            }
            self.pairs = None;
        }

        let Some(task) = self.tasks.pop() else {
            return false;
        };
        match task {
            Task::Sort { low, count, ascending } if count > 1 => {
                let k = count / 2;
                self.tasks.push(Task::Merge { low, count, ascending });
                self.tasks.push(Task::Sort {
                    low: low + k,
                    count: k,
                    ascending: false,
                });
                self.tasks.push(Task::Sort {
                    low,
                    count: k,
                    ascending: true,
                });
            }
            Task::Merge { low, count, ascending } if count > 1 => {
                let k = count / 2;
                self.tasks.push(Task::Merge {
                    low: low + k,
                    count: k,
                    ascending,
                });
                self.tasks.push(Task::Merge { low, count: k, ascending });
                self.pairs = Some(Pairs {
                    i: low,
                    end: low + k,
                    k,
                    ascending,
                });
            }
            Task::Sort { .. } | Task::Merge { .. } => {}
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf.into_values()
    }
}

/// Iterative bitonic network where every comparator of one stage is reported
/// in a single step, as if the stage ran in parallel.
pub(crate) struct BitonicStages<V> {
    buf: Padded<V>,
    /// Size of the bitonic sequences being merged.
    k: usize,
    /// Comparator distance within the current merge.
    j: usize,
}

impl<V: SortValue> BitonicStages<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self {
            buf: Padded::new(buf),
            k: 2,
            j: 1,
        }
    }
}

impl<V: SortValue> Procedure<V> for BitonicStages<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let size = self.buf.len();
        if self.k > size {
            return false;
        }
        let (k, j) = (self.k, self.j);

        let mut comparing = Vec::with_capacity(size);
        let mut swapping = Vec::new();
        for i in 0..size {
            let partner = i ^ j;
            if partner > i {
                comparing.push(i);
                comparing.push(partner);
            }
        }
        out.compare(&self.buf.values, &comparing);

        for pair in comparing.chunks_exact(2) {
            let (a, b) = (pair[0], pair[1]);
            if self.buf.order(a, b, a & k == 0) {
                swapping.push(a);
                swapping.push(b);
            }
        }
        if !swapping.is_empty() {
            out.swap(&self.buf.values, &swapping);
        }

        if j > 1 {
            self.j = j / 2;
        } else {
            self.k = k * 2;
            self.j = k;
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf.into_values()
    }
}
