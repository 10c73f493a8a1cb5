//! Insertion family: insertion, shell, the Leonardo-gap smooth pass, library.

use super::emit::Emitter;
use super::kernels::InsertionRun;
use super::Procedure;
use crate::step::SortValue;

pub(crate) struct Insertion<V> {
    buf: Vec<V>,
    run: InsertionRun<V>,
}

impl<V: SortValue> Insertion<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let run = InsertionRun::new(0..buf.len(), 1).settling_prefix();
        Self { buf, run }
    }
}

impl<V: SortValue> Procedure<V> for Insertion<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        self.run.advance(&mut self.buf, out)
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Gapped insertion passes over a fixed, descending gap sequence.
pub(crate) struct Gapped<V> {
    buf: Vec<V>,
    /// Remaining gaps, smallest first so the next one is popped off the end.
    gaps: Vec<usize>,
    run: Option<InsertionRun<V>>,
}

impl<V: SortValue> Gapped<V> {
    /// Shell's original sequence: n/2, n/4, ..., 1.
    pub(crate) fn shell(buf: Vec<V>) -> Self {
        let mut gaps = Vec::new();
        let mut gap = buf.len() / 2;
        while gap > 0 {
            gaps.push(gap);
            gap /= 2;
        }
        gaps.reverse();
        Self::with_gaps(buf, gaps)
    }

    /// Leonardo numbers below n, largest first.
    pub(crate) fn leonardo(buf: Vec<V>) -> Self {
        let gaps = leonardo_gaps(buf.len());
        Self::with_gaps(buf, gaps)
    }

    fn with_gaps(buf: Vec<V>, gaps: Vec<usize>) -> Self {
        Self {
            buf,
            gaps,
            run: None,
        }
    }
}

impl<V: SortValue> Procedure<V> for Gapped<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if let Some(run) = self.run.as_mut() {
            if run.advance(&mut self.buf, out) {
                return true;
            }
            self.run = None;
        }
        match self.gaps.pop() {
            Some(gap) => {
                self.run = Some(InsertionRun::new(0..self.buf.len(), gap));
                true
            }
            None => false,
        }
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Distinct Leonardo numbers `< n`, ascending.
fn leonardo_gaps(n: usize) -> Vec<usize> {
    let (mut prev, mut cur) = (1_usize, 1_usize);
    let mut gaps = Vec::new();
    while cur < n {
        if gaps.last() != Some(&cur) {
            gaps.push(cur);
        }
        let next = prev + cur + 1;
        prev = cur;
        cur = next;
    }
    gaps
}

/// Binary insertion into a growing ordered buffer.
///
/// The visible array is the ordered buffer followed by the not yet consumed
/// tail of the input, so its length never changes.
pub(crate) struct Library<V> {
    input: Vec<V>,
    placed: Vec<V>,
    i: usize,
    left: usize,
    right: usize,
}

impl<V: SortValue> Library<V> {
    pub(crate) fn new(input: Vec<V>) -> Self {
        let n = input.len();
        Self {
            input,
            placed: Vec::with_capacity(n),
            i: 0,
            left: 0,
            right: 0,
        }
    }

    fn visual(&self, consumed: usize) -> Vec<V> {
        let mut view = Vec::with_capacity(self.input.len());
        view.extend_from_slice(&self.placed);
        view.extend_from_slice(&self.input[consumed..]);
        view
    }
}

impl<V: SortValue> Procedure<V> for Library<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if self.i >= self.input.len() {
            return false;
        }
        let value = self.input[self.i];

        if self.left < self.right {
            let mid = self.left + (self.right - self.left) / 2;
            out.compare_snapshot(self.visual(self.i), &[mid, self.placed.len()]);
            // upper bound keeps equal keys in arrival order
            if self.placed[mid].key() <= value.key() {
                self.left = mid + 1;
            } else {
                self.right = mid;
            }
            return true;
        }

        let at = self.left;
        self.placed.insert(at, value);
        self.i += 1;
        out.settle_range(0..self.placed.len());
        out.swap_snapshot(self.visual(self.i), &[at]);
        self.left = 0;
        self.right = self.placed.len();
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.placed
    }
}

#[cfg(test)]
mod tests {
    use super::leonardo_gaps;
    use crate::engine::Algorithm;
    use crate::step::Step;

    fn run(algorithm: Algorithm, input: &[i64]) -> Vec<Step> {
        algorithm.trace(input).collect()
    }

    #[test]
    fn insertion_scenario_five_three_eight_one() {
        let steps = run(Algorithm::Insertion, &[5, 3, 8, 1]);
        let last = steps.last().unwrap();
        assert_eq!(last.array, vec![1, 3, 5, 8]);
        assert_eq!(last.sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn insertion_shift_is_compare_then_write() {
        let steps = run(Algorithm::Insertion, &[2, 1]);
        assert_eq!(steps[0].comparing, vec![0, 1]);
        assert_eq!(steps[1].swapping, vec![0, 1]);
        assert_eq!(steps[1].array, vec![2, 2]);
        assert_eq!(steps[2].swapping, vec![0]);
        assert_eq!(steps[2].array, vec![1, 2]);
    }

    #[test]
    fn leonardo_gaps_below_length() {
        assert_eq!(leonardo_gaps(2), vec![1]);
        assert_eq!(leonardo_gaps(10), vec![1, 3, 5, 9]);
        assert_eq!(leonardo_gaps(16), vec![1, 3, 5, 9, 15]);
    }

    #[test]
    fn shell_starts_with_half_gap() {
        let steps = run(Algorithm::Shell, &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(steps[0].comparing, vec![0, 4]);
        assert_eq!(steps.last().unwrap().array, (1..=8).collect::<Vec<i64>>());
    }

    #[test]
    fn smooth_starts_with_largest_leonardo_gap() {
        let steps = run(Algorithm::Smooth, &[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
        assert_eq!(steps[0].comparing, vec![0, 9]);
        assert_eq!(steps.last().unwrap().array, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn library_view_keeps_input_length() {
        let input = [4, 1, 3, 2, 2];
        let steps = run(Algorithm::Library, &input);
        assert!(steps.iter().all(|s| s.len() == input.len()));
        assert_eq!(steps.last().unwrap().array, vec![1, 2, 2, 3, 4]);
    }

    #[test]
    fn library_grows_settled_prefix() {
        let steps = run(Algorithm::Library, &[3, 1, 2]);
        let sizes: Vec<usize> = steps.iter().map(|s| s.sorted.len()).collect();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        // first element lands without a search
        assert_eq!(steps[0].swapping, vec![0]);
        assert_eq!(steps[0].sorted, vec![0]);
    }
}
