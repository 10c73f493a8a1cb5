//! Distribution sorts: counting, bucket, sleep and the radix variants.
//!
//! These read each element once per pass (a single-index comparison step) and
//! then write a whole pass back. Radix write-backs are reported as one step
//! listing every position whose occupant changed.

use std::collections::BTreeMap;
use std::ops::Range;

use tracing::trace;

use super::emit::Emitter;
use super::kernels::floor_sqrt;
use super::Procedure;
use crate::step::SortValue;

/// Stable counting sort over the keys that actually occur.
pub(crate) struct Counting<V> {
    buf: Vec<V>,
    original: Vec<V>,
    counts: BTreeMap<i64, usize>,
    /// Exclusive end position for each key once counting is done.
    ends: BTreeMap<i64, usize>,
    i: usize,
    placing: Option<usize>,
}

impl<V: SortValue> Counting<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let original = buf.clone();
        Self {
            buf,
            original,
            counts: BTreeMap::new(),
            ends: BTreeMap::new(),
            i: 0,
            placing: None,
        }
    }
}

impl<V: SortValue> Procedure<V> for Counting<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        match self.placing {
            None if self.i < n => {
                out.compare(&self.buf, &[self.i]);
                *self.counts.entry(self.original[self.i].key()).or_insert(0) += 1;
                self.i += 1;
            }
            None => {
                let mut total = 0;
                for (key, count) in &self.counts {
                    total += count;
                    self.ends.insert(*key, total);
                }
                self.placing = Some(n);
            }
            Some(0) => return false,
            Some(i) => {
                let value = self.original[i - 1];
                let Some(end) = self.ends.get_mut(&value.key()) else {
                    return false;
                };
                *end -= 1;
                let position = *end;
                self.buf[position] = value;
                out.swap(&self.buf, &[position]);
                self.placing = Some(i - 1);
            }
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Bucket index of `key` among `count` equal-width buckets over `min..=max`.
fn bucket_of(key: i64, min: i64, max: i64, count: usize) -> usize {
    let range = (i128::from(max) - i128::from(min)).max(1);
    let offset = i128::from(key) - i128::from(min);
    let slot = offset * count as i128 / range;
    usize::try_from(slot).map_or(count - 1, |slot| slot.min(count - 1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketPhase {
    Scatter,
    Gather,
}

/// floor(sqrt(n)) equal-width buckets, each sorted silently before
/// the write-back.
pub(crate) struct Bucket<V> {
    buf: Vec<V>,
    min: i64,
    max: i64,
    buckets: Vec<Vec<V>>,
    gathered: Vec<V>,
    i: usize,
    phase: BucketPhase,
}

impl<V: SortValue> Bucket<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let min = buf.iter().map(SortValue::key).min().unwrap_or(0);
        let max = buf.iter().map(SortValue::key).max().unwrap_or(0);
        let count = floor_sqrt(buf.len()).max(1);
        Self {
            buf,
            min,
            max,
            buckets: vec![Vec::new(); count],
            gathered: Vec::new(),
            i: 0,
            phase: BucketPhase::Scatter,
        }
    }
}

impl<V: SortValue> Procedure<V> for Bucket<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        match self.phase {
            BucketPhase::Scatter if self.i < n => {
                let value = self.buf[self.i];
                let slot = bucket_of(value.key(), self.min, self.max, self.buckets.len());
                self.buckets[slot].push(value);
                out.compare(&self.buf, &[self.i]);
                self.i += 1;
            }
            BucketPhase::Scatter => {
                for bucket in &mut self.buckets {
                    bucket.sort_by_key(SortValue::key);
                }
                self.gathered = self.buckets.drain(..).flatten().collect();
                self.phase = BucketPhase::Gather;
                self.i = 0;
            }
            BucketPhase::Gather if self.i < n => {
                self.buf[self.i] = self.gathered[self.i];
                out.swap(&self.buf, &[self.i]);
                self.i += 1;
            }
            BucketPhase::Gather => return false,
        }
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// Schedules every element by key and releases them in ascending key order.
pub(crate) struct Sleep<V> {
    buf: Vec<V>,
    schedule: BTreeMap<i64, Vec<V>>,
    released: Vec<V>,
    i: usize,
    releasing: bool,
}

impl<V: SortValue> Sleep<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        Self {
            buf,
            schedule: BTreeMap::new(),
            released: Vec::new(),
            i: 0,
            releasing: false,
        }
    }
}

impl<V: SortValue> Procedure<V> for Sleep<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        let n = self.buf.len();
        if !self.releasing {
            if self.i < n {
                let value = self.buf[self.i];
                self.schedule.entry(value.key()).or_default().push(value);
                out.compare(&self.buf, &[self.i]);
                self.i += 1;
                return true;
            }
            self.released = std::mem::take(&mut self.schedule)
                .into_values()
                .flatten()
                .collect();
            self.releasing = true;
            self.i = 0;
            return true;
        }

        if self.i >= n {
            return false;
        }
        self.buf[self.i] = self.released[self.i];
        out.settle(self.i);
        out.swap(&self.buf, &[self.i]);
        self.i += 1;
        true
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

/// One stable distribution pass over `range` by digit `key / exp mod base`.
#[derive(Debug)]
struct DigitPass<V> {
    range: Range<usize>,
    exp: i64,
    base: i64,
    i: usize,
    buckets: Vec<Vec<(V, usize)>>,
    bounds: Vec<Range<usize>>,
}

impl<V: SortValue> DigitPass<V> {
    fn new(range: Range<usize>, exp: i64, base: i64) -> Self {
        let slots = usize::try_from(base).unwrap_or(1);
        Self {
            i: range.start,
            range,
            exp,
            base,
            buckets: vec![Vec::new(); slots],
            bounds: Vec::new(),
        }
    }

    fn digit(&self, key: i64) -> usize {
        // Euclidean division keeps negative keys in bounds
        let digit = key.div_euclid(self.exp).rem_euclid(self.base);
        usize::try_from(digit).unwrap_or(0)
    }

    /// Returns false once the pass has written its buckets back.
    fn advance(&mut self, buf: &mut [V], out: &mut Emitter<V>) -> bool {
        if self.i < self.range.end {
            let value = buf[self.i];
            let digit = self.digit(value.key());
            self.buckets[digit].push((value, self.i));
            out.compare(buf, &[self.i]);
            self.i += 1;
            return true;
        }

        let mut at = self.range.start;
        let mut changed = Vec::new();
        for bucket in self.buckets.drain(..) {
            let start = at;
            for (value, from) in bucket {
                if from != at {
                    changed.push(at);
                }
                buf[at] = value;
                at += 1;
            }
            if at > start {
                self.bounds.push(start..at);
            }
        }
        if !changed.is_empty() {
            out.swap(buf, &changed);
        }
        trace!(
            exp = self.exp,
            base = self.base,
            moved = changed.len(),
            "radix pass written back"
        );
        false
    }
}

/// Least-significant-digit radix sort in any base.
pub(crate) struct RadixLsd<V> {
    buf: Vec<V>,
    base: i64,
    max: i64,
    exp: Option<i64>,
    pass: Option<DigitPass<V>>,
}

impl<V: SortValue> RadixLsd<V> {
    pub(crate) fn new(buf: Vec<V>, base: i64) -> Self {
        let max = buf.iter().map(SortValue::key).max().unwrap_or(0);
        Self {
            buf,
            base,
            max,
            exp: Some(1),
            pass: None,
        }
    }
}

impl<V: SortValue> Procedure<V> for RadixLsd<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if let Some(pass) = self.pass.as_mut() {
            if !pass.advance(&mut self.buf, out) {
                self.pass = None;
                self.exp = self.exp.and_then(|exp| exp.checked_mul(self.base));
            }
            return true;
        }
        match self.exp {
            Some(exp) if self.max / exp >= 1 => {
                self.pass = Some(DigitPass::new(0..self.buf.len(), exp, self.base));
                true
            }
            _ => false,
        }
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

const MSD_BASE: i64 = 10;

/// Most-significant-digit radix sort, base 10, recursing into each bucket.
pub(crate) struct RadixMsd<V> {
    buf: Vec<V>,
    tasks: Vec<(Range<usize>, i64)>,
    pass: Option<DigitPass<V>>,
}

impl<V: SortValue> RadixMsd<V> {
    pub(crate) fn new(buf: Vec<V>) -> Self {
        let max = buf.iter().map(SortValue::key).max().unwrap_or(0);
        let mut top = 1_i64;
        let mut rest = max;
        while rest >= MSD_BASE {
            top *= MSD_BASE;
            rest /= MSD_BASE;
        }
        let tasks = vec![(0..buf.len(), top)];
        Self {
            buf,
            tasks,
            pass: None,
        }
    }
}

impl<V: SortValue> Procedure<V> for RadixMsd<V> {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool {
        if let Some(pass) = self.pass.as_mut() {
            if !pass.advance(&mut self.buf, out) {
                let next = pass.exp / MSD_BASE;
                if next >= 1 {
                    for bucket in pass.bounds.iter().rev() {
                        if bucket.len() > 1 {
                            self.tasks.push((bucket.clone(), next));
                        }
                    }
                }
                self.pass = None;
            }
            return true;
        }
        match self.tasks.pop() {
            Some((range, exp)) => {
                self.pass = Some(DigitPass::new(range, exp, MSD_BASE));
                true
            }
            None => false,
        }
    }

    fn finish(self: Box<Self>) -> Vec<V> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::bucket_of;
    use crate::engine::Algorithm;
    use crate::step::Step;

    fn run(algorithm: Algorithm, input: &[i64]) -> Vec<Step> {
        algorithm.trace(input).collect()
    }

    #[test]
    fn counting_reads_then_places_from_the_back() {
        let steps = run(Algorithm::Counting, &[3, 1, 2]);
        let reads: Vec<_> = steps[..3].iter().map(|s| s.comparing.clone()).collect();
        assert_eq!(reads, vec![vec![0], vec![1], vec![2]]);
        // last input element (2) is placed first, at position 1
        assert_eq!(steps[3].swapping, vec![1]);
        assert_eq!(steps.last().unwrap().array, vec![1, 2, 3]);
    }

    #[test]
    fn counting_supports_negative_and_sparse_keys() {
        let steps = run(Algorithm::Counting, &[1_000_000_000, -5, 0, -5]);
        assert_eq!(steps.last().unwrap().array, vec![-5, -5, 0, 1_000_000_000]);
    }

    #[test]
    fn bucket_of_clamps_maximum_into_last_bucket() {
        assert_eq!(bucket_of(0, 0, 100, 10), 0);
        assert_eq!(bucket_of(55, 0, 100, 10), 5);
        assert_eq!(bucket_of(100, 0, 100, 10), 9);
        assert_eq!(bucket_of(i64::MAX, i64::MIN, i64::MAX, 4), 3);
        assert_eq!(bucket_of(7, 7, 7, 3), 0);
    }

    #[test]
    fn bucket_writes_every_position() {
        let steps = run(Algorithm::Bucket, &[9, -4, 7, 0, 3]);
        assert_eq!(steps.iter().filter(|s| s.is_swap()).count(), 5);
        assert_eq!(steps.last().unwrap().array, vec![-4, 0, 3, 7, 9]);
    }

    #[test]
    fn sleep_releases_in_key_order_and_settles() {
        let steps = run(Algorithm::Sleep, &[3, -1, 2]);
        let releases: Vec<_> = steps.iter().filter(|s| s.is_swap()).collect();
        assert_eq!(releases.len(), 3);
        assert_eq!(releases[0].sorted, vec![0]);
        assert_eq!(releases[2].sorted, vec![0, 1, 2]);
        assert_eq!(steps.last().unwrap().array, vec![-1, 2, 3]);
    }

    #[test]
    fn radix_lsd_pass_count_follows_digits() {
        let steps = run(Algorithm::RadixLsd, &[170, 45, 75, 90, 802, 24, 2, 66]);
        // three digits, eight reads per pass
        assert_eq!(steps.iter().filter(|s| s.is_comparison()).count(), 24);
        assert_eq!(
            steps.last().unwrap().array,
            vec![2, 24, 45, 66, 75, 90, 170, 802]
        );
    }

    #[test]
    fn radix_write_back_lists_moved_positions() {
        let steps = run(Algorithm::RadixLsd, &[2, 1]);
        let write = steps.iter().find(|s| s.is_swap()).unwrap();
        assert_eq!(write.swapping, vec![0, 1]);
        assert_eq!(write.array, vec![1, 2]);
    }

    #[test]
    fn radix_binary_and_hex_sort() {
        let input = [255, 16, 0, 15, 128, 1, 64];
        let expected = vec![0, 1, 15, 16, 64, 128, 255];
        for algorithm in [Algorithm::RadixBinary, Algorithm::RadixHex] {
            let steps = run(algorithm, &input);
            assert_eq!(steps.last().unwrap().array, expected, "{algorithm}");
        }
    }

    #[test]
    fn radix_binary_reads_once_per_bit() {
        let steps = run(Algorithm::RadixBinary, &[5, 3]);
        // max 5 needs three bits
        assert_eq!(steps.iter().filter(|s| s.is_comparison()).count(), 6);
    }

    #[test]
    fn radix_msd_recurses_into_buckets() {
        let steps = run(Algorithm::RadixMsd, &[329, 457, 657, 839, 436, 720, 355]);
        assert_eq!(
            steps.last().unwrap().array,
            vec![329, 355, 436, 457, 657, 720, 839]
        );
    }

    #[test]
    fn radix_on_negative_keys_does_not_panic() {
        for algorithm in [
            Algorithm::RadixLsd,
            Algorithm::RadixMsd,
            Algorithm::RadixBinary,
            Algorithm::RadixHex,
        ] {
            let steps = run(algorithm, &[-7, 3, -100, 42]);
            let mut last = steps.last().unwrap().array.clone();
            last.sort_unstable();
            assert_eq!(last, vec![-100, -7, 3, 42], "{algorithm}");
        }
    }
}
