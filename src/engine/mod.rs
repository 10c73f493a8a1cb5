//! Algorithm engine.
//!
//! Every algorithm is an explicit resumable state machine ([`Procedure`]) that
//! owns its working buffer and a stack of pending segments. [`Trace`] drives a
//! procedure one bounded unit at a time and hands out the steps it queued, so
//! a run only advances as far as its consumer pulls.

mod distribution;
mod emit;
mod exchange;
mod insertion;
mod kernels;
mod merge;
mod network;
mod patience;
mod quick;
mod selection;
mod spread;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, SortraceError};
use crate::step::{SortValue, Step};

use self::emit::Emitter;

/// A resumable sorting procedure.
///
/// `resume` performs one bounded unit of work, queueing the steps it produced,
/// and returns `false` once the buffer is sorted. `finish` hands the buffer
/// back for the terminal step.
pub(crate) trait Procedure<V>: Send {
    fn resume(&mut self, out: &mut Emitter<V>) -> bool;

    fn finish(self: Box<Self>) -> Vec<V>;
}

/// Algorithm family, used for grouping in catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Adjacent or gapped compare-exchange passes.
    Exchange,
    /// Repeated extraction of an extreme element.
    Selection,
    /// Insertion into a growing ordered region.
    Insertion,
    /// Pivot partitioning.
    Partition,
    /// Merging of ordered runs.
    Merge,
    /// Fixed comparator networks.
    Network,
    /// Non-comparative distribution by key.
    Distribution,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange => write!(f, "exchange"),
            Self::Selection => write!(f, "selection"),
            Self::Insertion => write!(f, "insertion"),
            Self::Partition => write!(f, "partition"),
            Self::Merge => write!(f, "merge"),
            Self::Network => write!(f, "network"),
            Self::Distribution => write!(f, "distribution"),
        }
    }
}

/// Static description of an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlgorithmInfo {
    /// Display name.
    pub name: &'static str,
    pub family: Family,
    /// Time complexity note.
    pub complexity: &'static str,
    /// Equal keys keep their input order.
    pub stable: bool,
    /// May be routed through the background bridge.
    pub background_eligible: bool,
    /// Output is unspecified for negative keys.
    pub non_negative_only: bool,
}

/// Every algorithm the engine can trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Bubble,
    Selection,
    Insertion,
    Quick,
    QuickMt,
    Merge,
    Heap,
    Shell,
    Comb,
    Cocktail,
    Gnome,
    Library,
    Intro,
    OddEven,
    Cycle,
    Pancake,
    Patience,
    Tournament,
    Smooth,
    Tim,
    Sleep,
    Bitonic,
    BitonicMt,
    RadixLsd,
    RadixMsd,
    RadixBinary,
    RadixHex,
    Counting,
    Bucket,
    Pdq,
    Block,
    Spread,
}

impl Algorithm {
    /// All algorithms in catalog order.
    pub const ALL: [Self; 32] = [
        Self::Bubble,
        Self::Selection,
        Self::Insertion,
        Self::Quick,
        Self::QuickMt,
        Self::Merge,
        Self::Heap,
        Self::Shell,
        Self::Comb,
        Self::Cocktail,
        Self::Gnome,
        Self::Library,
        Self::Intro,
        Self::OddEven,
        Self::Cycle,
        Self::Pancake,
        Self::Patience,
        Self::Tournament,
        Self::Smooth,
        Self::Tim,
        Self::Sleep,
        Self::Bitonic,
        Self::BitonicMt,
        Self::RadixLsd,
        Self::RadixMsd,
        Self::RadixBinary,
        Self::RadixHex,
        Self::Counting,
        Self::Bucket,
        Self::Pdq,
        Self::Block,
        Self::Spread,
    ];

    /// The configuration key, e.g. `"radix-lsd"`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Bubble => "bubble",
            Self::Selection => "selection",
            Self::Insertion => "insertion",
            Self::Quick => "quick",
            Self::QuickMt => "quick-mt",
            Self::Merge => "merge",
            Self::Heap => "heap",
            Self::Shell => "shell",
            Self::Comb => "comb",
            Self::Cocktail => "cocktail",
            Self::Gnome => "gnome",
            Self::Library => "library",
            Self::Intro => "intro",
            Self::OddEven => "odd-even",
            Self::Cycle => "cycle",
            Self::Pancake => "pancake",
            Self::Patience => "patience",
            Self::Tournament => "tournament",
            Self::Smooth => "smooth",
            Self::Tim => "tim",
            Self::Sleep => "sleep",
            Self::Bitonic => "bitonic",
            Self::BitonicMt => "bitonic-mt",
            Self::RadixLsd => "radix-lsd",
            Self::RadixMsd => "radix-msd",
            Self::RadixBinary => "radix-binary",
            Self::RadixHex => "radix-hex",
            Self::Counting => "counting",
            Self::Bucket => "bucket",
            Self::Pdq => "pdq",
            Self::Block => "block",
            Self::Spread => "spread",
        }
    }

    /// Catalog entry for this algorithm.
    #[must_use]
    pub const fn info(self) -> AlgorithmInfo {
        use Family::{Distribution, Exchange, Insertion, Merge, Network, Partition, Selection};

        const fn entry(
            name: &'static str,
            family: Family,
            complexity: &'static str,
            stable: bool,
        ) -> AlgorithmInfo {
            AlgorithmInfo {
                name,
                family,
                complexity,
                stable,
                background_eligible: false,
                non_negative_only: false,
            }
        }

        const fn radix(name: &'static str, complexity: &'static str, stable: bool) -> AlgorithmInfo {
            AlgorithmInfo {
                non_negative_only: true,
                ..entry(name, Family::Distribution, complexity, stable)
            }
        }

        match self {
            Self::Bubble => entry("Bubble Sort", Exchange, "O(n^2)", true),
            Self::Selection => entry("Selection Sort", Selection, "O(n^2)", false),
            Self::Insertion => entry("Insertion Sort", Insertion, "O(n^2)", true),
            Self::Quick => entry("Quick Sort", Partition, "O(n log n) avg", false),
            Self::QuickMt => AlgorithmInfo {
                background_eligible: true,
                ..entry("Quick Sort (background)", Partition, "O(n log n) avg", false)
            },
            Self::Merge => entry("Merge Sort", Merge, "O(n log n)", true),
            Self::Heap => entry("Heap Sort", Selection, "O(n log n)", false),
            Self::Shell => entry("Shell Sort", Insertion, "O(n^1.5)", false),
            Self::Comb => entry("Comb Sort", Exchange, "O(n^2 / 2^p)", false),
            Self::Cocktail => entry("Cocktail Shaker Sort", Exchange, "O(n^2)", false),
            Self::Gnome => entry("Gnome Sort", Exchange, "O(n^2)", false),
            Self::Library => entry("Library Sort", Insertion, "O(n^2)", true),
            Self::Intro => entry("Intro Sort", Partition, "O(n log n)", false),
            Self::OddEven => entry("Odd-Even Sort", Exchange, "O(n^2)", false),
            Self::Cycle => entry("Cycle Sort", Selection, "O(n^2)", false),
            Self::Pancake => entry("Pancake Sort", Selection, "O(n^2)", false),
            Self::Patience => entry("Patience Sort", Insertion, "O(n log n)", true),
            Self::Tournament => entry("Tournament Sort", Selection, "O(n log n)", false),
            Self::Smooth => entry("Smooth Sort", Insertion, "O(n log n)", false),
            Self::Tim => entry("Tim Sort", Merge, "O(n log n)", true),
            Self::Sleep => entry("Sleep Sort", Distribution, "O(n + max)", false),
            Self::Bitonic => entry("Bitonic Sort", Network, "O(n log^2 n)", false),
            Self::BitonicMt => entry("Bitonic Sort (parallel stages)", Network, "O(log^2 n) stages", false),
            Self::RadixLsd => radix("Radix Sort (LSD)", "O(d(n + 10))", true),
            Self::RadixMsd => radix("Radix Sort (MSD)", "O(d(n + 10))", false),
            Self::RadixBinary => radix("Radix Sort (binary)", "O(bn)", false),
            Self::RadixHex => radix("Radix Sort (hex)", "O(d(n + 16))", false),
            Self::Counting => entry("Counting Sort", Distribution, "O(n + k)", true),
            Self::Bucket => entry("Bucket Sort", Distribution, "O(n + k)", false),
            Self::Pdq => entry("Pattern-Defeating Quick Sort", Partition, "O(n log n)", false),
            Self::Block => entry("Block Merge Sort", Merge, "O(n log^2 n)", true),
            Self::Spread => entry("Spread Sort", Distribution, "O(n log n)", false),
        }
    }

    /// Begins a lazy trace over a private copy of `input`.
    #[must_use]
    pub fn trace<V: SortValue>(self, input: &[V]) -> Trace<V> {
        Trace::new(self, input.to_vec())
    }

    /// Drains a full trace and summarizes it.
    #[must_use]
    pub fn summarize<V: SortValue>(self, input: &[V]) -> TraceSummary<V> {
        TraceSummary::collect(self.trace(input))
    }

    fn procedure<V: SortValue>(self, buf: Vec<V>) -> Box<dyn Procedure<V>> {
        match self {
            Self::Bubble => Box::new(exchange::Bubble::new(buf)),
            Self::Cocktail => Box::new(exchange::Cocktail::new(buf)),
            Self::OddEven => Box::new(exchange::OddEven::new(buf)),
            Self::Comb => Box::new(exchange::Comb::new(buf)),
            Self::Gnome => Box::new(exchange::Gnome::new(buf)),
            Self::Selection => Box::new(selection::Selection::new(buf)),
            Self::Heap => Box::new(selection::Heap::new(buf)),
            Self::Cycle => Box::new(selection::Cycle::new(buf)),
            Self::Pancake => Box::new(selection::Pancake::new(buf)),
            Self::Tournament => Box::new(selection::Tournament::new(buf)),
            Self::Insertion => Box::new(insertion::Insertion::new(buf)),
            Self::Shell => Box::new(insertion::Gapped::shell(buf)),
            Self::Smooth => Box::new(insertion::Gapped::leonardo(buf)),
            Self::Library => Box::new(insertion::Library::new(buf)),
            Self::Quick | Self::QuickMt => Box::new(quick::Segmented::quick(buf)),
            Self::Intro => Box::new(quick::Segmented::intro(buf)),
            Self::Pdq => Box::new(quick::Segmented::pdq(buf)),
            Self::Merge => Box::new(merge::TopDown::new(buf)),
            Self::Block => Box::new(merge::Block::new(buf)),
            Self::Tim => Box::new(merge::Tim::new(buf)),
            Self::Bitonic => Box::new(network::Bitonic::new(buf)),
            Self::BitonicMt => Box::new(network::BitonicStages::new(buf)),
            Self::Counting => Box::new(distribution::Counting::new(buf)),
            Self::Bucket => Box::new(distribution::Bucket::new(buf)),
            Self::Sleep => Box::new(distribution::Sleep::new(buf)),
            Self::RadixLsd => Box::new(distribution::RadixLsd::new(buf, 10)),
            Self::RadixHex => Box::new(distribution::RadixLsd::new(buf, 16)),
            Self::RadixBinary => Box::new(distribution::RadixLsd::new(buf, 2)),
            Self::RadixMsd => Box::new(distribution::RadixMsd::new(buf)),
            Self::Patience => Box::new(patience::Patience::new(buf)),
            Self::Spread => Box::new(spread::Spread::new(buf)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Algorithm {
    type Err = SortraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| {
                ConfigurationError::UnknownAlgorithm {
                    name: s.to_string(),
                }
                .into()
            })
    }
}

/// Lazy step sequence of one algorithm run.
///
/// The run owns a private copy of its input. Dropping the trace abandons the
/// run; nothing is computed ahead of the consumer beyond one unit of work.
pub struct Trace<V: SortValue = i64> {
    algorithm: Algorithm,
    input_len: usize,
    procedure: Option<Box<dyn Procedure<V>>>,
    out: Emitter<V>,
    emitted: usize,
}

impl<V: SortValue> Trace<V> {
    fn new(algorithm: Algorithm, input: Vec<V>) -> Self {
        let input_len = input.len();
        let mut out = Emitter::new();
        let procedure = if input_len <= 1 {
            out.terminal(input);
            None
        } else {
            Some(algorithm.procedure(input))
        };
        debug!(algorithm = algorithm.key(), len = input_len, "trace started");

        Self {
            algorithm,
            input_len,
            procedure,
            out,
            emitted: 0,
        }
    }

    /// The algorithm being traced.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Length of the traced input.
    #[must_use]
    pub const fn input_len(&self) -> usize {
        self.input_len
    }

    /// Steps handed out so far.
    #[must_use]
    pub const fn emitted(&self) -> usize {
        self.emitted
    }

    /// Returns true once the terminal step has been handed out.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.procedure.is_none() && self.out.is_drained()
    }
}

impl<V: SortValue> Iterator for Trace<V> {
    type Item = Step<V>;

    fn next(&mut self) -> Option<Step<V>> {
        loop {
            if let Some(step) = self.out.pop() {
                self.emitted += 1;
                return Some(step);
            }
            let procedure = self.procedure.as_mut()?;
            if !procedure.resume(&mut self.out) {
                if let Some(done) = self.procedure.take() {
                    self.out.terminal(done.finish());
                    debug!(
                        algorithm = self.algorithm.key(),
                        len = self.input_len,
                        steps = self.emitted + 1,
                        "trace finished"
                    );
                }
            }
        }
    }
}

impl<V: SortValue> fmt::Debug for Trace<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("algorithm", &self.algorithm)
            .field("input_len", &self.input_len)
            .field("emitted", &self.emitted)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// blake3 digest of an ordered step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceDigest([u8; 32]);

impl TraceDigest {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TraceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Incremental hasher over steps, in delivery order.
#[derive(Debug, Default)]
pub struct DigestBuilder {
    hasher: blake3::Hasher,
}

impl DigestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one step.
    pub fn update<V: SortValue>(&mut self, step: &Step<V>) {
        let hasher = &mut self.hasher;
        hasher.update(&(step.array.len() as u64).to_le_bytes());
        for value in &step.array {
            hasher.update(&value.key().to_le_bytes());
        }
        for indices in [&step.comparing, &step.swapping, &step.sorted] {
            hasher.update(&(indices.len() as u64).to_le_bytes());
            for index in indices {
                hasher.update(&(*index as u64).to_le_bytes());
            }
        }
    }

    #[must_use]
    pub fn finish(&self) -> TraceDigest {
        TraceDigest(*self.hasher.finalize().as_bytes())
    }
}

/// Totals and fingerprint of a drained trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSummary<V = i64> {
    pub algorithm: Algorithm,
    /// Total steps, terminal included.
    pub steps: usize,
    /// Steps with a non-empty `comparing` set.
    pub comparisons: usize,
    /// Steps with a non-empty `swapping` set.
    pub swaps: usize,
    /// Longest snapshot seen; exceeds the input only for padded networks.
    pub max_len: usize,
    pub final_step: Step<V>,
    pub digest: TraceDigest,
}

impl<V: SortValue> TraceSummary<V> {
    fn collect(trace: Trace<V>) -> Self {
        let algorithm = trace.algorithm();
        let mut digest = DigestBuilder::new();
        let (mut steps, mut comparisons, mut swaps, mut max_len) = (0, 0, 0, 0);
        let mut last = None;

        for step in trace {
            digest.update(&step);
            steps += 1;
            comparisons += usize::from(step.is_comparison());
            swaps += usize::from(step.is_swap());
            max_len = max_len.max(step.len());
            last = Some(step);
        }

        Self {
            algorithm,
            steps,
            comparisons,
            swaps,
            max_len,
            final_step: last.unwrap_or_else(|| Step::terminal(Vec::new())),
            digest: digest.finish(),
        }
    }

    /// The terminal array.
    #[must_use]
    pub fn final_array(&self) -> &[V] {
        &self.final_step.array
    }
}
