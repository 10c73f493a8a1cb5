use sortrace::{Algorithm, Step};

fn run(algorithm: Algorithm, input: &[i64]) -> Vec<Step> {
    algorithm.trace(input).collect()
}

#[test]
fn insertion_sorts_small_input() {
    let steps = run(Algorithm::Insertion, &[5, 3, 8, 1]);
    let last = steps.last().unwrap();
    assert_eq!(last.array, vec![1, 3, 5, 8]);
    assert_eq!(last.sorted, vec![0, 1, 2, 3]);
}

#[test]
fn bubble_on_empty_input_yields_one_step() {
    let steps = run(Algorithm::Bubble, &[]);
    assert_eq!(steps.len(), 1);
    assert!(steps[0].array.is_empty());
    assert!(steps[0].sorted.is_empty());
}

#[test]
fn selection_on_all_equal_values() {
    let steps = run(Algorithm::Selection, &[1, 1, 1]);
    assert_eq!(steps.last().unwrap().array, vec![1, 1, 1]);
}

#[test]
fn bitonic_on_power_of_two_length_does_not_pad() {
    let steps = run(Algorithm::Bitonic, &[4, 2, 1, 3]);
    assert!(steps.iter().all(|s| s.len() == 4));
    assert_eq!(steps.last().unwrap().array, vec![1, 2, 3, 4]);
}

#[test]
fn spread_handles_mixed_signs() {
    let steps = run(Algorithm::Spread, &[-3, 5, -1, 2]);
    assert_eq!(steps.last().unwrap().array, vec![-3, -1, 2, 5]);
}

#[test]
fn summary_counts_match_trace() {
    let input = [9_i64, 3, 7, 1, 5];
    let steps = run(Algorithm::Heap, &input);
    let summary = Algorithm::Heap.summarize(&input);
    assert_eq!(summary.steps, steps.len());
    assert_eq!(summary.comparisons, steps.iter().filter(|s| s.is_comparison()).count());
    assert_eq!(summary.swaps, steps.iter().filter(|s| s.is_swap()).count());
    assert_eq!(summary.max_len, 5);
}

#[test]
fn catalog_describes_every_algorithm() {
    for algorithm in Algorithm::ALL {
        let info = algorithm.info();
        assert!(!info.name.is_empty());
        assert!(info.complexity.starts_with('O'));
        assert_eq!(algorithm.to_string(), algorithm.key());
    }
    assert!(Algorithm::RadixHex.info().non_negative_only);
    assert!(!Algorithm::Counting.info().non_negative_only);
}
