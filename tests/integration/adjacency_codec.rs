use graphstore::storage::{AdjacencyList, AdjacencyListBuilder};
use graphstore::types::{NodeId, NOT_FOUND};
use proptest::prelude::*;

fn sorted_run() -> impl Strategy<Value = Vec<NodeId>> {
    prop_oneof![
        prop::collection::vec(0u64..64, 0..40),
        prop::collection::vec(0u64..1 << 40, 0..40),
        prop::collection::vec(any::<u64>().prop_map(|v| v >> 1), 0..8),
    ]
    .prop_map(|mut run| {
        run.sort_unstable();
        run
    })
}

fn arena_of(runs: &[Vec<NodeId>]) -> (AdjacencyList, Vec<u64>) {
    let mut builder = AdjacencyListBuilder::new();
    let offsets = runs
        .iter()
        .map(|run| builder.append_run(run).unwrap())
        .collect();
    (builder.build(), offsets)
}

proptest! {
    #[test]
    fn prop_runs_decode_to_their_input(runs in prop::collection::vec(sorted_run(), 1..8)) {
        let (arena, offsets) = arena_of(&runs);
        for (run, &offset) in runs.iter().zip(&offsets) {
            prop_assert_eq!(arena.degree(offset) as usize, run.len());
            prop_assert_eq!(arena.cursor(offset).collect::<Vec<_>>(), run.clone());
        }
    }

    #[test]
    fn prop_has_next_tracks_remaining_degree(run in sorted_run()) {
        let (arena, offsets) = arena_of(std::slice::from_ref(&run));
        let mut cursor = arena.cursor(offsets[0]);
        let mut decoded = 0usize;
        while cursor.has_next() {
            prop_assert_eq!(cursor.remaining() as usize, run.len() - decoded);
            cursor.next_target();
            decoded += 1;
        }
        prop_assert_eq!(decoded, run.len());
    }

    #[test]
    fn prop_skip_until_finds_first_strictly_greater(run in sorted_run(), probe in 0u64..80) {
        let (arena, offsets) = arena_of(std::slice::from_ref(&run));
        let expected = run.iter().copied().find(|&t| t > probe).unwrap_or(NOT_FOUND);
        let mut cursor = arena.cursor(offsets[0]);
        prop_assert_eq!(cursor.skip_until(probe), expected);
        // Repeating the probe does not move the cursor.
        prop_assert_eq!(cursor.skip_until(probe), expected);
    }

    #[test]
    fn prop_advance_finds_first_at_least(run in sorted_run(), probe in 0u64..80) {
        let (arena, offsets) = arena_of(std::slice::from_ref(&run));
        let expected = run.iter().copied().find(|&t| t >= probe).unwrap_or(NOT_FOUND);
        let mut cursor = arena.cursor(offsets[0]);
        prop_assert_eq!(cursor.advance(probe), expected);
        prop_assert_eq!(cursor.advance(probe), expected);
        if expected != NOT_FOUND {
            prop_assert_eq!(cursor.current(), Some(expected));
        }
    }

    #[test]
    fn prop_monotone_probes_see_every_answer(run in sorted_run(), mut probes in prop::collection::vec(0u64..80, 1..10)) {
        probes.sort_unstable();
        let (arena, offsets) = arena_of(std::slice::from_ref(&run));
        let mut cursor = arena.cursor(offsets[0]);
        for probe in probes {
            let expected = run.iter().copied().find(|&t| t >= probe).unwrap_or(NOT_FOUND);
            prop_assert_eq!(cursor.advance(probe), expected);
        }
    }

    #[test]
    fn prop_copied_cursor_continues_in_lockstep(run in sorted_run(), steps in 0usize..10) {
        let (arena, offsets) = arena_of(std::slice::from_ref(&run));
        let mut original = arena.cursor(offsets[0]);
        for _ in 0..steps.min(run.len()) {
            original.next_target();
        }
        let mut copy = arena.empty_cursor();
        copy.copy_from(&original);
        prop_assert_eq!(copy.collect::<Vec<_>>(), original.collect::<Vec<_>>());
    }
}

#[test]
fn offset_zero_is_an_empty_run() {
    let (arena, offsets) = arena_of(&[vec![], vec![3, 3, 9]]);
    assert_eq!(offsets[0], 0);
    assert_eq!(arena.degree(0), 0);
    let mut cursor = arena.cursor(0);
    assert!(!cursor.has_next());
    assert_eq!(cursor.skip_until(0), NOT_FOUND);
    assert_eq!(cursor.advance(0), NOT_FOUND);
}

#[test]
fn parallel_targets_survive_encoding() {
    let (arena, offsets) = arena_of(&[vec![3, 3, 9]]);
    let mut cursor = arena.cursor(offsets[0]);
    assert_eq!(cursor.advance(3), 3);
    assert_eq!(cursor.skip_until(3), 9);
    assert!(!cursor.has_next());
    assert_eq!(cursor.skip_until(9), NOT_FOUND);
}

#[test]
#[should_panic(expected = "cursor advanced past the end")]
fn next_target_on_exhausted_cursor_panics() {
    let (arena, offsets) = arena_of(&[vec![1]]);
    let mut cursor = arena.cursor(offsets[0]);
    cursor.next_target();
    cursor.next_target();
}
