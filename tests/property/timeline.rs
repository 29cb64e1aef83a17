// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Timeline Ordering

use ledger_signals::frp::Timeline;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left(usize),
    Right(usize),
}

fn arb_times() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-50i64..50, 0..30)
}

fn timeline(times: &[i64], side: fn(usize) -> Side) -> Timeline<Side> {
    Timeline::from_vec(times.iter().enumerate().map(|(i, &t)| (t, side(i))).collect())
}

proptest! {
    #[test]
    fn prop_from_vec_is_sorted_and_stable(times in arb_times()) {
        let line = timeline(&times, Side::Left);
        prop_assert_eq!(line.len(), times.len());
        for pair in line.occurrences().windows(2) {
            let ((t0, Side::Left(i0)), (t1, Side::Left(i1))) = (pair[0], pair[1]) else {
                unreachable!()
            };
            prop_assert!(t0 < t1 || (t0 == t1 && i0 < i1));
        }
    }

    #[test]
    fn prop_merge_keeps_everything_and_left_wins_ties(left in arb_times(), right in arb_times()) {
        let merged = timeline(&left, Side::Left).merge(timeline(&right, Side::Right));
        prop_assert_eq!(merged.len(), left.len() + right.len());
        for pair in merged.occurrences().windows(2) {
            let ((t0, s0), (t1, s1)) = (pair[0], pair[1]);
            prop_assert!(t0 <= t1);
            if t0 == t1 {
                prop_assert!(
                    !matches!((s0, s1), (Side::Right(_), Side::Left(_))),
                    "right occurrence before left one at {}", t0
                );
            }
        }
    }

    #[test]
    fn prop_filter_preserves_order(times in arb_times()) {
        let kept = timeline(&times, Side::Left).filter(|side| matches!(side, Side::Left(i) if i % 2 == 0));
        prop_assert_eq!(kept.len(), times.len().div_ceil(2));
        prop_assert!(kept.occurrences().windows(2).all(|pair| pair[0].0 <= pair[1].0));
    }
}
