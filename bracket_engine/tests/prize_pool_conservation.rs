//! Prize pool conservation tests for tournament payouts.
//!
//! These tests verify that prize pools are distributed with nothing lost to
//! rounding. Whenever a champion exists, allocations must sum to exactly the
//! prize pool.

#![allow(clippy::unreadable_literal)]

use bracket_engine::prize::{Allocation, PrizeSplit};
use proptest::prelude::*;

fn total(allocations: &[Allocation]) -> i64 {
    allocations.iter().map(|a| a.amount).sum()
}

/// Standings as produced by a single elimination final: champion,
/// runner-up and two losing semifinalists
fn single_elimination_standings() -> Vec<(i64, u32)> {
    vec![(11, 1), (12, 2), (13, 3), (14, 3)]
}

#[test]
fn test_default_split_conservation() {
    let pools = vec![1, 2, 3, 7, 99, 100, 101, 999, 1000, 12345, 1_000_001];

    for pool in pools {
        let allocations = PrizeSplit::default().allocate(pool, &single_elimination_standings());
        assert_eq!(
            total(&allocations),
            pool,
            "Pool {} paid {:?}",
            pool,
            allocations
        );
        assert!(allocations.iter().all(|a| a.amount >= 0));
    }
}

#[test]
fn test_joint_third_place_split_evenly() {
    let allocations = PrizeSplit::default().allocate(1001, &single_elimination_standings());
    let thirds: Vec<i64> = allocations
        .iter()
        .filter(|a| a.placement == 3)
        .map(|a| a.amount)
        .collect();

    // 10% of 1001 is 100, halved between both semifinal losers
    assert_eq!(thirds, vec![50, 50]);
    // 600 + 300 + 100 = 1000, the remaining chip goes to the champion
    assert_eq!(allocations[0].amount, 601);
}

#[test]
fn test_winner_takes_all_conservation() {
    let split = PrizeSplit::new(vec![10_000]).unwrap();

    for pool in [1, 50, 999, 123_456] {
        let allocations = split.allocate(pool, &single_elimination_standings());
        assert_eq!(allocations.len(), 1, "Only the champion is paid");
        assert_eq!(allocations[0].amount, pool);
    }
}

#[test]
fn test_unoccupied_placements_go_to_champion() {
    // Two-player bracket: nobody finishes third
    let standings = vec![(1, 1), (2, 2)];
    let allocations = PrizeSplit::default().allocate(1000, &standings);

    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0].amount, 700);
    assert_eq!(allocations[1].amount, 300);
    assert_eq!(total(&allocations), 1000);
}

#[test]
fn test_placements_beyond_split_are_unpaid() {
    let split = PrizeSplit::new(vec![7000, 3000]).unwrap();
    let allocations = split.allocate(500, &single_elimination_standings());

    assert!(allocations.iter().all(|a| a.placement <= 2));
    assert_eq!(total(&allocations), 500);
}

#[test]
fn test_no_champion_pays_nothing_extra() {
    let standings = vec![(5, 2), (6, 3)];
    let allocations = PrizeSplit::default().allocate(1000, &standings);

    // Without a 1st place the remainder has no recipient
    assert_eq!(total(&allocations), 400);
}

proptest! {
    #[test]
    fn test_allocations_sum_to_pool(
        pool in 0i64..=10_000_000_000,
        third_place_holders in 0usize..=2,
        first in 1u32..=9_000,
        second_fraction in 0u32..=100,
    ) {
        let remaining = 10_000 - first;
        let second = remaining * second_fraction / 100;
        let split = PrizeSplit::new(vec![first, second, remaining - second]).unwrap();

        let mut standings = vec![(1, 1), (2, 2)];
        standings.extend((0..third_place_holders as i64).map(|i| (3 + i, 3)));

        let allocations = split.allocate(pool, &standings);
        prop_assert_eq!(total(&allocations), pool);
        prop_assert!(allocations.iter().all(|a| a.amount >= 0));

        // The champion never earns less than their share
        prop_assert!(allocations[0].amount >= split.share_for_placement(pool, 1));
    }
}
