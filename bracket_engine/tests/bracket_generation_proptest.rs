/// Property-based tests for bracket generation using proptest
///
/// These tests verify the structural invariants of generated brackets
/// across random participant counts and shuffle seeds.
use bracket_engine::bracket::{
    BracketKind, BracketPosition, MatchStatus, NewMatch, Participant, Slot, bracket_size,
    generator, losers_round_count,
};
use bracket_engine::tournament::BracketFormat;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};

fn players(n: usize) -> Vec<Participant> {
    (1..=n as i64)
        .map(|i| Participant::new(i, 500 + i, format!("player{i}")))
        .collect()
}

fn in_bracket(matches: &[NewMatch], bracket: BracketKind) -> Vec<&NewMatch> {
    matches.iter().filter(|m| m.bracket() == bracket).collect()
}

/// Count how many matches feed each (round, match number, slot) target
fn feeders(matches: &[NewMatch]) -> HashMap<(u32, u32, Slot), usize> {
    let mut fed = HashMap::new();
    for m in matches {
        if let BracketPosition::Single {
            next_match_number: Some(next),
            next_slot,
        } = m.position
        {
            *fed.entry((m.round + 1, next, next_slot)).or_insert(0) += 1;
        }
    }
    fed
}

proptest! {
    #[test]
    fn test_single_elimination_shape(n in 2usize..=64, seed in any::<u64>()) {
        let bracket = generator::single_elimination(&players(n), &mut StdRng::seed_from_u64(seed))
            .unwrap();
        let size = bracket_size(n);

        prop_assert!(size.is_power_of_two() && size >= n && size / 2 < n);
        prop_assert_eq!(bracket.matches.len(), size - 1);

        let rounds = bracket.matches.iter().map(|m| m.round).max().unwrap();
        prop_assert_eq!(rounds, size.trailing_zeros());

        let first_round: Vec<&NewMatch> =
            bracket.matches.iter().filter(|m| m.round == 1).collect();
        let byes = first_round.iter().filter(|m| m.slot_b.is_none()).count();
        prop_assert_eq!(byes, size - n);

        for m in &first_round {
            // No round-1 match is empty, byes keep slot A
            prop_assert!(m.slot_a.is_some());
            let expected = if m.slot_b.is_some() { MatchStatus::Ready } else { MatchStatus::Pending };
            prop_assert_eq!(m.status, expected);
        }
        for m in bracket.matches.iter().filter(|m| m.round > 1) {
            prop_assert!(m.slot_a.is_none() && m.slot_b.is_none());
            prop_assert_eq!(m.status, MatchStatus::Pending);
        }
    }

    #[test]
    fn test_single_elimination_every_participant_once(n in 2usize..=64, seed in any::<u64>()) {
        let bracket = generator::single_elimination(&players(n), &mut StdRng::seed_from_u64(seed))
            .unwrap();

        let placed: Vec<i64> = bracket
            .matches
            .iter()
            .flat_map(|m| [m.slot_a, m.slot_b])
            .flatten()
            .collect();
        let unique: HashSet<i64> = placed.iter().copied().collect();
        prop_assert_eq!(placed.len(), n);
        prop_assert_eq!(unique.len(), n);
    }

    #[test]
    fn test_single_elimination_routing(n in 2usize..=64) {
        let bracket = generator::single_elimination(&players(n), &mut StdRng::seed_from_u64(0))
            .unwrap();
        let finals: Vec<&NewMatch> = bracket
            .matches
            .iter()
            .filter(|m| m.position.is_decider())
            .collect();
        prop_assert_eq!(finals.len(), 1);

        // Every non-final match feeds exactly one slot, every slot after
        // round 1 is fed exactly once
        let fed = feeders(&bracket.matches);
        prop_assert!(fed.values().all(|&count| count == 1));
        prop_assert_eq!(fed.len(), 2 * (bracket.matches.len() - bracket_size(n) / 2));

        let index: HashSet<(u32, u32)> =
            bracket.matches.iter().map(|m| (m.round, m.match_number)).collect();
        for (round, number, _) in fed.keys() {
            prop_assert!(index.contains(&(*round, *number)));
        }
    }

    #[test]
    fn test_double_elimination_shape(n in 2usize..=64, seed in any::<u64>()) {
        let bracket = generator::double_elimination(&players(n), &mut StdRng::seed_from_u64(seed))
            .unwrap();
        let size = bracket_size(n).max(4);
        let winners_rounds = size.trailing_zeros();

        let winners = in_bracket(&bracket.matches, BracketKind::Winners);
        let losers = in_bracket(&bracket.matches, BracketKind::Losers);
        let grand_finals = in_bracket(&bracket.matches, BracketKind::GrandFinals);

        prop_assert_eq!(winners.len(), size - 1);
        prop_assert_eq!(losers.len(), size - 2);
        prop_assert_eq!(grand_finals.len(), 1);
        prop_assert_eq!(
            losers.iter().map(|m| m.round).max().unwrap(),
            losers_round_count(winners_rounds)
        );

        let losers_finals = losers
            .iter()
            .filter(|m| matches!(m.position, BracketPosition::Losers { is_losers_final: true, .. }))
            .count();
        prop_assert_eq!(losers_finals, 1);

        let winners_finals = winners
            .iter()
            .filter(|m| matches!(m.position, BracketPosition::Winners { is_winners_final: true, .. }))
            .count();
        prop_assert_eq!(winners_finals, 1);
    }

    #[test]
    fn test_double_elimination_drops_land_in_losers_bracket(n in 2usize..=64) {
        let bracket = generator::double_elimination(&players(n), &mut StdRng::seed_from_u64(0))
            .unwrap();

        let losers: HashMap<(u32, u32), &NewMatch> = in_bracket(&bracket.matches, BracketKind::Losers)
            .into_iter()
            .map(|m| ((m.round, m.match_number), m))
            .collect();

        let mut drops: HashMap<(u32, u32, Slot), usize> = HashMap::new();
        for m in in_bracket(&bracket.matches, BracketKind::Winners) {
            // Byes have no loser to drop
            if m.round == 1 && m.slot_b.is_none() {
                continue;
            }
            let BracketPosition::Winners {
                drop_losers_round,
                drop_losers_position,
                drop_losers_slot,
                ..
            } = m.position
            else {
                panic!("winners match without winners position");
            };
            prop_assert!(losers.contains_key(&(drop_losers_round, drop_losers_position)));
            *drops
                .entry((drop_losers_round, drop_losers_position, drop_losers_slot))
                .or_insert(0) += 1;
        }
        // No two live losers are sent to the same slot
        prop_assert!(drops.values().all(|&count| count == 1));

        // Matches nobody can reach are already settled
        for m in losers.values() {
            if m.status == MatchStatus::Completed {
                prop_assert_eq!(m.round, 1);
            }
        }
    }
}

#[test]
fn test_explicit_seed_one_opens_match_one() {
    let mut participants = players(8);
    participants.reverse();
    let participants: Vec<Participant> = participants
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.with_seed(8 - i as u32))
        .collect();
    // Input order is seed 8, 7, ..., 1 after the reverse
    assert_eq!(participants[0].seed, Some(8));

    for format in [BracketFormat::SingleElimination, BracketFormat::DoubleElimination] {
        let bracket = generator::generate(format, &participants, &mut StdRng::seed_from_u64(3))
            .unwrap();
        let opener = bracket
            .matches
            .iter()
            .find(|m| {
                m.round == 1
                    && m.match_number == 1
                    && matches!(m.bracket(), BracketKind::Single | BracketKind::Winners)
            })
            .unwrap();
        let seed_one = participants.iter().find(|p| p.seed == Some(1)).unwrap();
        assert_eq!(opener.slot_a, Some(seed_one.entrant_id()));
    }
}
