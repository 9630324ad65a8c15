//! Bracket skeleton generation for single and double elimination.
//!
//! Generation is pure: given participants and a random source it returns the
//! full set of matches (with routing descriptors) plus the initial bracket
//! view. Nothing is persisted here.

use rand::Rng;

use super::{
    errors::{BracketError, BracketResult},
    models::{BracketPosition, MatchStatus, NewMatch, Participant, ParticipantId, Slot},
    seeding::seed_participants,
    view::{BracketView, ViewEntry},
};
use crate::tournament::BracketFormat;

/// Fewest participants a bracket can be generated for
pub const MIN_PARTICIPANTS: usize = 2;

/// Generated match skeleton plus its visualization
#[derive(Debug, Clone)]
pub struct GeneratedBracket {
    pub matches: Vec<NewMatch>,
    pub view: BracketView,
}

/// Smallest power of two that is >= `n`
pub fn bracket_size(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Number of rounds in a losers bracket fed by `winners_rounds` rounds
pub fn losers_round_count(winners_rounds: u32) -> u32 {
    (2 * winners_rounds).saturating_sub(2)
}

/// Generate a bracket in the given format
pub fn generate<R: Rng + ?Sized>(
    format: BracketFormat,
    participants: &[Participant],
    rng: &mut R,
) -> BracketResult<GeneratedBracket> {
    match format {
        BracketFormat::SingleElimination => single_elimination(participants, rng),
        BracketFormat::DoubleElimination => double_elimination(participants, rng),
    }
}

/// Generate a single elimination bracket.
///
/// Round 1 holds the seeded participants, later rounds start empty and are
/// filled as winners advance. Round-1 matches with a single entrant are byes
/// and stay `Pending` until the bye processor completes them.
///
/// # Errors
///
/// * `BracketError::InsufficientParticipants` - Fewer than two participants
pub fn single_elimination<R: Rng + ?Sized>(
    participants: &[Participant],
    rng: &mut R,
) -> BracketResult<GeneratedBracket> {
    ensure_enough(participants)?;

    let seeded = seed_participants(participants, rng);
    let size = bracket_size(seeded.len());
    let total_rounds = size.trailing_zeros();

    let mut matches = Vec::with_capacity(size - 1);

    for (index, (slot_a, slot_b)) in first_round_pairs(&seeded, size).into_iter().enumerate() {
        let match_number = index as u32 + 1;
        matches.push(NewMatch {
            round: 1,
            match_number,
            slot_a,
            slot_b,
            status: opening_status(slot_a, slot_b),
            position: single_position(1, match_number, total_rounds),
        });
    }

    for round in 2..=total_rounds {
        for match_number in 1..=(size >> round) as u32 {
            matches.push(empty_match(
                round,
                match_number,
                single_position(round, match_number, total_rounds),
            ));
        }
    }

    let view = view_of(BracketFormat::SingleElimination, seeded.len(), &matches);
    Ok(GeneratedBracket { matches, view })
}

/// Generate a double elimination bracket.
///
/// The winners bracket uses the same seeding and round-1 pairing as single
/// elimination. Each winners match also names the losers-bracket match its
/// loser drops into. The losers bracket has `2 * winners_rounds - 2` rounds:
/// odd rounds pair survivors (round 1 pairs winners round-1 losers), even
/// rounds receive the losers of the next winners round into slot B. Grand
/// finals takes the winners champion in slot A and the losers champion in
/// slot B.
///
/// # Errors
///
/// * `BracketError::InsufficientParticipants` - Fewer than two participants
pub fn double_elimination<R: Rng + ?Sized>(
    participants: &[Participant],
    rng: &mut R,
) -> BracketResult<GeneratedBracket> {
    ensure_enough(participants)?;

    let seeded = seed_participants(participants, rng);
    // Two winners rounds at least, so a losers bracket exists
    let size = bracket_size(seeded.len()).max(4);
    let winners_rounds = size.trailing_zeros();
    let losers_rounds = losers_round_count(winners_rounds);

    let mut matches = Vec::new();

    // Winners bracket
    let pairs = first_round_pairs(&seeded, size);
    let first_round_byes: Vec<bool> = pairs.iter().map(|(_, b)| b.is_none()).collect();

    for (index, (slot_a, slot_b)) in pairs.into_iter().enumerate() {
        let match_number = index as u32 + 1;
        matches.push(NewMatch {
            round: 1,
            match_number,
            slot_a,
            slot_b,
            status: opening_status(slot_a, slot_b),
            position: winners_position(1, match_number, winners_rounds),
        });
    }

    for round in 2..=winners_rounds {
        for match_number in 1..=(size >> round) as u32 {
            matches.push(empty_match(
                round,
                match_number,
                winners_position(round, match_number, winners_rounds),
            ));
        }
    }

    // Losers bracket. A losers round-1 match is fed by two winners round-1
    // matches; byes there have no loser to drop.
    let mut void_first_round = Vec::new();
    for round in 1..=losers_rounds {
        for match_number in 1..=losers_match_count(size, round) {
            let (walkover, void) = match round {
                1 => {
                    let feeders = [2 * match_number - 1, 2 * match_number]
                        .iter()
                        .filter(|&&n| !first_round_byes[n as usize - 1])
                        .count();
                    (feeders == 1, feeders == 0)
                }
                2 => (void_first_round.contains(&match_number), false),
                _ => (false, false),
            };
            if void {
                void_first_round.push(match_number);
            }

            let position =
                losers_position(round, match_number, losers_rounds, walkover);
            let mut skeleton = empty_match(round, match_number, position);
            if void {
                skeleton.status = MatchStatus::Completed;
            }
            matches.push(skeleton);
        }
    }

    // Grand finals
    matches.push(empty_match(1, 1, BracketPosition::GrandFinals));

    let view = view_of(BracketFormat::DoubleElimination, seeded.len(), &matches);
    Ok(GeneratedBracket { matches, view })
}

fn ensure_enough(participants: &[Participant]) -> BracketResult<()> {
    if participants.len() < MIN_PARTICIPANTS {
        return Err(BracketError::InsufficientParticipants {
            needed: MIN_PARTICIPANTS,
            current: participants.len(),
        });
    }
    Ok(())
}

/// Round-1 slot assignments for a bracket of `size`.
///
/// The first `n - size/2` matches take consecutive seeded pairs, every
/// remaining match takes one participant in slot A with slot B left empty.
fn first_round_pairs(
    seeded: &[Participant],
    size: usize,
) -> Vec<(Option<ParticipantId>, Option<ParticipantId>)> {
    let match_count = size / 2;
    let paired = seeded.len().saturating_sub(match_count);

    let mut entrants = seeded.iter().map(Participant::entrant_id);
    (0..match_count)
        .map(|index| {
            let slot_a = entrants.next();
            let slot_b = if index < paired { entrants.next() } else { None };
            (slot_a, slot_b)
        })
        .collect()
}

fn opening_status(slot_a: Option<ParticipantId>, slot_b: Option<ParticipantId>) -> MatchStatus {
    if slot_a.is_some() && slot_b.is_some() {
        MatchStatus::Ready
    } else {
        MatchStatus::Pending
    }
}

fn empty_match(round: u32, match_number: u32, position: BracketPosition) -> NewMatch {
    NewMatch {
        round,
        match_number,
        slot_a: None,
        slot_b: None,
        status: MatchStatus::Pending,
        position,
    }
}

fn single_position(round: u32, match_number: u32, total_rounds: u32) -> BracketPosition {
    BracketPosition::Single {
        next_match_number: (round < total_rounds).then(|| match_number.div_ceil(2)),
        next_slot: Slot::fed_by(match_number),
    }
}

fn winners_position(round: u32, match_number: u32, winners_rounds: u32) -> BracketPosition {
    let is_winners_final = round == winners_rounds;
    let (drop_losers_round, drop_losers_position, drop_losers_slot) = if round == 1 {
        (1, match_number.div_ceil(2), Slot::fed_by(match_number))
    } else {
        (2 * round - 2, match_number, Slot::B)
    };

    BracketPosition::Winners {
        round,
        position: match_number,
        next_winners_match: (!is_winners_final).then(|| match_number.div_ceil(2)),
        // The winners champion takes slot A of grand finals
        next_winners_slot: if is_winners_final {
            Slot::A
        } else {
            Slot::fed_by(match_number)
        },
        drop_losers_round,
        drop_losers_position,
        drop_losers_slot,
        is_winners_final,
    }
}

fn losers_match_count(size: usize, round: u32) -> u32 {
    // Rounds 2k-1 and 2k both hold size / 2^(k+1) matches
    let k = round.div_ceil(2);
    (size >> (k + 1)) as u32
}

fn losers_position(
    round: u32,
    match_number: u32,
    losers_rounds: u32,
    walkover: bool,
) -> BracketPosition {
    let is_losers_final = round == losers_rounds;
    // Odd rounds feed slot A of the same-sized receiving round; even rounds
    // halve into the next pairing round.
    let (next_losers_match, next_losers_slot) = if is_losers_final {
        (None, Slot::B)
    } else if round % 2 == 1 {
        (Some(match_number), Slot::A)
    } else {
        (Some(match_number.div_ceil(2)), Slot::fed_by(match_number))
    };

    BracketPosition::Losers {
        round,
        position: match_number,
        next_losers_match,
        next_losers_slot,
        is_losers_final,
        walkover,
    }
}

fn view_of(format: BracketFormat, participant_count: usize, matches: &[NewMatch]) -> BracketView {
    let entries: Vec<ViewEntry> = matches.iter().map(ViewEntry::from).collect();
    BracketView::build(format, participant_count, &entries)
}
