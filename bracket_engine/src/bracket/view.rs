//! Read-only bracket projection used to render a bracket.

use serde::{Deserialize, Serialize};

use super::models::{BracketKind, Match, MatchStatus, NewMatch, ParticipantId};
use crate::tournament::BracketFormat;

/// Label for a round, counted back from the final.
///
/// 1 → "Finals", 2 → "Semi-Finals", 3 → "Quarter-Finals", else "Round N".
pub fn round_label(round: u32, total_rounds: u32) -> String {
    match (total_rounds + 1).saturating_sub(round) {
        1 => "Finals".to_string(),
        2 => "Semi-Finals".to_string(),
        3 => "Quarter-Finals".to_string(),
        _ => format!("Round {round}"),
    }
}

fn losers_round_label(round: u32, losers_rounds: u32) -> String {
    if round == losers_rounds {
        "Losers Finals".to_string()
    } else {
        format!("Losers Round {round}")
    }
}

/// A single match as shown in the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub match_number: u32,
    pub slot_a: Option<ParticipantId>,
    pub slot_b: Option<ParticipantId>,
    pub status: MatchStatus,
    pub winner_id: Option<ParticipantId>,
}

/// A labeled round of matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub round: u32,
    pub name: String,
    pub matches: Vec<MatchView>,
}

/// Bracket projection, tagged by format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketView {
    SingleElimination {
        total_rounds: u32,
        participant_count: usize,
        rounds: Vec<RoundView>,
    },
    DoubleElimination {
        winners_rounds: u32,
        losers_rounds: u32,
        participant_count: usize,
        winners: Vec<RoundView>,
        losers: Vec<RoundView>,
        grand_finals: Vec<RoundView>,
    },
}

/// Where a match sits in the bracket, plus what to show for it
#[derive(Debug, Clone)]
pub struct ViewEntry {
    pub bracket: BracketKind,
    pub round: u32,
    pub view: MatchView,
}

impl From<&NewMatch> for ViewEntry {
    fn from(m: &NewMatch) -> Self {
        Self {
            bracket: m.bracket(),
            round: m.round,
            view: MatchView {
                match_number: m.match_number,
                slot_a: m.slot_a,
                slot_b: m.slot_b,
                status: m.status,
                winner_id: None,
            },
        }
    }
}

impl From<&Match> for ViewEntry {
    fn from(m: &Match) -> Self {
        Self {
            bracket: m.bracket,
            round: m.round,
            view: MatchView {
                match_number: m.match_number,
                slot_a: m.slot_a,
                slot_b: m.slot_b,
                status: m.status,
                winner_id: m.winner_id,
            },
        }
    }
}

impl BracketView {
    /// Build the projection from match entries of one tournament
    pub fn build(format: BracketFormat, participant_count: usize, entries: &[ViewEntry]) -> Self {
        match format {
            BracketFormat::SingleElimination => {
                let total_rounds = max_round(entries, BracketKind::Single);
                BracketView::SingleElimination {
                    total_rounds,
                    participant_count,
                    rounds: rounds_of(entries, BracketKind::Single, |round| {
                        round_label(round, total_rounds)
                    }),
                }
            }
            BracketFormat::DoubleElimination => {
                let winners_rounds = max_round(entries, BracketKind::Winners);
                let losers_rounds = max_round(entries, BracketKind::Losers);
                BracketView::DoubleElimination {
                    winners_rounds,
                    losers_rounds,
                    participant_count,
                    winners: rounds_of(entries, BracketKind::Winners, |round| {
                        format!("Winners {}", round_label(round, winners_rounds))
                    }),
                    losers: rounds_of(entries, BracketKind::Losers, |round| {
                        losers_round_label(round, losers_rounds)
                    }),
                    grand_finals: rounds_of(entries, BracketKind::GrandFinals, |_| {
                        "Grand Finals".to_string()
                    }),
                }
            }
        }
    }

    pub fn format(&self) -> BracketFormat {
        match self {
            BracketView::SingleElimination { .. } => BracketFormat::SingleElimination,
            BracketView::DoubleElimination { .. } => BracketFormat::DoubleElimination,
        }
    }

    pub fn participant_count(&self) -> usize {
        match self {
            BracketView::SingleElimination {
                participant_count, ..
            }
            | BracketView::DoubleElimination {
                participant_count, ..
            } => *participant_count,
        }
    }
}

fn max_round(entries: &[ViewEntry], bracket: BracketKind) -> u32 {
    entries
        .iter()
        .filter(|e| e.bracket == bracket)
        .map(|e| e.round)
        .max()
        .unwrap_or(0)
}

fn rounds_of(
    entries: &[ViewEntry],
    bracket: BracketKind,
    label: impl Fn(u32) -> String,
) -> Vec<RoundView> {
    (1..=max_round(entries, bracket))
        .map(|round| {
            let mut matches: Vec<MatchView> = entries
                .iter()
                .filter(|e| e.bracket == bracket && e.round == round)
                .map(|e| e.view.clone())
                .collect();
            matches.sort_by_key(|m| m.match_number);

            RoundView {
                round,
                name: label(round),
                matches,
            }
        })
        .collect()
}
