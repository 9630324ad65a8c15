//! Bracket data models: participants, matches and routing descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tournament::TournamentId;

/// Match ID type
pub type MatchId = i64;

/// Participant ID type.
///
/// Slots and placements always carry the *entrant* id, i.e. the id of the
/// underlying user or team (see [`Participant::entrant_id`]).
pub type ParticipantId = i64;

/// One of the two participant positions of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Slot a feeder match lands in on its downstream match.
    ///
    /// Odd match numbers feed slot A, even match numbers feed slot B.
    pub fn fed_by(match_number: u32) -> Self {
        if match_number % 2 == 1 { Slot::A } else { Slot::B }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::A => write!(f, "A"),
            Slot::B => write!(f, "B"),
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Waiting for one or both participants
    Pending,
    /// Both slots filled, result can be reported
    Ready,
    /// Result recorded
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Ready => "ready",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MatchStatus::Pending),
            "ready" => Some(MatchStatus::Ready),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

/// Which bracket of a tournament a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketKind {
    /// The only bracket of a single-elimination tournament
    Single,
    Winners,
    Losers,
    GrandFinals,
}

impl BracketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketKind::Single => "single",
            BracketKind::Winners => "winners",
            BracketKind::Losers => "losers",
            BracketKind::GrandFinals => "grand_finals",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "single" => Some(BracketKind::Single),
            "winners" => Some(BracketKind::Winners),
            "losers" => Some(BracketKind::Losers),
            "grand_finals" => Some(BracketKind::GrandFinals),
            _ => None,
        }
    }
}

/// Routing descriptor stored on every match.
///
/// Tells the advancement engine where the winner (and, in the winners
/// bracket, the loser) of a match goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "bracket", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketPosition {
    /// Single elimination. `next_match_number == None` marks the final.
    Single {
        next_match_number: Option<u32>,
        next_slot: Slot,
    },
    /// Double elimination, winners bracket
    Winners {
        round: u32,
        position: u32,
        next_winners_match: Option<u32>,
        next_winners_slot: Slot,
        drop_losers_round: u32,
        drop_losers_position: u32,
        drop_losers_slot: Slot,
        is_winners_final: bool,
    },
    /// Double elimination, losers bracket
    Losers {
        round: u32,
        position: u32,
        next_losers_match: Option<u32>,
        next_losers_slot: Slot,
        is_losers_final: bool,
        /// Only one entrant will ever arrive; they advance without play.
        #[serde(default)]
        walkover: bool,
    },
    GrandFinals,
}

impl BracketPosition {
    pub fn bracket(&self) -> BracketKind {
        match self {
            BracketPosition::Single { .. } => BracketKind::Single,
            BracketPosition::Winners { .. } => BracketKind::Winners,
            BracketPosition::Losers { .. } => BracketKind::Losers,
            BracketPosition::GrandFinals => BracketKind::GrandFinals,
        }
    }

    /// Whether completing this match decides the tournament
    pub fn is_decider(&self) -> bool {
        matches!(
            self,
            BracketPosition::Single {
                next_match_number: None,
                ..
            } | BracketPosition::GrandFinals
        )
    }

    pub fn is_walkover(&self) -> bool {
        matches!(self, BracketPosition::Losers { walkover: true, .. })
    }
}

/// Participant status within a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Registered,
    CheckedIn,
    /// Playing in a generated bracket
    Active,
    Eliminated,
    Winner,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Registered => "registered",
            ParticipantStatus::CheckedIn => "checked_in",
            ParticipantStatus::Active => "active",
            ParticipantStatus::Eliminated => "eliminated",
            ParticipantStatus::Winner => "winner",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(ParticipantStatus::Registered),
            "checked_in" => Some(ParticipantStatus::CheckedIn),
            "active" => Some(ParticipantStatus::Active),
            "eliminated" => Some(ParticipantStatus::Eliminated),
            "winner" => Some(ParticipantStatus::Winner),
            _ => None,
        }
    }
}

/// Tournament participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Registration record ID
    pub id: i64,
    /// Solo entrant
    pub user_id: Option<i64>,
    /// Team entrant
    pub team_id: Option<i64>,
    pub display_name: String,
    /// Explicit seed (lower is stronger)
    pub seed: Option<u32>,
    pub status: ParticipantStatus,
    /// Final placement (1st, 2nd, 3rd), `None` while unranked
    pub placement: Option<u32>,
}

impl Participant {
    /// Create a checked-in solo participant
    pub fn new(id: i64, user_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            user_id: Some(user_id),
            team_id: None,
            display_name: display_name.into(),
            seed: None,
            status: ParticipantStatus::CheckedIn,
            placement: None,
        }
    }

    /// Create a checked-in team participant
    pub fn team(id: i64, team_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            team_id: Some(team_id),
            user_id: None,
            ..Self::new(id, 0, display_name)
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Identifier used in match slots: the user, else the team, else the
    /// registration record itself.
    pub fn entrant_id(&self) -> ParticipantId {
        self.user_id.or(self.team_id).unwrap_or(self.id)
    }
}

/// Match skeleton produced by the generators, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub round: u32,
    pub match_number: u32,
    pub slot_a: Option<ParticipantId>,
    pub slot_b: Option<ParticipantId>,
    pub status: MatchStatus,
    pub position: BracketPosition,
}

impl NewMatch {
    pub fn bracket(&self) -> BracketKind {
        self.position.bracket()
    }
}

/// Recorded outcome of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner_id: ParticipantId,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
}

impl MatchResult {
    pub fn scored(winner_id: ParticipantId, score_a: i32, score_b: i32) -> Self {
        Self {
            winner_id,
            score_a: Some(score_a),
            score_b: Some(score_b),
        }
    }

    /// Result synthesized for a bye or walkover
    pub fn unplayed(winner_id: ParticipantId) -> Self {
        Self {
            winner_id,
            score_a: None,
            score_b: None,
        }
    }
}

/// Persisted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub bracket: BracketKind,
    pub round: u32,
    pub match_number: u32,
    pub slot_a: Option<ParticipantId>,
    pub slot_b: Option<ParticipantId>,
    pub status: MatchStatus,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub winner_id: Option<ParticipantId>,
    /// `None` when missing or unreadable in storage
    pub position: Option<BracketPosition>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn from_new(id: MatchId, tournament_id: TournamentId, new: &NewMatch) -> Self {
        Self {
            id,
            tournament_id,
            bracket: new.bracket(),
            round: new.round,
            match_number: new.match_number,
            slot_a: new.slot_a,
            slot_b: new.slot_b,
            status: new.status,
            score_a: None,
            score_b: None,
            winner_id: None,
            position: Some(new.position.clone()),
            completed_at: None,
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<ParticipantId> {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
        }
    }

    pub fn is_full(&self) -> bool {
        self.slot_a.is_some() && self.slot_b.is_some()
    }

    pub fn entrant_count(&self) -> usize {
        usize::from(self.slot_a.is_some()) + usize::from(self.slot_b.is_some())
    }

    /// The single occupant of a match with exactly one filled slot
    pub fn sole_entrant(&self) -> Option<ParticipantId> {
        match (self.slot_a, self.slot_b) {
            (Some(id), None) | (None, Some(id)) => Some(id),
            _ => None,
        }
    }

    /// The other occupant, `None` on a bye
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        if self.slot_a == Some(participant) {
            self.slot_b
        } else {
            self.slot_a
        }
    }

    pub fn apply_result(&mut self, result: &MatchResult, completed_at: DateTime<Utc>) {
        self.status = MatchStatus::Completed;
        self.winner_id = Some(result.winner_id);
        self.score_a = result.score_a;
        self.score_b = result.score_b;
        self.completed_at = Some(completed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match(slot_a: Option<i64>, slot_b: Option<i64>) -> Match {
        Match::from_new(
            1,
            1,
            &NewMatch {
                round: 1,
                match_number: 1,
                slot_a,
                slot_b,
                status: MatchStatus::Pending,
                position: BracketPosition::Single {
                    next_match_number: Some(1),
                    next_slot: Slot::A,
                },
            },
        )
    }

    #[test]
    fn test_slot_fed_by_alternates() {
        assert_eq!(Slot::fed_by(1), Slot::A);
        assert_eq!(Slot::fed_by(2), Slot::B);
        assert_eq!(Slot::fed_by(7), Slot::A);
        assert_eq!(Slot::fed_by(8), Slot::B);
    }

    #[test]
    fn test_entrant_id_prefers_user_then_team() {
        let solo = Participant::new(10, 100, "solo");
        assert_eq!(solo.entrant_id(), 100);

        let team = Participant::team(11, 200, "team");
        assert_eq!(team.entrant_id(), 200);

        let bare = Participant {
            user_id: None,
            team_id: None,
            ..Participant::new(12, 0, "bare")
        };
        assert_eq!(bare.entrant_id(), 12);
    }

    #[test]
    fn test_opponent_of_and_bye() {
        let full = sample_match(Some(1), Some(2));
        assert_eq!(full.opponent_of(1), Some(2));
        assert_eq!(full.opponent_of(2), Some(1));
        assert!(full.is_full());

        let bye = sample_match(Some(1), None);
        assert_eq!(bye.opponent_of(1), None);
        assert_eq!(bye.sole_entrant(), Some(1));
        assert_eq!(bye.entrant_count(), 1);
    }

    #[test]
    fn test_position_serializes_tagged() {
        let position = BracketPosition::Losers {
            round: 2,
            position: 1,
            next_losers_match: None,
            next_losers_slot: Slot::A,
            is_losers_final: true,
            walkover: false,
        };
        let json = serde_json::to_value(&position).unwrap();
        assert_eq!(json["bracket"], "LOSERS");
        assert_eq!(json["is_losers_final"], true);

        let back: BracketPosition = serde_json::from_value(json).unwrap();
        assert_eq!(back, position);
        assert_eq!(back.bracket(), BracketKind::Losers);
    }

    #[test]
    fn test_decider_positions() {
        assert!(BracketPosition::GrandFinals.is_decider());
        assert!(
            BracketPosition::Single {
                next_match_number: None,
                next_slot: Slot::A
            }
            .is_decider()
        );
        assert!(
            !BracketPosition::Single {
                next_match_number: Some(1),
                next_slot: Slot::B
            }
            .is_decider()
        );
    }

    #[test]
    fn test_status_db_strings() {
        for status in [MatchStatus::Pending, MatchStatus::Ready, MatchStatus::Completed] {
            assert_eq!(MatchStatus::from_db(status.as_str()), Some(status));
        }
        assert_eq!(MatchStatus::from_db("bogus"), None);
    }
}
