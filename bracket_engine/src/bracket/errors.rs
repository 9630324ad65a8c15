//! Bracket error types.

use thiserror::Error;

use super::models::{MatchId, MatchStatus, ParticipantId};
use crate::tournament::{TournamentId, TournamentStatus};

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Match {match_id} does not belong to tournament {tournament_id}")]
    MatchNotInTournament {
        match_id: MatchId,
        tournament_id: TournamentId,
    },

    #[error("Match {match_id} is not ready (status {status:?})")]
    MatchNotReady {
        match_id: MatchId,
        status: MatchStatus,
    },

    #[error("Match {0} already completed")]
    MatchAlreadyCompleted(MatchId),

    #[error("Tied scores are not allowed: {0}-{0}")]
    TiedScore(i32),

    #[error("Invalid score: {0}")]
    InvalidScore(i32),

    #[error("Participant {participant_id} is not the recorded winner of match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        participant_id: ParticipantId,
    },

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    #[error("Bracket already generated for tournament {0}")]
    BracketAlreadyGenerated(TournamentId),

    #[error("Participant {0} is already registered")]
    AlreadyRegistered(ParticipantId),
}

impl BracketError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Serialization(_) => {
                "Internal server error".to_string()
            }
            BracketError::TournamentNotFound(_) => "Tournament not found".to_string(),
            BracketError::MatchNotFound(_) => "Match not found".to_string(),
            BracketError::MatchNotInTournament { .. } => {
                "Match does not belong to this tournament".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
