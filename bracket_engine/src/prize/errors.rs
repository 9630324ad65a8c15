//! Prize distribution error types.

use thiserror::Error;

use crate::bracket::BracketError;
use crate::tournament::{TournamentId, TournamentStatus};

/// Prize distribution errors
#[derive(Debug, Error)]
pub enum PrizeError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error raised by the bracket repository
    #[error("Bracket error: {0}")]
    Bracket(#[from] BracketError),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Prizes can only be paid once the champion is decided
    #[error("Tournament {tournament_id} is not completed (status {status})")]
    TournamentNotCompleted {
        tournament_id: TournamentId,
        status: TournamentStatus,
    },

    #[error("Tournament {0} has no first place participant")]
    NoChampion(TournamentId),

    /// Split shares must be non-empty and sum to 10 000 basis points
    #[error("Invalid prize split: {0}")]
    InvalidSplit(String),
}

impl PrizeError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            PrizeError::Database(_) => "Internal server error".to_string(),
            PrizeError::Bracket(e) => e.client_message(),
            PrizeError::TournamentNotFound(_) => "Tournament not found".to_string(),
            PrizeError::TournamentNotCompleted { .. } => {
                "Tournament is not completed".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for prize operations
pub type PrizeResult<T> = Result<T, PrizeError>;
