//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    /// Accepting registrations
    RegistrationOpen,
    /// Bracket generated, matches being played
    InProgress,
    /// Champion decided
    Completed,
    /// Tournament cancelled
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::RegistrationOpen => "registration_open",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "registration_open" => Some(TournamentStatus::RegistrationOpen),
            "in_progress" => Some(TournamentStatus::InProgress),
            "completed" => Some(TournamentStatus::Completed),
            "cancelled" => Some(TournamentStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled tournaments never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bracket format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketFormat {
    SingleElimination,
    DoubleElimination,
}

impl BracketFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketFormat::SingleElimination => "single_elimination",
            BracketFormat::DoubleElimination => "double_elimination",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "single_elimination" => Some(BracketFormat::SingleElimination),
            "double_elimination" => Some(BracketFormat::DoubleElimination),
            _ => None,
        }
    }
}

impl std::str::FromStr for BracketFormat {
    type Err = String;

    /// Accepts `single`/`double` as well as the storage names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "single_elimination" | "se" => Ok(BracketFormat::SingleElimination),
            "double" | "double_elimination" | "de" => Ok(BracketFormat::DoubleElimination),
            other => Err(format!("unknown bracket format '{other}'")),
        }
    }
}

/// Tournament record, as far as the bracket engine is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: BracketFormat,
    pub status: TournamentStatus,
    /// Prize pool in minor currency units (credits)
    pub prize_pool: i64,
    pub prizes_distributed: bool,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Create a tournament open for registration
    pub fn new(
        id: TournamentId,
        name: impl Into<String>,
        format: BracketFormat,
        prize_pool: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            format,
            status: TournamentStatus::RegistrationOpen,
            prize_pool,
            prizes_distributed: false,
            created_at: Utc::now(),
        }
    }
}
