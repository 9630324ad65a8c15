//! Bracket generation and advancement.
//!
//! - [`seeding`]: orders participants for bracket entry
//! - [`generator`]: builds single and double elimination match skeletons
//! - [`engine`]: routes results downstream, processes byes and walkovers
//! - [`view`]: read-only labeled projection of a bracket

pub mod engine;
pub mod errors;
pub mod generator;
pub mod models;
pub mod seeding;
pub mod view;

pub use engine::{AdvancementEngine, THIRD_PLACE};
pub use errors::{BracketError, BracketResult};
pub use generator::{GeneratedBracket, MIN_PARTICIPANTS, bracket_size, losers_round_count};
pub use models::{
    BracketKind, BracketPosition, Match, MatchId, MatchResult, MatchStatus, NewMatch, Participant,
    ParticipantId, ParticipantStatus, Slot,
};
pub use seeding::seed_participants;
pub use view::{BracketView, MatchView, RoundView, ViewEntry, round_label};
