//! # Bracket Engine
//!
//! Tournament bracket generation and advancement for single and double
//! elimination.
//!
//! A tournament's participants are seeded into a match skeleton, persisted
//! once, and then mutated in place as results come in. Every completed match
//! carries a typed routing descriptor telling the engine where its winner
//! (and, in the winners bracket, its loser) goes next. The deciding match
//! completes the tournament, assigns placements and triggers prize
//! distribution.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Seeding, generators, advancement engine and bracket view
//! - [`tournament`]: Tournament models and the lifecycle manager
//! - [`prize`]: Placement-based prize distribution
//! - [`db`]: Repository traits with PostgreSQL and in-memory implementations
//! - [`events`]: Best-effort bracket event broadcasting
//! - [`config`]: Environment-driven configuration
//!
//! ## Example
//!
//! ```
//! use bracket_engine::bracket::{Participant, generator};
//! use bracket_engine::tournament::BracketFormat;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let players: Vec<Participant> = (1..=6)
//!     .map(|i| Participant::new(i, i, format!("player{i}")))
//!     .collect();
//!
//! let bracket = generator::generate(
//!     BracketFormat::SingleElimination,
//!     &players,
//!     &mut StdRng::seed_from_u64(7),
//! )
//! .unwrap();
//! assert_eq!(bracket.matches.len(), 7);
//! ```

pub mod bracket;
pub mod config;
pub mod db;
pub mod events;
pub mod prize;
pub mod tournament;

pub use bracket::{AdvancementEngine, BracketError, BracketResult, BracketView};
pub use config::{ConfigError, EngineConfig};
pub use events::{BracketEvent, ChannelBroadcaster, EventBroadcaster};
pub use prize::{LedgerPrizeDistributor, PrizeDistributor, PrizeError, PrizeSplit};
pub use tournament::{BracketFormat, TournamentManager};
