//! Tournament lifecycle around the bracket engine.
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::db::InMemoryRepository;
//! use bracket_engine::prize::{LedgerPrizeDistributor, PrizeSplit};
//! use bracket_engine::tournament::{BracketFormat, TournamentManager};
//! use bracket_engine::bracket::Participant;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Arc::new(InMemoryRepository::new());
//!     let prizes = Arc::new(LedgerPrizeDistributor::new(
//!         repo.clone(),
//!         repo.clone(),
//!         PrizeSplit::default(),
//!     ));
//!     let manager = TournamentManager::new(repo, prizes);
//!
//!     let tournament = manager
//!         .create_tournament("Friday Cup", BracketFormat::DoubleElimination, 5_000)
//!         .await?;
//!     for user_id in 1..=8 {
//!         let player = Participant::new(0, user_id, format!("player{user_id}"));
//!         manager.register_participant(tournament.id, &player).await?;
//!     }
//!
//!     let view = manager.start_tournament(tournament.id).await?;
//!     println!("{}", serde_json::to_string_pretty(&view)?);
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::TournamentManager;
pub use models::{BracketFormat, Tournament, TournamentId, TournamentStatus};
