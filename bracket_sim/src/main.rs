//! Tournament simulator.
//!
//! Creates a tournament with generated participants, plays every ready match
//! with random scores until a champion is decided, then prints standings,
//! payouts and the final bracket as JSON.

mod config;
mod logging;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Error;
use bracket_engine::{
    bracket::{MatchStatus, Participant},
    config::ProcessEnv,
    db::{
        BracketRepository, Database, DatabaseConfig, InMemoryRepository, PayoutRepository,
    },
    events::{BracketEvent, ChannelBroadcaster, EventBroadcaster},
    prize::LedgerPrizeDistributor,
    tournament::{TournamentId, TournamentManager},
};
use log::info;
use pico_args::Arguments;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::{CliOverrides, SimConfig};

const HELP: &str = "\
Simulate a bracket tournament from registration to prize payout

USAGE:
  bracket_sim [OPTIONS]

OPTIONS:
  --players    N           Number of participants      [default: env SIM_PLAYERS or 8]
  --format     FORMAT      single or double            [default: env BRACKET_FORMAT or single]
  --prize-pool AMOUNT      Prize pool in minor units   [default: env SIM_PRIZE_POOL or 1000]
  --seed       N           Seed for shuffling and scores [default: env BRACKET_RNG_SEED or random]
  --db-url     URL         Run against PostgreSQL      [default: env DATABASE_URL or in-memory]

FLAGS:
  --seeded                 Give participants explicit seeds 1..N
  -h, --help               Print help information

ENVIRONMENT:
  PRIZE_SPLIT              Basis points per placement (e.g., 6000,3000,1000)
  EVENT_CHANNEL_CAPACITY   Bracket event buffer size
  RUST_LOG                 Log filter (e.g., debug)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        players: pargs.opt_value_from_str("--players")?,
        format: pargs.opt_value_from_str("--format")?,
        prize_pool: pargs.opt_value_from_str("--prize-pool")?,
        seed: pargs.opt_value_from_str("--seed")?,
        seeded: pargs.contains("--seeded"),
        database_url: pargs.opt_value_from_str("--db-url")?,
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", remaining);
    }

    logging::init();

    let config = SimConfig::from_env(overrides)?;
    info!(
        "Simulating {} tournament with {} participants",
        config.format.as_str(),
        config.players
    );

    let (tournaments, ledger) = open_storage(&config).await?;
    let prizes = Arc::new(LedgerPrizeDistributor::new(
        tournaments.clone(),
        ledger.clone(),
        config.engine.prize_split()?,
    ));

    let broadcaster = Arc::new(ChannelBroadcaster::new(config.engine.event_channel_capacity));
    let listener = tokio::spawn(log_events(broadcaster.subscribe()));

    let mut manager = TournamentManager::new(tournaments.clone(), prizes)
        .with_events(broadcaster.clone() as Arc<dyn EventBroadcaster>);
    if let Some(seed) = config.seed {
        manager = manager.with_rng_seed(seed);
    }

    let tournament = manager
        .create_tournament("Simulated Cup", config.format, config.prize_pool)
        .await?;
    register_participants(&manager, tournament.id, &config).await?;

    let started = Instant::now();
    manager.start_tournament(tournament.id).await?;
    let played = play_out(&manager, tournament.id, config.seed).await?;
    logging::log_slow_operation("tournament playout", started.elapsed());
    info!("Tournament {}: {} matches played", tournament.id, played);

    let report = serde_json::json!({
        "tournament": tournaments.load_tournament(tournament.id).await?,
        "standings": manager.standings(tournament.id).await?,
        "payouts": ledger.list_payouts(tournament.id).await?,
        "bracket": manager.bracket_view(tournament.id).await?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    // Closing every sender ends the listener
    drop(manager);
    drop(broadcaster);
    listener.await?;

    Ok(())
}

async fn open_storage(
    config: &SimConfig,
) -> Result<(Arc<dyn BracketRepository>, Arc<dyn PayoutRepository>), Error> {
    match &config.database_url {
        Some(url) => {
            info!("Connecting to database");
            let db_config = DatabaseConfig::with_url(&ProcessEnv, url.clone())?;
            let db = Database::connect(&db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

            let repo = Arc::new(db.repository());
            info!("Database connected successfully");

            let tournaments: Arc<dyn BracketRepository> = repo.clone();
            let ledger: Arc<dyn PayoutRepository> = repo;
            Ok((tournaments, ledger))
        }
        None => {
            let repo = Arc::new(InMemoryRepository::new());
            let tournaments: Arc<dyn BracketRepository> = repo.clone();
            let ledger: Arc<dyn PayoutRepository> = repo;
            Ok((tournaments, ledger))
        }
    }
}

async fn register_participants(
    manager: &TournamentManager,
    tournament_id: TournamentId,
    config: &SimConfig,
) -> Result<(), Error> {
    for i in 1..=config.players {
        let mut participant = Participant::new(0, 10_000 + i as i64, format!("Player {i}"));
        if config.seeded {
            participant = participant.with_seed(i as u32);
        }
        manager
            .register_participant(tournament_id, &participant)
            .await?;
    }
    Ok(())
}

/// Report random scores for ready matches until none remain
async fn play_out(
    manager: &TournamentManager,
    tournament_id: TournamentId,
    seed: Option<u64>,
) -> Result<usize, Error> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut played = 0;

    loop {
        let ready: Vec<_> = manager
            .matches(tournament_id)
            .await?
            .into_iter()
            .filter(|m| m.status == MatchStatus::Ready)
            .collect();
        if ready.is_empty() {
            return Ok(played);
        }

        for m in ready {
            let winning = rng.random_range(1..=5);
            let losing = rng.random_range(0..winning);
            let (score_a, score_b) = if rng.random_bool(0.5) {
                (winning, losing)
            } else {
                (losing, winning)
            };
            manager
                .report_score(tournament_id, m.id, score_a, score_b)
                .await?;
            played += 1;
        }
    }
}

async fn log_events(mut events: broadcast::Receiver<BracketEvent>) {
    loop {
        match events.recv().await {
            Ok(BracketEvent::MatchCompleted {
                tournament_id,
                match_id,
                winner_id,
                score_a,
                score_b,
            }) => {
                let score = score_a.zip(score_b);
                logging::log_match_completed(tournament_id, match_id, winner_id, score);
            }
            Ok(BracketEvent::PlacementAssigned {
                tournament_id,
                participant_id,
                status,
                placement,
            }) => logging::log_placement(tournament_id, participant_id, status, placement),
            Ok(BracketEvent::TournamentStatusChanged {
                tournament_id,
                status,
            }) => info!("Tournament {}: now {}", tournament_id, status),
            Ok(event) => log::trace!("Tournament {}: {:?}", event.tournament_id(), event),
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Event listener lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
