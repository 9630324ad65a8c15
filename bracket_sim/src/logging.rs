//! Logging setup and structured log helpers.

use bracket_engine::bracket::{MatchId, ParticipantId, ParticipantStatus};
use bracket_engine::tournament::TournamentId;
use std::time::Duration;

/// Operations slower than this are logged at warn
const SLOW_OPERATION: Duration = Duration::from_secs(1);

/// Initialize logging with `env_logger`
///
/// The filter comes from `RUST_LOG`, defaulting to `info` with noisy
/// database logs at `warn`.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,sqlx=warn"))
        .format_target(false)
        .init();
}

/// Log a completed match
pub fn log_match_completed(
    tournament_id: TournamentId,
    match_id: MatchId,
    winner_id: ParticipantId,
    score: Option<(i32, i32)>,
) {
    match score {
        Some((a, b)) => log::info!(
            "tournament={} match={} winner={} score={}-{}",
            tournament_id,
            match_id,
            winner_id,
            a,
            b
        ),
        None => log::info!(
            "tournament={} match={} winner={} (unplayed)",
            tournament_id,
            match_id,
            winner_id
        ),
    }
}

/// Log a participant status or placement change
pub fn log_placement(
    tournament_id: TournamentId,
    participant_id: ParticipantId,
    status: ParticipantStatus,
    placement: Option<u32>,
) {
    match placement {
        Some(place) => log::info!(
            "tournament={} participant={} status={} placement={}",
            tournament_id,
            participant_id,
            status.as_str(),
            place
        ),
        None => log::debug!(
            "tournament={} participant={} status={}",
            tournament_id,
            participant_id,
            status.as_str()
        ),
    }
}

/// Log operation timing, warning when slow
pub fn log_slow_operation(operation: &str, elapsed: Duration) {
    if elapsed > SLOW_OPERATION {
        log::warn!(
            "PERFORMANCE: Slow operation {} took {}ms",
            operation,
            elapsed.as_millis()
        );
    } else {
        log::debug!("{} took {}ms", operation, elapsed.as_millis());
    }
}
