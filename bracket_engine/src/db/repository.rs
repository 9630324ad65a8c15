//! Repository trait definitions for testability and dependency injection.
//!
//! The bracket engine only ever talks to storage through these traits. The
//! PostgreSQL implementation lives here, the in-memory one in
//! [`super::memory`].

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::bracket::{
    BracketError, BracketKind, BracketPosition, BracketResult, BracketView, Match, MatchId,
    MatchResult, MatchStatus, NewMatch, Participant, ParticipantId, ParticipantStatus, Slot,
};
use crate::prize::{Payout, PrizeResult};
use crate::tournament::{BracketFormat, Tournament, TournamentId, TournamentStatus};

/// Trait for tournament, participant and match storage
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Create a tournament open for registration
    async fn create_tournament(
        &self,
        name: &str,
        format: BracketFormat,
        prize_pool: i64,
    ) -> BracketResult<Tournament>;

    /// Load a tournament
    async fn load_tournament(&self, tournament_id: TournamentId)
    -> BracketResult<Option<Tournament>>;

    /// Change tournament status only if it currently is `from`.
    ///
    /// Returns whether the transition was applied.
    async fn transition_tournament(
        &self,
        tournament_id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> BracketResult<bool>;

    /// Register a participant, returning it with its assigned ID
    async fn register_participant(
        &self,
        tournament_id: TournamentId,
        participant: &Participant,
    ) -> BracketResult<Participant>;

    /// List all participants of a tournament
    async fn list_participants(&self, tournament_id: TournamentId)
    -> BracketResult<Vec<Participant>>;

    /// Set status and placement of the participant with the given entrant ID
    async fn update_participant_placement(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        status: ParticipantStatus,
        placement: Option<u32>,
    ) -> BracketResult<()>;

    /// Load a match by ID
    async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// Find a match by its place in the bracket
    async fn find_match(
        &self,
        tournament_id: TournamentId,
        bracket: BracketKind,
        round: u32,
        match_number: u32,
    ) -> BracketResult<Option<Match>>;

    /// List all matches of a tournament, ordered by bracket, round, number
    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>>;

    /// Fill an empty slot. An occupied slot is left untouched.
    ///
    /// Returns the match as stored after the write.
    async fn update_match_slot(
        &self,
        match_id: MatchId,
        slot: Slot,
        participant_id: ParticipantId,
    ) -> BracketResult<Match>;

    /// Set the status of a match that is not completed
    async fn update_match_status(&self, match_id: MatchId, status: MatchStatus)
    -> BracketResult<()>;

    /// Record a result, only if the match is not completed yet.
    ///
    /// Returns whether this call completed the match.
    async fn complete_match(&self, match_id: MatchId, result: &MatchResult) -> BracketResult<bool>;

    /// Persist a generated match skeleton
    async fn create_matches(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> BracketResult<Vec<Match>>;

    /// Persist the bracket visualization generated with the skeleton
    async fn create_bracket_record(
        &self,
        tournament_id: TournamentId,
        view: &BracketView,
    ) -> BracketResult<()>;

    /// Load the bracket visualization generated with the skeleton
    async fn load_bracket_record(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<BracketView>>;
}

/// Trait for the prize payout ledger
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Insert a payout unless its idempotency key already exists.
    ///
    /// Returns whether the payout was inserted.
    async fn record_payout(&self, payout: &Payout) -> PrizeResult<bool>;

    /// List payouts of a tournament
    async fn list_payouts(&self, tournament_id: TournamentId) -> PrizeResult<Vec<Payout>>;

    /// Flag a tournament's prizes as distributed.
    ///
    /// Returns false if the flag was already set.
    async fn mark_prizes_distributed(&self, tournament_id: TournamentId) -> PrizeResult<bool>;
}

const MATCH_COLUMNS: &str = "id, tournament_id, bracket, round, match_number, slot_a, slot_b, \
     status, score_a, score_b, winner_id, position, completed_at";

const TOURNAMENT_COLUMNS: &str = "id, name, format, status, prize_pool, prizes_distributed, created_at";

const PARTICIPANT_COLUMNS: &str = "id, user_id, team_id, display_name, seed, status, placement";

/// Default PostgreSQL implementation of the bracket repositories
#[derive(Clone)]
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn match_from_row(row: &PgRow) -> Match {
    let id: MatchId = row.get("id");
    let bracket: String = row.get("bracket");
    let status: String = row.get("status");

    let position = row
        .get::<Option<serde_json::Value>, _>("position")
        .and_then(|value| match serde_json::from_value::<BracketPosition>(value) {
            Ok(position) => Some(position),
            Err(e) => {
                log::warn!("Match {}: unreadable bracket position: {}", id, e);
                None
            }
        });

    Match {
        id,
        tournament_id: row.get("tournament_id"),
        bracket: BracketKind::from_db(&bracket).unwrap_or(BracketKind::Single),
        round: row.get::<i32, _>("round") as u32,
        match_number: row.get::<i32, _>("match_number") as u32,
        slot_a: row.get("slot_a"),
        slot_b: row.get("slot_b"),
        status: MatchStatus::from_db(&status).unwrap_or(MatchStatus::Pending),
        score_a: row.get("score_a"),
        score_b: row.get("score_b"),
        winner_id: row.get("winner_id"),
        position,
        completed_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("completed_at")
            .map(|dt| dt.and_utc()),
    }
}

fn tournament_from_row(row: &PgRow) -> Tournament {
    let format: String = row.get("format");
    let status: String = row.get("status");

    Tournament {
        id: row.get("id"),
        name: row.get("name"),
        format: BracketFormat::from_db(&format).unwrap_or(BracketFormat::SingleElimination),
        status: TournamentStatus::from_db(&status).unwrap_or(TournamentStatus::RegistrationOpen),
        prize_pool: row.get("prize_pool"),
        prizes_distributed: row.get("prizes_distributed"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn participant_from_row(row: &PgRow) -> Participant {
    let status: String = row.get("status");

    Participant {
        id: row.get("id"),
        user_id: row.get("user_id"),
        team_id: row.get("team_id"),
        display_name: row.get("display_name"),
        seed: row.get::<Option<i32>, _>("seed").map(|s| s as u32),
        status: ParticipantStatus::from_db(&status).unwrap_or(ParticipantStatus::Registered),
        placement: row.get::<Option<i32>, _>("placement").map(|p| p as u32),
    }
}

fn payout_from_row(row: &PgRow) -> Payout {
    Payout {
        tournament_id: row.get("tournament_id"),
        participant_id: row.get("participant_id"),
        placement: row.get::<i32, _>("placement") as u32,
        amount: row.get("amount"),
        idempotency_key: row.get("idempotency_key"),
        description: row.get("description"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn create_tournament(
        &self,
        name: &str,
        format: BracketFormat,
        prize_pool: i64,
    ) -> BracketResult<Tournament> {
        let row = sqlx::query(&format!(
            "INSERT INTO tournaments (name, format, status, prize_pool)
             VALUES ($1, $2, $3, $4)
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(name)
        .bind(format.as_str())
        .bind(TournamentStatus::RegistrationOpen.as_str())
        .bind(prize_pool)
        .fetch_one(&self.pool)
        .await?;

        Ok(tournament_from_row(&row))
    }

    async fn load_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn transition_tournament(
        &self,
        tournament_id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> BracketResult<bool> {
        let result = sqlx::query("UPDATE tournaments SET status = $3 WHERE id = $1 AND status = $2")
            .bind(tournament_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn register_participant(
        &self,
        tournament_id: TournamentId,
        participant: &Participant,
    ) -> BracketResult<Participant> {
        let row = sqlx::query(&format!(
            "INSERT INTO tournament_participants
                (tournament_id, user_id, team_id, display_name, seed, status, placement)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(tournament_id)
        .bind(participant.user_id)
        .bind(participant.team_id)
        .bind(&participant.display_name)
        .bind(participant.seed.map(|s| s as i32))
        .bind(participant.status.as_str())
        .bind(participant.placement.map(|p| p as i32))
        .fetch_one(&self.pool)
        .await?;

        Ok(participant_from_row(&row))
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM tournament_participants
             WHERE tournament_id = $1
             ORDER BY id"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(participant_from_row).collect())
    }

    async fn update_participant_placement(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        status: ParticipantStatus,
        placement: Option<u32>,
    ) -> BracketResult<()> {
        // Slots carry the entrant id: user, else team, else the record id
        sqlx::query(
            "UPDATE tournament_participants
             SET status = $3, placement = $4
             WHERE tournament_id = $1 AND COALESCE(user_id, team_id, id) = $2",
        )
        .bind(tournament_id)
        .bind(participant_id)
        .bind(status.as_str())
        .bind(placement.map(|p| p as i32))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        bracket: BracketKind,
        round: u32,
        match_number: u32,
    ) -> BracketResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1 AND bracket = $2 AND round = $3 AND match_number = $4"
        ))
        .bind(tournament_id)
        .bind(bracket.as_str())
        .bind(round as i32)
        .bind(match_number as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1
             ORDER BY CASE bracket
                 WHEN 'single' THEN 0 WHEN 'winners' THEN 1 WHEN 'losers' THEN 2 ELSE 3
             END, round, match_number"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn update_match_slot(
        &self,
        match_id: MatchId,
        slot: Slot,
        participant_id: ParticipantId,
    ) -> BracketResult<Match> {
        let column = match slot {
            Slot::A => "slot_a",
            Slot::B => "slot_b",
        };

        let row = sqlx::query(&format!(
            "UPDATE matches SET {column} = COALESCE({column}, $2)
             WHERE id = $1
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(match_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BracketError::MatchNotFound(match_id))?;

        Ok(match_from_row(&row))
    }

    async fn update_match_status(
        &self,
        match_id: MatchId,
        status: MatchStatus,
    ) -> BracketResult<()> {
        sqlx::query("UPDATE matches SET status = $2 WHERE id = $1 AND status <> 'completed'")
            .bind(match_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn complete_match(&self, match_id: MatchId, result: &MatchResult) -> BracketResult<bool> {
        let outcome = sqlx::query(
            "UPDATE matches
             SET status = 'completed', winner_id = $2, score_a = $3, score_b = $4,
                 completed_at = NOW()
             WHERE id = $1 AND status <> 'completed'",
        )
        .bind(match_id)
        .bind(result.winner_id)
        .bind(result.score_a)
        .bind(result.score_b)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    async fn create_matches(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> BracketResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(matches.len());

        for new in matches {
            let row = sqlx::query(
                "INSERT INTO matches
                    (tournament_id, bracket, round, match_number, slot_a, slot_b, status, position)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING id",
            )
            .bind(tournament_id)
            .bind(new.bracket().as_str())
            .bind(new.round as i32)
            .bind(new.match_number as i32)
            .bind(new.slot_a)
            .bind(new.slot_b)
            .bind(new.status.as_str())
            .bind(serde_json::to_value(&new.position)?)
            .fetch_one(&mut *tx)
            .await?;

            created.push(Match::from_new(row.get("id"), tournament_id, new));
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn create_bracket_record(
        &self,
        tournament_id: TournamentId,
        view: &BracketView,
    ) -> BracketResult<()> {
        sqlx::query("INSERT INTO brackets (tournament_id, bracket_data) VALUES ($1, $2)")
            .bind(tournament_id)
            .bind(serde_json::to_value(view)?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn load_bracket_record(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<BracketView>> {
        let row = sqlx::query("SELECT bracket_data FROM brackets WHERE tournament_id = $1")
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_value(row.get("bracket_data"))?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PayoutRepository for PgBracketRepository {
    async fn record_payout(&self, payout: &Payout) -> PrizeResult<bool> {
        let result = sqlx::query(
            "INSERT INTO prize_payouts
                (tournament_id, participant_id, placement, amount, idempotency_key, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (idempotency_key) DO NOTHING",
        )
        .bind(payout.tournament_id)
        .bind(payout.participant_id)
        .bind(payout.placement as i32)
        .bind(payout.amount)
        .bind(&payout.idempotency_key)
        .bind(&payout.description)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_payouts(&self, tournament_id: TournamentId) -> PrizeResult<Vec<Payout>> {
        let rows = sqlx::query(
            "SELECT tournament_id, participant_id, placement, amount, idempotency_key,
                    description, created_at
             FROM prize_payouts
             WHERE tournament_id = $1
             ORDER BY placement, participant_id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(payout_from_row).collect())
    }

    async fn mark_prizes_distributed(&self, tournament_id: TournamentId) -> PrizeResult<bool> {
        let result = sqlx::query(
            "UPDATE tournaments SET prizes_distributed = TRUE
             WHERE id = $1 AND prizes_distributed = FALSE",
        )
        .bind(tournament_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
