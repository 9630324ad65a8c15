//! Advancement engine: routes match results through the bracket.
//!
//! Every completed match is fed through [`AdvancementEngine::advance_winner`],
//! whether it was played, a round-1 bye or a losers-bracket walkover. The
//! engine reads the match's [`BracketPosition`], writes the winner (and in
//! the winners bracket the loser) into the downstream slots, flips full
//! matches to `Ready`, assigns placements and completes the tournament on the
//! deciding match.
//!
//! Missing routing data and missing downstream matches are logged and
//! skipped without mutating anything.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;

use super::errors::{BracketError, BracketResult};
use super::models::{
    BracketKind, BracketPosition, Match, MatchId, MatchResult, MatchStatus, ParticipantId,
    ParticipantStatus, Slot,
};
use crate::db::BracketRepository;
use crate::events::{BracketEvent, EventBroadcaster};
use crate::prize::PrizeDistributor;
use crate::tournament::{TournamentId, TournamentStatus};

/// Placement shared by semifinal losers and the losers-bracket final loser
pub const THIRD_PLACE: u32 = 3;

/// Completed matches still waiting to be routed
type AdvanceQueue = VecDeque<(MatchId, ParticipantId)>;

/// A downstream write resolved before any mutation happens
struct Route {
    target: Match,
    slot: Slot,
    participant: ParticipantId,
}

/// Routes results through a persisted bracket
pub struct AdvancementEngine {
    repo: Arc<dyn BracketRepository>,
    prizes: Arc<dyn PrizeDistributor>,
    events: Option<Arc<dyn EventBroadcaster>>,
}

impl AdvancementEngine {
    pub fn new(repo: Arc<dyn BracketRepository>, prizes: Arc<dyn PrizeDistributor>) -> Self {
        Self {
            repo,
            prizes,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventBroadcaster>) -> Self {
        self.events = Some(events);
        self
    }

    fn publish(&self, event: BracketEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    /// Record a reported score and advance the winner.
    ///
    /// The higher score wins. Completion is a one-way transition, so a
    /// duplicate report of the same match fails instead of advancing twice.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - Unknown match
    /// * `BracketError::MatchNotInTournament` - Match belongs elsewhere
    /// * `BracketError::MatchAlreadyCompleted` - Result already recorded
    /// * `BracketError::MatchNotReady` - A slot is still empty
    /// * `BracketError::InvalidScore` / `BracketError::TiedScore` - Bad scores
    /// * `BracketError::InvalidState` - Tournament not in progress
    pub async fn report_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        score_a: i32,
        score_b: i32,
    ) -> BracketResult<Match> {
        let reported = self
            .repo
            .load_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if reported.tournament_id != tournament_id {
            return Err(BracketError::MatchNotInTournament {
                match_id,
                tournament_id,
            });
        }
        if reported.status == MatchStatus::Completed {
            return Err(BracketError::MatchAlreadyCompleted(match_id));
        }
        if reported.status != MatchStatus::Ready {
            return Err(BracketError::MatchNotReady {
                match_id,
                status: reported.status,
            });
        }

        for score in [score_a, score_b] {
            if score < 0 {
                return Err(BracketError::InvalidScore(score));
            }
        }
        if score_a == score_b {
            return Err(BracketError::TiedScore(score_a));
        }

        self.ensure_in_progress(tournament_id).await?;

        let winner = if score_a > score_b {
            reported.slot_a
        } else {
            reported.slot_b
        }
        .ok_or(BracketError::MatchNotReady {
            match_id,
            status: reported.status,
        })?;

        let result = MatchResult::scored(winner, score_a, score_b);
        if !self.repo.complete_match(match_id, &result).await? {
            return Err(BracketError::MatchAlreadyCompleted(match_id));
        }

        log::info!(
            "Tournament {}: match {} completed {}-{}, winner {}",
            tournament_id,
            match_id,
            score_a,
            score_b,
            winner
        );
        self.publish_completed(tournament_id, match_id, &result);

        self.advance_winner(match_id, winner).await?;

        let mut completed = reported;
        completed.apply_result(&result, Utc::now());
        Ok(self.repo.load_match(match_id).await?.unwrap_or(completed))
    }

    /// Route the winner (and loser) of a completed match downstream.
    ///
    /// Walkovers completed along the way are routed in the same call.
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - Match points at no tournament
    /// * `BracketError::InvalidState` - Tournament not in progress
    /// * `BracketError::MatchNotReady` - Match has no recorded result yet
    /// * `BracketError::InvalidWinner` - Not the recorded winner of the match
    pub async fn advance_winner(
        &self,
        match_id: MatchId,
        winner_id: ParticipantId,
    ) -> BracketResult<()> {
        let mut queue = AdvanceQueue::from([(match_id, winner_id)]);

        while let Some((match_id, winner_id)) = queue.pop_front() {
            self.advance_one(match_id, winner_id, &mut queue).await?;
        }

        Ok(())
    }

    /// Auto-complete round-1 matches holding a single participant.
    ///
    /// Each bye is completed with the sole occupant as winner and routed
    /// like any reported result. Returns the number of byes processed.
    pub async fn process_first_round_byes(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<usize> {
        self.ensure_in_progress(tournament_id).await?;

        let byes: Vec<(MatchId, ParticipantId)> = self
            .repo
            .list_matches(tournament_id)
            .await?
            .iter()
            .filter(|m| {
                // Grand finals is also round 1 but only ever waits for its second entrant
                matches!(m.bracket, BracketKind::Single | BracketKind::Winners)
                    && m.round == 1
                    && m.status != MatchStatus::Completed
            })
            .filter_map(|m| m.sole_entrant().map(|entrant| (m.id, entrant)))
            .collect();

        let mut processed = 0;
        for (match_id, entrant) in byes {
            let result = MatchResult::unplayed(entrant);
            if !self.repo.complete_match(match_id, &result).await? {
                log::debug!(
                    "Tournament {}: bye match {} already completed",
                    tournament_id,
                    match_id
                );
                continue;
            }

            log::info!(
                "Tournament {}: participant {} advances on a bye (match {})",
                tournament_id,
                entrant,
                match_id
            );
            self.publish_completed(tournament_id, match_id, &result);
            self.advance_winner(match_id, entrant).await?;
            processed += 1;
        }

        Ok(processed)
    }

    async fn ensure_in_progress(&self, tournament_id: TournamentId) -> BracketResult<()> {
        let tournament = self
            .repo
            .load_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        if tournament.status != TournamentStatus::InProgress {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }
        Ok(())
    }

    async fn advance_one(
        &self,
        match_id: MatchId,
        winner_id: ParticipantId,
        queue: &mut AdvanceQueue,
    ) -> BracketResult<()> {
        let Some(completed) = self.repo.load_match(match_id).await? else {
            log::warn!("Match {}: not found, nothing to advance", match_id);
            return Ok(());
        };
        let tournament_id = completed.tournament_id;

        let Some(position) = completed.position.clone() else {
            log::warn!(
                "Tournament {}: match {} has no bracket position, not advancing",
                tournament_id,
                match_id
            );
            return Ok(());
        };

        self.ensure_in_progress(tournament_id).await?;

        // Only the recorded winner of a completed match is routed
        if completed.status != MatchStatus::Completed {
            return Err(BracketError::MatchNotReady {
                match_id,
                status: completed.status,
            });
        }
        if completed.winner_id != Some(winner_id) {
            return Err(BracketError::InvalidWinner {
                match_id,
                participant_id: winner_id,
            });
        }
        let loser = completed.opponent_of(winner_id);

        match position {
            BracketPosition::Single {
                next_match_number: None,
                ..
            }
            | BracketPosition::GrandFinals => {
                self.complete_tournament(tournament_id, winner_id, loser)
                    .await
            }

            BracketPosition::Single {
                next_match_number: Some(next_match),
                next_slot,
            } => {
                let Some(target) = self
                    .downstream(&completed, BracketKind::Single, completed.round + 1, next_match)
                    .await?
                else {
                    return Ok(());
                };

                if let Some(loser) = loser {
                    // The downstream match of a semifinal is the final
                    let placement = target
                        .position
                        .as_ref()
                        .is_some_and(BracketPosition::is_decider)
                        .then_some(THIRD_PLACE);
                    self.assign_placement(tournament_id, loser, ParticipantStatus::Eliminated, placement)
                        .await?;
                }

                self.fill_slot(
                    Route {
                        target,
                        slot: next_slot,
                        participant: winner_id,
                    },
                    queue,
                )
                .await
            }

            BracketPosition::Winners {
                next_winners_match,
                next_winners_slot,
                drop_losers_round,
                drop_losers_position,
                drop_losers_slot,
                is_winners_final,
                ..
            } => {
                let winner_target = match (is_winners_final, next_winners_match) {
                    (true, _) => {
                        self.downstream(&completed, BracketKind::GrandFinals, 1, 1)
                            .await?
                    }
                    (false, Some(next_match)) => {
                        self.downstream(
                            &completed,
                            BracketKind::Winners,
                            completed.round + 1,
                            next_match,
                        )
                        .await?
                    }
                    (false, None) => {
                        log::warn!(
                            "Tournament {}: winners match {} has no next match",
                            tournament_id,
                            match_id
                        );
                        None
                    }
                };
                let Some(winner_target) = winner_target else {
                    return Ok(());
                };

                // A bye has no loser to drop
                let loser_route = match loser {
                    Some(loser) => {
                        let Some(target) = self
                            .downstream(
                                &completed,
                                BracketKind::Losers,
                                drop_losers_round,
                                drop_losers_position,
                            )
                            .await?
                        else {
                            return Ok(());
                        };
                        Some(Route {
                            target,
                            slot: drop_losers_slot,
                            participant: loser,
                        })
                    }
                    None => None,
                };

                self.fill_slot(
                    Route {
                        target: winner_target,
                        slot: next_winners_slot,
                        participant: winner_id,
                    },
                    queue,
                )
                .await?;

                if let Some(route) = loser_route {
                    log::debug!(
                        "Tournament {}: participant {} drops to losers round {}",
                        tournament_id,
                        route.participant,
                        drop_losers_round
                    );
                    self.fill_slot(route, queue).await?;
                }
                Ok(())
            }

            BracketPosition::Losers {
                next_losers_match,
                next_losers_slot,
                is_losers_final,
                ..
            } => {
                let target = match (is_losers_final, next_losers_match) {
                    (true, _) => {
                        self.downstream(&completed, BracketKind::GrandFinals, 1, 1)
                            .await?
                    }
                    (false, Some(next_match)) => {
                        self.downstream(
                            &completed,
                            BracketKind::Losers,
                            completed.round + 1,
                            next_match,
                        )
                        .await?
                    }
                    (false, None) => {
                        log::warn!(
                            "Tournament {}: losers match {} has no next match",
                            tournament_id,
                            match_id
                        );
                        None
                    }
                };
                let Some(target) = target else {
                    return Ok(());
                };

                if let Some(loser) = loser {
                    let placement = is_losers_final.then_some(THIRD_PLACE);
                    self.assign_placement(tournament_id, loser, ParticipantStatus::Eliminated, placement)
                        .await?;
                }

                self.fill_slot(
                    Route {
                        target,
                        slot: next_losers_slot,
                        participant: winner_id,
                    },
                    queue,
                )
                .await
            }
        }
    }

    /// Look up a downstream match, logging a miss
    async fn downstream(
        &self,
        from: &Match,
        bracket: BracketKind,
        round: u32,
        match_number: u32,
    ) -> BracketResult<Option<Match>> {
        let found = self
            .repo
            .find_match(from.tournament_id, bracket, round, match_number)
            .await?;

        if found.is_none() {
            log::warn!(
                "Tournament {}: match {} routes to missing {} round {} match {}",
                from.tournament_id,
                from.id,
                bracket.as_str(),
                round,
                match_number
            );
        }
        Ok(found)
    }

    /// Write a participant into a downstream slot and update readiness.
    ///
    /// Writing the participant already in the slot is a no-op. A slot held by
    /// someone else is never overwritten.
    async fn fill_slot(&self, route: Route, queue: &mut AdvanceQueue) -> BracketResult<()> {
        let Route {
            target,
            slot,
            participant,
        } = route;
        let tournament_id = target.tournament_id;

        match target.slot(slot) {
            Some(occupant) if occupant != participant => {
                log::warn!(
                    "Tournament {}: match {} slot {} already holds {}, not placing {}",
                    tournament_id,
                    target.id,
                    slot,
                    occupant,
                    participant
                );
                return Ok(());
            }
            _ => {}
        }

        let mut updated = self
            .repo
            .update_match_slot(target.id, slot, participant)
            .await?;
        if updated.slot(slot) != Some(participant) {
            log::warn!(
                "Tournament {}: match {} slot {} was taken concurrently",
                tournament_id,
                updated.id,
                slot
            );
            return Ok(());
        }

        if updated.status == MatchStatus::Pending && updated.is_full() {
            self.repo
                .update_match_status(updated.id, MatchStatus::Ready)
                .await?;
            updated.status = MatchStatus::Ready;
            log::info!("Tournament {}: match {} is ready", tournament_id, updated.id);
        }

        self.publish(BracketEvent::MatchUpdated {
            tournament_id,
            match_id: updated.id,
            slot_a: updated.slot_a,
            slot_b: updated.slot_b,
            status: updated.status,
        });

        let is_walkover = updated
            .position
            .as_ref()
            .is_some_and(BracketPosition::is_walkover);
        if is_walkover && updated.status == MatchStatus::Pending && updated.entrant_count() == 1 {
            let result = MatchResult::unplayed(participant);
            if self.repo.complete_match(updated.id, &result).await? {
                log::info!(
                    "Tournament {}: participant {} advances on a walkover (match {})",
                    tournament_id,
                    participant,
                    updated.id
                );
                self.publish_completed(tournament_id, updated.id, &result);
                queue.push_back((updated.id, participant));
            }
        }

        Ok(())
    }

    async fn assign_placement(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        status: ParticipantStatus,
        placement: Option<u32>,
    ) -> BracketResult<()> {
        self.repo
            .update_participant_placement(tournament_id, participant_id, status, placement)
            .await?;

        match placement {
            Some(placement) => log::info!(
                "Tournament {}: participant {} placed {}",
                tournament_id,
                participant_id,
                placement
            ),
            None => log::info!(
                "Tournament {}: participant {} eliminated",
                tournament_id,
                participant_id
            ),
        }

        self.publish(BracketEvent::PlacementAssigned {
            tournament_id,
            participant_id,
            status,
            placement,
        });
        Ok(())
    }

    /// Close out the tournament after its deciding match.
    ///
    /// Only the caller that wins the `InProgress -> Completed` transition
    /// assigns the top placements and asks for prize distribution. A failed
    /// distribution is logged and left for a manual retry.
    async fn complete_tournament(
        &self,
        tournament_id: TournamentId,
        winner: ParticipantId,
        runner_up: Option<ParticipantId>,
    ) -> BracketResult<()> {
        let transitioned = self
            .repo
            .transition_tournament(
                tournament_id,
                TournamentStatus::InProgress,
                TournamentStatus::Completed,
            )
            .await?;
        if !transitioned {
            log::warn!(
                "Tournament {}: already left in-progress, not completing again",
                tournament_id
            );
            return Ok(());
        }

        self.assign_placement(tournament_id, winner, ParticipantStatus::Winner, Some(1))
            .await?;
        if let Some(runner_up) = runner_up {
            self.assign_placement(tournament_id, runner_up, ParticipantStatus::Eliminated, Some(2))
                .await?;
        }

        log::info!("Tournament {}: completed, champion {}", tournament_id, winner);
        self.publish(BracketEvent::TournamentStatusChanged {
            tournament_id,
            status: TournamentStatus::Completed,
        });

        match self.prizes.distribute_prizes(tournament_id).await {
            Ok(distribution) => log::info!(
                "Tournament {}: {} prize payouts from a pool of {}",
                tournament_id,
                distribution.payouts.len(),
                distribution.prize_pool
            ),
            Err(e) => log::error!(
                "Tournament {}: prize distribution failed: {}",
                tournament_id,
                e
            ),
        }

        Ok(())
    }

    fn publish_completed(&self, tournament_id: TournamentId, match_id: MatchId, result: &MatchResult) {
        self.publish(BracketEvent::MatchCompleted {
            tournament_id,
            match_id,
            winner_id: result.winner_id,
            score_a: result.score_a,
            score_b: result.score_b,
        });
    }
}
