//! In-memory repository used by tests and the simulator.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{BracketRepository, PayoutRepository};
use crate::bracket::{
    BracketError, BracketKind, BracketResult, BracketView, Match, MatchId, MatchResult,
    MatchStatus, NewMatch, Participant, ParticipantId, ParticipantStatus, Slot,
};
use crate::prize::{Payout, PrizeError, PrizeResult};
use crate::tournament::{BracketFormat, Tournament, TournamentId, TournamentStatus};

type MatchKey = (TournamentId, BracketKind, u32, u32);

#[derive(Default)]
struct Store {
    last_tournament_id: TournamentId,
    last_participant_id: i64,
    last_match_id: MatchId,
    tournaments: HashMap<TournamentId, Tournament>,
    participants: HashMap<TournamentId, Vec<Participant>>,
    matches: HashMap<MatchId, Match>,
    /// (tournament, bracket, round, match number) -> match
    match_index: HashMap<MatchKey, MatchId>,
    brackets: HashMap<TournamentId, BracketView>,
    payouts: Vec<Payout>,
}

/// Repository keeping everything in process memory
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a match's routing data, as an unreadable stored position would
    #[cfg(test)]
    pub(crate) async fn clear_position(&self, match_id: MatchId) {
        if let Some(stored) = self.store.write().await.matches.get_mut(&match_id) {
            stored.position = None;
        }
    }
}

#[async_trait]
impl BracketRepository for InMemoryRepository {
    async fn create_tournament(
        &self,
        name: &str,
        format: BracketFormat,
        prize_pool: i64,
    ) -> BracketResult<Tournament> {
        let mut store = self.store.write().await;
        store.last_tournament_id += 1;

        let tournament = Tournament::new(store.last_tournament_id, name, format, prize_pool);
        store.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn load_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        Ok(self.store.read().await.tournaments.get(&tournament_id).cloned())
    }

    async fn transition_tournament(
        &self,
        tournament_id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> BracketResult<bool> {
        let mut store = self.store.write().await;
        match store.tournaments.get_mut(&tournament_id) {
            Some(tournament) if tournament.status == from => {
                tournament.status = to;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(BracketError::TournamentNotFound(tournament_id)),
        }
    }

    async fn register_participant(
        &self,
        tournament_id: TournamentId,
        participant: &Participant,
    ) -> BracketResult<Participant> {
        let mut store = self.store.write().await;
        if !store.tournaments.contains_key(&tournament_id) {
            return Err(BracketError::TournamentNotFound(tournament_id));
        }

        store.last_participant_id += 1;
        let registered = Participant {
            id: store.last_participant_id,
            ..participant.clone()
        };
        store
            .participants
            .entry(tournament_id)
            .or_default()
            .push(registered.clone());
        Ok(registered)
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let store = self.store.read().await;
        Ok(store
            .participants
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_participant_placement(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        status: ParticipantStatus,
        placement: Option<u32>,
    ) -> BracketResult<()> {
        let mut store = self.store.write().await;
        if let Some(participants) = store.participants.get_mut(&tournament_id) {
            for participant in participants
                .iter_mut()
                .filter(|p| p.entrant_id() == participant_id)
            {
                participant.status = status;
                participant.placement = placement;
            }
        }
        Ok(())
    }

    async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        Ok(self.store.read().await.matches.get(&match_id).cloned())
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        bracket: BracketKind,
        round: u32,
        match_number: u32,
    ) -> BracketResult<Option<Match>> {
        let store = self.store.read().await;
        Ok(store
            .match_index
            .get(&(tournament_id, bracket, round, match_number))
            .and_then(|id| store.matches.get(id))
            .cloned())
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let store = self.store.read().await;
        let mut matches: Vec<Match> = store
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.bracket, m.round, m.match_number));
        Ok(matches)
    }

    async fn update_match_slot(
        &self,
        match_id: MatchId,
        slot: Slot,
        participant_id: ParticipantId,
    ) -> BracketResult<Match> {
        let mut store = self.store.write().await;
        let stored = store
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        let target = match slot {
            Slot::A => &mut stored.slot_a,
            Slot::B => &mut stored.slot_b,
        };
        if target.is_none() {
            *target = Some(participant_id);
        }

        Ok(stored.clone())
    }

    async fn update_match_status(
        &self,
        match_id: MatchId,
        status: MatchStatus,
    ) -> BracketResult<()> {
        let mut store = self.store.write().await;
        let stored = store
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if stored.status != MatchStatus::Completed {
            stored.status = status;
        }
        Ok(())
    }

    async fn complete_match(&self, match_id: MatchId, result: &MatchResult) -> BracketResult<bool> {
        let mut store = self.store.write().await;
        let stored = store
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if stored.status == MatchStatus::Completed {
            return Ok(false);
        }
        stored.apply_result(result, Utc::now());
        Ok(true)
    }

    async fn create_matches(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> BracketResult<Vec<Match>> {
        let mut store = self.store.write().await;

        // All or nothing, like the unique constraint inside a transaction
        if matches.iter().any(|m| {
            store
                .match_index
                .contains_key(&(tournament_id, m.bracket(), m.round, m.match_number))
        }) {
            return Err(BracketError::BracketAlreadyGenerated(tournament_id));
        }

        let mut created = Vec::with_capacity(matches.len());
        for new in matches {
            store.last_match_id += 1;
            let stored = Match::from_new(store.last_match_id, tournament_id, new);
            store.match_index.insert(
                (tournament_id, stored.bracket, stored.round, stored.match_number),
                stored.id,
            );
            store.matches.insert(stored.id, stored.clone());
            created.push(stored);
        }

        Ok(created)
    }

    async fn create_bracket_record(
        &self,
        tournament_id: TournamentId,
        view: &BracketView,
    ) -> BracketResult<()> {
        let mut store = self.store.write().await;
        if store.brackets.contains_key(&tournament_id) {
            return Err(BracketError::BracketAlreadyGenerated(tournament_id));
        }
        store.brackets.insert(tournament_id, view.clone());
        Ok(())
    }

    async fn load_bracket_record(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<BracketView>> {
        Ok(self.store.read().await.brackets.get(&tournament_id).cloned())
    }
}

#[async_trait]
impl PayoutRepository for InMemoryRepository {
    async fn record_payout(&self, payout: &Payout) -> PrizeResult<bool> {
        let mut store = self.store.write().await;
        if store
            .payouts
            .iter()
            .any(|p| p.idempotency_key == payout.idempotency_key)
        {
            return Ok(false);
        }
        store.payouts.push(payout.clone());
        Ok(true)
    }

    async fn list_payouts(&self, tournament_id: TournamentId) -> PrizeResult<Vec<Payout>> {
        let store = self.store.read().await;
        let mut payouts: Vec<Payout> = store
            .payouts
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect();
        payouts.sort_by_key(|p| (p.placement, p.participant_id));
        Ok(payouts)
    }

    async fn mark_prizes_distributed(&self, tournament_id: TournamentId) -> PrizeResult<bool> {
        let mut store = self.store.write().await;
        let tournament = store
            .tournaments
            .get_mut(&tournament_id)
            .ok_or(PrizeError::TournamentNotFound(tournament_id))?;

        if tournament.prizes_distributed {
            return Ok(false);
        }
        tournament.prizes_distributed = true;
        Ok(true)
    }
}
