//! Tournament lifecycle manager: registration, start, scoring, standings.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, PoisonError};

use super::models::{BracketFormat, Tournament, TournamentId, TournamentStatus};
use crate::bracket::{
    AdvancementEngine, BracketError, BracketResult, BracketView, MIN_PARTICIPANTS, Match, MatchId,
    Participant, ParticipantStatus, ViewEntry, generator,
};
use crate::db::BracketRepository;
use crate::events::{BracketEvent, EventBroadcaster};
use crate::prize::{PrizeDistribution, PrizeDistributor, PrizeResult};

/// Tournament manager
pub struct TournamentManager {
    repo: Arc<dyn BracketRepository>,
    prizes: Arc<dyn PrizeDistributor>,
    engine: AdvancementEngine,
    events: Option<Arc<dyn EventBroadcaster>>,
    /// Random source for unseeded brackets
    rng: Mutex<StdRng>,
}

impl TournamentManager {
    /// Create a new tournament manager seeded from OS entropy
    pub fn new(repo: Arc<dyn BracketRepository>, prizes: Arc<dyn PrizeDistributor>) -> Self {
        Self {
            engine: AdvancementEngine::new(repo.clone(), prizes.clone()),
            repo,
            prizes,
            events: None,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a fixed seed so shuffled brackets are reproducible
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventBroadcaster>) -> Self {
        self.engine = AdvancementEngine::new(self.repo.clone(), self.prizes.clone())
            .with_events(events.clone());
        self.events = Some(events);
        self
    }

    pub fn engine(&self) -> &AdvancementEngine {
        &self.engine
    }

    fn publish(&self, event: BracketEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    async fn load(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.repo
            .load_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    /// Create a tournament open for registration
    pub async fn create_tournament(
        &self,
        name: &str,
        format: BracketFormat,
        prize_pool: i64,
    ) -> BracketResult<Tournament> {
        let tournament = self.repo.create_tournament(name, format, prize_pool).await?;
        log::info!(
            "Tournament {}: created '{}' ({}, pool {})",
            tournament.id,
            tournament.name,
            format.as_str(),
            prize_pool
        );
        Ok(tournament)
    }

    /// Register a participant while registration is open
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidState` - Registration closed
    /// * `BracketError::AlreadyRegistered` - Same user or team entered twice
    pub async fn register_participant(
        &self,
        tournament_id: TournamentId,
        participant: &Participant,
    ) -> BracketResult<Participant> {
        let tournament = self.load(tournament_id).await?;
        if tournament.status != TournamentStatus::RegistrationOpen {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::RegistrationOpen,
                actual: tournament.status,
            });
        }

        let entrant = participant.entrant_id();
        if self
            .repo
            .list_participants(tournament_id)
            .await?
            .iter()
            .any(|p| p.entrant_id() == entrant)
        {
            return Err(BracketError::AlreadyRegistered(entrant));
        }

        self.repo.register_participant(tournament_id, participant).await
    }

    /// Generate the bracket and start play.
    ///
    /// Persists the match skeleton and bracket record, moves the tournament
    /// to `InProgress`, marks entrants active and resolves round-1 byes.
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - Unknown tournament
    /// * `BracketError::InvalidState` - Registration not open
    /// * `BracketError::BracketAlreadyGenerated` - Matches already exist
    /// * `BracketError::InsufficientParticipants` - Fewer than two checked in
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let tournament = self.load(tournament_id).await?;
        if tournament.status != TournamentStatus::RegistrationOpen {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::RegistrationOpen,
                actual: tournament.status,
            });
        }

        if !self.repo.list_matches(tournament_id).await?.is_empty() {
            return Err(BracketError::BracketAlreadyGenerated(tournament_id));
        }

        let participants: Vec<Participant> = self
            .repo
            .list_participants(tournament_id)
            .await?
            .into_iter()
            .filter(|p| p.status == ParticipantStatus::CheckedIn)
            .collect();
        if participants.len() < MIN_PARTICIPANTS {
            return Err(BracketError::InsufficientParticipants {
                needed: MIN_PARTICIPANTS,
                current: participants.len(),
            });
        }

        let generated = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            generator::generate(tournament.format, &participants, &mut *rng)?
        };

        self.repo
            .create_matches(tournament_id, &generated.matches)
            .await?;
        self.repo
            .create_bracket_record(tournament_id, &generated.view)
            .await?;

        if !self
            .repo
            .transition_tournament(
                tournament_id,
                TournamentStatus::RegistrationOpen,
                TournamentStatus::InProgress,
            )
            .await?
        {
            let actual = self.load(tournament_id).await?.status;
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::RegistrationOpen,
                actual,
            });
        }

        for participant in &participants {
            self.repo
                .update_participant_placement(
                    tournament_id,
                    participant.entrant_id(),
                    ParticipantStatus::Active,
                    None,
                )
                .await?;
        }

        log::info!(
            "Tournament {}: started {} with {} participants, {} matches",
            tournament_id,
            tournament.format.as_str(),
            participants.len(),
            generated.matches.len()
        );
        self.publish(BracketEvent::BracketCreated {
            tournament_id,
            view: generated.view,
        });
        self.publish(BracketEvent::TournamentStatusChanged {
            tournament_id,
            status: TournamentStatus::InProgress,
        });

        let byes = self.engine.process_first_round_byes(tournament_id).await?;
        if byes > 0 {
            log::info!("Tournament {}: {} byes processed", tournament_id, byes);
        }

        self.bracket_view(tournament_id).await
    }

    /// Report the score of a ready match
    pub async fn report_score(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        score_a: i32,
        score_b: i32,
    ) -> BracketResult<Match> {
        self.engine
            .report_result(tournament_id, match_id, score_a, score_b)
            .await
    }

    /// Live bracket projection built from the current match records
    pub async fn bracket_view(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let tournament = self.load(tournament_id).await?;

        let participant_count = match self.repo.load_bracket_record(tournament_id).await? {
            Some(record) => record.participant_count(),
            None => self.repo.list_participants(tournament_id).await?.len(),
        };

        let entries: Vec<ViewEntry> = self
            .repo
            .list_matches(tournament_id)
            .await?
            .iter()
            .map(ViewEntry::from)
            .collect();

        Ok(BracketView::build(
            tournament.format,
            participant_count,
            &entries,
        ))
    }

    /// Participants ordered by placement, unranked last
    pub async fn standings(&self, tournament_id: TournamentId) -> BracketResult<Vec<Participant>> {
        self.load(tournament_id).await?;

        let mut participants = self.repo.list_participants(tournament_id).await?;
        participants.sort_by_key(|p| p.placement.unwrap_or(u32::MAX));
        Ok(participants)
    }

    /// List all matches of a tournament
    pub async fn matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        self.repo.list_matches(tournament_id).await
    }

    /// Cancel a tournament that has not finished
    pub async fn cancel_tournament(&self, tournament_id: TournamentId) -> BracketResult<()> {
        let tournament = self.load(tournament_id).await?;
        if tournament.status.is_terminal()
            || !self
                .repo
                .transition_tournament(tournament_id, tournament.status, TournamentStatus::Cancelled)
                .await?
        {
            let actual = self.load(tournament_id).await?.status;
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual,
            });
        }

        log::info!("Tournament {}: cancelled", tournament_id);
        self.publish(BracketEvent::TournamentStatusChanged {
            tournament_id,
            status: TournamentStatus::Cancelled,
        });
        Ok(())
    }

    /// Distribute prizes of a completed tournament.
    ///
    /// Manual retry path for a distribution that failed on completion.
    pub async fn distribute_prizes(
        &self,
        tournament_id: TournamentId,
    ) -> PrizeResult<PrizeDistribution> {
        self.prizes.distribute_prizes(tournament_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketKind, MatchStatus};
    use crate::db::InMemoryRepository;
    use crate::events::ChannelBroadcaster;
    use crate::prize::{LedgerPrizeDistributor, PrizeSplit};

    fn manager() -> (Arc<InMemoryRepository>, TournamentManager) {
        let repo = Arc::new(InMemoryRepository::new());
        let prizes = Arc::new(LedgerPrizeDistributor::new(
            repo.clone(),
            repo.clone(),
            PrizeSplit::default(),
        ));
        let manager = TournamentManager::new(repo.clone(), prizes).with_rng_seed(7);
        (repo, manager)
    }

    async fn open_tournament(
        manager: &TournamentManager,
        format: BracketFormat,
        players: i64,
    ) -> TournamentId {
        let tournament = manager
            .create_tournament("Cup", format, 1000)
            .await
            .unwrap();
        for i in 1..=players {
            manager
                .register_participant(tournament.id, &Participant::new(0, 100 + i, format!("p{i}")))
                .await
                .unwrap();
        }
        tournament.id
    }

    #[tokio::test]
    async fn test_start_generates_bracket_and_activates() {
        let (repo, manager) = manager();
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 4).await;

        let view = manager.start_tournament(tournament_id).await.unwrap();
        assert_eq!(view.format(), BracketFormat::SingleElimination);
        assert_eq!(view.participant_count(), 4);

        let tournament = repo.load_tournament(tournament_id).await.unwrap().unwrap();
        assert_eq!(tournament.status, TournamentStatus::InProgress);
        assert_eq!(manager.matches(tournament_id).await.unwrap().len(), 3);
        assert!(
            repo.list_participants(tournament_id)
                .await
                .unwrap()
                .iter()
                .all(|p| p.status == ParticipantStatus::Active)
        );
        assert!(repo.load_bracket_record(tournament_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (_, manager) = manager();
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 2).await;

        manager.start_tournament(tournament_id).await.unwrap();
        let again = manager.start_tournament(tournament_id).await;
        assert!(matches!(
            again,
            Err(BracketError::InvalidState {
                actual: TournamentStatus::InProgress,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_start_needs_two_checked_in() {
        let (repo, manager) = manager();
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 1).await;
        let mut late = Participant::new(0, 500, "late");
        late.status = ParticipantStatus::Registered;
        repo.register_participant(tournament_id, &late).await.unwrap();

        let result = manager.start_tournament(tournament_id).await;
        assert!(matches!(
            result,
            Err(BracketError::InsufficientParticipants {
                needed: 2,
                current: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (_, manager) = manager();
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 2).await;

        let result = manager
            .register_participant(tournament_id, &Participant::new(0, 101, "again"))
            .await;
        assert!(matches!(result, Err(BracketError::AlreadyRegistered(101))));
    }

    #[tokio::test]
    async fn test_start_processes_byes() {
        let (_, manager) = manager();
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 5).await;

        manager.start_tournament(tournament_id).await.unwrap();

        let matches = manager.matches(tournament_id).await.unwrap();
        let first_round: Vec<&Match> = matches.iter().filter(|m| m.round == 1).collect();
        assert_eq!(first_round.len(), 4);
        assert_eq!(
            first_round
                .iter()
                .filter(|m| m.status == MatchStatus::Completed)
                .count(),
            3
        );
        // The two bye winners meet in round 2
        let round_two = matches
            .iter()
            .find(|m| m.bracket == BracketKind::Single && m.round == 2 && m.match_number == 2)
            .unwrap();
        assert_eq!(round_two.status, MatchStatus::Ready);
    }

    #[tokio::test]
    async fn test_cancel() {
        let (_, manager) = manager();
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 2).await;

        manager.cancel_tournament(tournament_id).await.unwrap();
        let again = manager.cancel_tournament(tournament_id).await;
        assert!(matches!(
            again,
            Err(BracketError::InvalidState {
                actual: TournamentStatus::Cancelled,
                ..
            })
        ));
        assert!(matches!(
            manager.start_tournament(tournament_id).await,
            Err(BracketError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let (_, manager) = manager();
        let broadcaster = Arc::new(ChannelBroadcaster::new(64));
        let mut rx = broadcaster.subscribe();
        let manager = manager.with_events(broadcaster);
        let tournament_id = open_tournament(&manager, BracketFormat::SingleElimination, 2).await;

        manager.start_tournament(tournament_id).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, BracketEvent::BracketCreated { .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            BracketEvent::TournamentStatusChanged {
                status: TournamentStatus::InProgress,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_tournament() {
        let (_, manager) = manager();
        assert!(matches!(
            manager.start_tournament(77).await,
            Err(BracketError::TournamentNotFound(77))
        ));
        assert!(matches!(
            manager.standings(77).await,
            Err(BracketError::TournamentNotFound(77))
        ));
    }
}
