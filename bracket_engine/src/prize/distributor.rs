//! Prize distribution for completed tournaments.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::errors::{PrizeError, PrizeResult};
use super::models::{Payout, PrizeDistribution, PrizeSplit, placement_label};
use crate::db::{BracketRepository, PayoutRepository};
use crate::tournament::{TournamentId, TournamentStatus};

/// Capability the advancement engine calls once a tournament is decided
#[async_trait]
pub trait PrizeDistributor: Send + Sync {
    /// Pay out the prize pool of a completed tournament.
    ///
    /// Must be safe to call more than once for the same tournament.
    async fn distribute_prizes(&self, tournament_id: TournamentId)
    -> PrizeResult<PrizeDistribution>;
}

/// Distributor writing payouts to the payout ledger
pub struct LedgerPrizeDistributor {
    tournaments: Arc<dyn BracketRepository>,
    ledger: Arc<dyn PayoutRepository>,
    split: PrizeSplit,
}

impl LedgerPrizeDistributor {
    pub fn new(
        tournaments: Arc<dyn BracketRepository>,
        ledger: Arc<dyn PayoutRepository>,
        split: PrizeSplit,
    ) -> Self {
        Self {
            tournaments,
            ledger,
            split,
        }
    }

    pub fn split(&self) -> &PrizeSplit {
        &self.split
    }
}

#[async_trait]
impl PrizeDistributor for LedgerPrizeDistributor {
    /// Distribute the pool of a completed tournament by placement.
    ///
    /// Each payout carries the idempotency key `prize:{tournament}:{participant}`
    /// so a rerun after a partial failure only writes what is missing. The
    /// tournament's distributed flag is set last.
    ///
    /// # Errors
    ///
    /// * `PrizeError::TournamentNotFound` - Unknown tournament
    /// * `PrizeError::TournamentNotCompleted` - No champion yet
    /// * `PrizeError::NoChampion` - Completed without a 1st place
    async fn distribute_prizes(
        &self,
        tournament_id: TournamentId,
    ) -> PrizeResult<PrizeDistribution> {
        let tournament = self
            .tournaments
            .load_tournament(tournament_id)
            .await?
            .ok_or(PrizeError::TournamentNotFound(tournament_id))?;

        if tournament.status != TournamentStatus::Completed {
            return Err(PrizeError::TournamentNotCompleted {
                tournament_id,
                status: tournament.status,
            });
        }

        if tournament.prizes_distributed {
            log::info!("Tournament {}: prizes already distributed", tournament_id);
            return Ok(PrizeDistribution {
                tournament_id,
                prize_pool: tournament.prize_pool,
                payouts: Vec::new(),
                already_distributed: true,
            });
        }

        let mut payouts = Vec::new();

        if tournament.prize_pool > 0 {
            let standings: Vec<_> = self
                .tournaments
                .list_participants(tournament_id)
                .await?
                .iter()
                .filter_map(|p| p.placement.map(|placement| (p.entrant_id(), placement)))
                .collect();

            if !standings.iter().any(|(_, placement)| *placement == 1) {
                return Err(PrizeError::NoChampion(tournament_id));
            }

            for allocation in self.split.allocate(tournament.prize_pool, &standings) {
                if allocation.amount <= 0 {
                    continue;
                }

                let payout = Payout {
                    tournament_id,
                    participant_id: allocation.participant_id,
                    placement: allocation.placement,
                    amount: allocation.amount,
                    idempotency_key: Payout::idempotency_key(
                        tournament_id,
                        allocation.participant_id,
                    ),
                    description: format!(
                        "{} place prize - {}",
                        placement_label(allocation.placement),
                        tournament.name
                    ),
                    created_at: Utc::now(),
                };

                if self.ledger.record_payout(&payout).await? {
                    log::info!(
                        "Tournament {}: paid {} to participant {} ({} place)",
                        tournament_id,
                        payout.amount,
                        payout.participant_id,
                        placement_label(payout.placement)
                    );
                    payouts.push(payout);
                } else {
                    log::debug!(
                        "Tournament {}: payout {} already recorded",
                        tournament_id,
                        payout.idempotency_key
                    );
                }
            }
        } else {
            log::info!("Tournament {}: empty prize pool, nothing to pay", tournament_id);
        }

        self.ledger.mark_prizes_distributed(tournament_id).await?;

        Ok(PrizeDistribution {
            tournament_id,
            prize_pool: tournament.prize_pool,
            payouts,
            already_distributed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{Participant, ParticipantStatus};
    use crate::db::InMemoryRepository;
    use crate::tournament::BracketFormat;

    async fn completed_tournament(
        repo: &InMemoryRepository,
        prize_pool: i64,
        placements: &[(i64, Option<u32>)],
    ) -> TournamentId {
        let tournament = repo
            .create_tournament("Weekly Cup", BracketFormat::SingleElimination, prize_pool)
            .await
            .unwrap();

        for (user_id, placement) in placements {
            let registered = repo
                .register_participant(
                    tournament.id,
                    &Participant::new(0, *user_id, format!("user{user_id}")),
                )
                .await
                .unwrap();
            let status = match placement {
                Some(1) => ParticipantStatus::Winner,
                _ => ParticipantStatus::Eliminated,
            };
            repo.update_participant_placement(
                tournament.id,
                registered.entrant_id(),
                status,
                *placement,
            )
            .await
            .unwrap();
        }

        repo.transition_tournament(
            tournament.id,
            TournamentStatus::RegistrationOpen,
            TournamentStatus::InProgress,
        )
        .await
        .unwrap();
        repo.transition_tournament(
            tournament.id,
            TournamentStatus::InProgress,
            TournamentStatus::Completed,
        )
        .await
        .unwrap();

        tournament.id
    }

    fn distributor(repo: &Arc<InMemoryRepository>) -> LedgerPrizeDistributor {
        LedgerPrizeDistributor::new(repo.clone(), repo.clone(), PrizeSplit::default())
    }

    #[tokio::test]
    async fn test_distributes_by_placement() {
        let repo = Arc::new(InMemoryRepository::new());
        let tournament_id = completed_tournament(
            &repo,
            1000,
            &[(10, Some(1)), (20, Some(2)), (30, Some(3)), (40, None)],
        )
        .await;

        let distribution = distributor(&repo).distribute_prizes(tournament_id).await.unwrap();
        assert!(!distribution.already_distributed);

        let paid: Vec<(i64, i64)> = distribution
            .payouts
            .iter()
            .map(|p| (p.participant_id, p.amount))
            .collect();
        assert_eq!(paid, vec![(10, 600), (20, 300), (30, 100)]);
        assert_eq!(distribution.payouts[0].description, "1st place prize - Weekly Cup");
        assert_eq!(distribution.payouts[0].idempotency_key, format!("prize:{tournament_id}:10"));

        let tournament = repo.load_tournament(tournament_id).await.unwrap().unwrap();
        assert!(tournament.prizes_distributed);
    }

    #[tokio::test]
    async fn test_second_run_pays_nothing() {
        let repo = Arc::new(InMemoryRepository::new());
        let tournament_id =
            completed_tournament(&repo, 1000, &[(10, Some(1)), (20, Some(2))]).await;
        let distributor = distributor(&repo);

        distributor.distribute_prizes(tournament_id).await.unwrap();
        let again = distributor.distribute_prizes(tournament_id).await.unwrap();

        assert!(again.already_distributed);
        assert!(again.payouts.is_empty());
        assert_eq!(repo.list_payouts(tournament_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_pool_marks_distributed() {
        let repo = Arc::new(InMemoryRepository::new());
        let tournament_id = completed_tournament(&repo, 0, &[(10, Some(1)), (20, Some(2))]).await;

        let distribution = distributor(&repo).distribute_prizes(tournament_id).await.unwrap();
        assert!(distribution.payouts.is_empty());

        let tournament = repo.load_tournament(tournament_id).await.unwrap().unwrap();
        assert!(tournament.prizes_distributed);
    }

    #[tokio::test]
    async fn test_requires_completed_tournament() {
        let repo = Arc::new(InMemoryRepository::new());
        let tournament = repo
            .create_tournament("Open", BracketFormat::SingleElimination, 100)
            .await
            .unwrap();

        let result = distributor(&repo).distribute_prizes(tournament.id).await;
        assert!(matches!(
            result,
            Err(PrizeError::TournamentNotCompleted {
                status: TournamentStatus::RegistrationOpen,
                ..
            })
        ));

        let missing = distributor(&repo).distribute_prizes(999).await;
        assert!(matches!(missing, Err(PrizeError::TournamentNotFound(999))));
    }

    #[tokio::test]
    async fn test_missing_champion_is_an_error() {
        let repo = Arc::new(InMemoryRepository::new());
        let tournament_id = completed_tournament(&repo, 100, &[(10, None), (20, Some(2))]).await;

        let result = distributor(&repo).distribute_prizes(tournament_id).await;
        assert!(matches!(result, Err(PrizeError::NoChampion(_))));

        let tournament = repo.load_tournament(tournament_id).await.unwrap().unwrap();
        assert!(!tournament.prizes_distributed);
    }
}
