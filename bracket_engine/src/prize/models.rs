//! Prize data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{PrizeError, PrizeResult};
use crate::bracket::ParticipantId;
use crate::tournament::TournamentId;

/// Basis points making up a whole prize pool
pub const TOTAL_BPS: u32 = 10_000;

/// Prize split by placement, in basis points.
///
/// Index 0 is 1st place, index 1 is 2nd place and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeSplit {
    shares_bps: Vec<u32>,
}

impl PrizeSplit {
    /// Create a split, rejecting shares that do not add up to the whole pool
    pub fn new(shares_bps: Vec<u32>) -> PrizeResult<Self> {
        if shares_bps.is_empty() {
            return Err(PrizeError::InvalidSplit("no shares".to_string()));
        }

        let total: u32 = shares_bps.iter().sum();
        if total != TOTAL_BPS {
            return Err(PrizeError::InvalidSplit(format!(
                "shares sum to {total} bps, expected {TOTAL_BPS}"
            )));
        }

        Ok(Self { shares_bps })
    }

    pub fn shares_bps(&self) -> &[u32] {
        &self.shares_bps
    }

    /// Share of `pool` for a placement (1-indexed), before splitting between
    /// joint holders
    pub fn share_for_placement(&self, pool: i64, placement: u32) -> i64 {
        match placement
            .checked_sub(1)
            .and_then(|index| self.shares_bps.get(index as usize))
        {
            Some(&bps) => (i128::from(pool) * i128::from(bps) / i128::from(TOTAL_BPS)) as i64,
            None => 0,
        }
    }

    /// Allocate `pool` over the placed participants.
    ///
    /// Joint holders of a placement split its share equally. Rounding
    /// remainders and the shares of unoccupied placements go to 1st place,
    /// so the allocations always sum to `pool` when a 1st place exists.
    pub fn allocate(&self, pool: i64, standings: &[(ParticipantId, u32)]) -> Vec<Allocation> {
        let mut allocations = Vec::new();

        for placement in 1..=self.shares_bps.len() as u32 {
            let holders: Vec<ParticipantId> = standings
                .iter()
                .filter(|(_, p)| *p == placement)
                .map(|(id, _)| *id)
                .collect();
            if holders.is_empty() {
                continue;
            }

            let each = self.share_for_placement(pool, placement) / holders.len() as i64;
            allocations.extend(holders.into_iter().map(|participant_id| Allocation {
                participant_id,
                placement,
                amount: each,
            }));
        }

        let allocated: i64 = allocations.iter().map(|a| a.amount).sum();
        if let Some(champion) = allocations.iter_mut().find(|a| a.placement == 1) {
            champion.amount += pool - allocated;
        }

        allocations
    }
}

impl Default for PrizeSplit {
    /// 60 / 30 / 10
    fn default() -> Self {
        Self {
            shares_bps: vec![6000, 3000, 1000],
        }
    }
}

/// Amount owed to one placed participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub participant_id: ParticipantId,
    pub placement: u32,
    pub amount: i64,
}

/// Payout ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub tournament_id: TournamentId,
    pub participant_id: ParticipantId,
    pub placement: u32,
    pub amount: i64,
    pub idempotency_key: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Payout {
    pub fn idempotency_key(tournament_id: TournamentId, participant_id: ParticipantId) -> String {
        format!("prize:{tournament_id}:{participant_id}")
    }
}

/// Outcome of a prize distribution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeDistribution {
    pub tournament_id: TournamentId,
    pub prize_pool: i64,
    /// Payouts written by this run
    pub payouts: Vec<Payout>,
    /// Prizes had already been distributed before this run
    pub already_distributed: bool,
}

/// Human label for a placement: 1st, 2nd, 3rd, else Nth
pub fn placement_label(placement: u32) -> String {
    match placement {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        n => format!("{n}th"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(allocations: &[Allocation]) -> Vec<(i64, u32, i64)> {
        allocations
            .iter()
            .map(|a| (a.participant_id, a.placement, a.amount))
            .collect()
    }

    #[test]
    fn test_split_must_sum_to_whole_pool() {
        assert!(PrizeSplit::new(vec![6000, 3000, 1000]).is_ok());
        assert!(PrizeSplit::new(vec![10_000]).is_ok());
        assert!(matches!(
            PrizeSplit::new(vec![5000, 3000]),
            Err(PrizeError::InvalidSplit(_))
        ));
        assert!(matches!(
            PrizeSplit::new(vec![]),
            Err(PrizeError::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_default_split_sixty_thirty_ten() {
        let split = PrizeSplit::default();
        let allocations = split.allocate(1000, &[(1, 1), (2, 2), (3, 3)]);
        assert_eq!(amounts(&allocations), vec![(1, 1, 600), (2, 2, 300), (3, 3, 100)]);
    }

    #[test]
    fn test_joint_third_place_shares() {
        let split = PrizeSplit::default();
        let allocations = split.allocate(1000, &[(1, 1), (2, 2), (3, 3), (4, 3)]);
        assert_eq!(
            amounts(&allocations),
            vec![(1, 1, 600), (2, 2, 300), (3, 3, 50), (4, 3, 50)]
        );
    }

    #[test]
    fn test_remainder_goes_to_first() {
        let split = PrizeSplit::default();
        let allocations = split.allocate(101, &[(1, 1), (2, 2), (3, 3), (4, 3)]);
        // 60 + 30 + 5 + 5 = 100, one unit of rounding left over
        assert_eq!(
            amounts(&allocations),
            vec![(1, 1, 61), (2, 2, 30), (3, 3, 5), (4, 3, 5)]
        );
        assert_eq!(allocations.iter().map(|a| a.amount).sum::<i64>(), 101);
    }

    #[test]
    fn test_unoccupied_placement_goes_to_first() {
        let split = PrizeSplit::default();
        let allocations = split.allocate(1000, &[(1, 1), (2, 2)]);
        assert_eq!(amounts(&allocations), vec![(1, 1, 700), (2, 2, 300)]);
    }

    #[test]
    fn test_unplaced_get_nothing() {
        let split = PrizeSplit::default();
        let allocations = split.allocate(1000, &[(1, 1), (2, 2), (3, 3), (4, 7)]);
        assert_eq!(allocations.len(), 3);
    }

    #[test]
    fn test_share_for_placement_out_of_range() {
        let split = PrizeSplit::default();
        assert_eq!(split.share_for_placement(1000, 0), 0);
        assert_eq!(split.share_for_placement(1000, 4), 0);
        assert_eq!(split.share_for_placement(1000, 1), 600);
    }

    #[test]
    fn test_labels_and_keys() {
        assert_eq!(placement_label(1), "1st");
        assert_eq!(placement_label(2), "2nd");
        assert_eq!(placement_label(3), "3rd");
        assert_eq!(placement_label(4), "4th");
        assert_eq!(Payout::idempotency_key(7, 42), "prize:7:42");
    }
}
