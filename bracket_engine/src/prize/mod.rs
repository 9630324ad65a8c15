//! Prize distribution for completed tournaments.
//!
//! The pool is split by placement in basis points (60 / 30 / 10 by default)
//! and written to a payout ledger with one idempotency key per participant,
//! so distribution can be retried safely.

pub mod distributor;
pub mod errors;
pub mod models;

pub use distributor::{LedgerPrizeDistributor, PrizeDistributor};
pub use errors::{PrizeError, PrizeResult};
pub use models::{Allocation, Payout, PrizeDistribution, PrizeSplit, TOTAL_BPS, placement_label};
