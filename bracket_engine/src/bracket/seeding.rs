//! Participant seeding for bracket placement.

use rand::Rng;
use rand::seq::SliceRandom;

use super::models::Participant;

/// Order participants for bracket entry.
///
/// When any participant carries an explicit seed the list is sorted by seed
/// (stable, unseeded participants last). Otherwise it is shuffled with the
/// supplied random source so nobody is structurally advantaged.
///
/// # Arguments
///
/// * `participants` - Participants to seed
/// * `rng` - Random source, used only when no seeds are present
///
/// # Returns
///
/// * `Vec<Participant>` - Participants in bracket entry order
pub fn seed_participants<R: Rng + ?Sized>(
    participants: &[Participant],
    rng: &mut R,
) -> Vec<Participant> {
    let mut ordered = participants.to_vec();

    if ordered.iter().any(|p| p.seed.is_some()) {
        ordered.sort_by_key(|p| p.seed.unwrap_or(u32::MAX));
    } else {
        ordered.shuffle(rng);
    }

    ordered
}
