//! The run's single random generator.
//!
//! Every draw in a run goes through one `StdRng`, passed explicitly to each
//! sampling call. The draw order per shot is fixed, so a seed replays a run
//! exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Generator for a run, plus the seed it was built from.
///
/// Without a seed, one is drawn from OS entropy so the run can still be
/// replayed once the seed has been logged.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> (StdRng, u64) {
    let seed = seed.unwrap_or_else(rand::random);
    (StdRng::seed_from_u64(seed), seed)
}

/// One draw from `N(0, std_dev²)`.
///
/// Always consumes a draw, even for `std_dev == 0`, so the stream position
/// does not depend on the noise settings.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * std_dev
}
