use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::errors::EngineError;
use crate::models::User;

/// Uniform random reviewer selection over a candidate pool.
///
/// Pure with respect to the store: no side effects, no state beyond the RNG.
/// The RNG is injectable via `seeded` so tests get reproducible picks; the
/// mutex is held only for the duration of one draw.
pub struct Selector {
    rng: Mutex<StdRng>,
}

impl Selector {
    pub fn new() -> Self {
        Self::seeded(rand::random())
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Choose up to `k` distinct candidates, unweighted. When the pool has
    /// `k` or fewer members, all of them are returned.
    pub fn pick(&self, candidates: &[User], k: usize) -> Vec<User> {
        if candidates.len() <= k {
            return candidates.to_vec();
        }
        let mut rng = self.lock_rng();
        candidates.choose_multiple(&mut *rng, k).cloned().collect()
    }

    /// Choose a single candidate uniformly at random.
    pub fn pick_one(&self, candidates: &[User]) -> Result<User, EngineError> {
        let mut rng = self.lock_rng();
        candidates
            .choose(&mut *rng)
            .cloned()
            .ok_or(EngineError::NoCandidate)
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        // A poisoned RNG lock carries no broken invariant; reclaim it.
        match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}
