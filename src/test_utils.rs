//! Shared helpers for the crate's tests.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic RNG so test failures reproduce.
pub fn test_rng() -> StdRng {
    test_rng_seeded(0x1234_5678_9abc_def0)
}

pub fn test_rng_seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
