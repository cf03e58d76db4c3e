use rand::{rngs::StdRng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a [`StdRng`] from an explicit seed.
///
/// Used by the reference network so that tests construct byte-identical
/// frozen weights regardless of what else ran in the process.
pub fn rng_from_seed(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Create a [`StdRng`] seeded from the `SEED` environment variable.
///
/// Each call draws a unique seed derived from the base seed and an
/// incrementing counter so repeated constructions get distinct but
/// reproducible streams.
pub fn rng_from_env() -> StdRng {
    let base: u64 = std::env::var("SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let idx = COUNTER.fetch_add(1, Ordering::SeqCst);
    rng_from_seed(base.wrapping_add(idx))
}
