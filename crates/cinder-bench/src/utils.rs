//! Benchmark utilities and helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Derives the value stored for a logical index.
///
/// Deterministic so find phases can verify contents without keeping a
/// shadow copy of the data set.
#[must_use]
pub fn value_for(idx: u64) -> u64 {
    idx.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Generates a shuffled access order over `[0, count)` for random-access
/// measurement phases.
#[must_use]
pub fn shuffled_indices(count: u64, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<u64> = (0..count).collect();
    // Fisher-Yates
    for i in (1..indices.len()).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }
    indices
}
