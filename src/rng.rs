//! Per-replicate random streams. Each replicate owns a `StdRng` seeded from
//! the run's base seed and its replicate index; generators are never shared.

const GOLDEN_GAMMA: u64 = 0x9E3779B97F4A7C15;

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(GOLDEN_GAMMA);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Seed of replicate `replicate` in a run seeded with `base_seed`.
#[inline]
pub fn replicate_seed(base_seed: u64, replicate: u64) -> u64 {
    splitmix64(base_seed ^ replicate.wrapping_mul(GOLDEN_GAMMA))
}
