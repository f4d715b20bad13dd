//! Deterministic RNG (C2).
//!
//! A single process-wide seed produces a stable sequence: the same seed value and seed-file
//! hash always yields bit-identical generation output (modulo map-iteration order, which
//! every serialization path normalizes by sorting on stable id). Generators never share a
//! mutable RNG across concurrent tasks — each developer and each repository gets its own
//! child stream, derived deterministically from the root seed plus a stable discriminant, so
//! fanning generation out across `tokio::task::JoinSet` never races two tasks over one
//! generator's internal state.
//!
//! `ChaCha8Rng` is used instead of `rand::rngs::StdRng` because `StdRng`'s algorithm is not
//! part of its public contract and can change between `rand` releases, which would silently
//! break the "same seed -> same output" guarantee across a `cargo update`. `ChaCha8Rng` pins
//! a named, versioned algorithm.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;

/// Root seed for a whole generation run. Two runs with the same `RootSeed` (and the same
/// seed-file hash feeding the pipeline) reproduce byte-identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootSeed(pub u64);

impl RootSeed {
    pub fn root_rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }

    /// Deterministic child stream for a developer, keyed by their position in the roster
    /// rather than their id, so inserting clones never perturbs earlier developers' streams.
    pub fn developer_rng(self, developer_index: usize) -> ChaCha8Rng {
        self.child_rng("developer", developer_index as u64)
    }

    /// Deterministic child stream for a repository.
    pub fn repo_rng(self, repo_index: usize) -> ChaCha8Rng {
        self.child_rng("repo", repo_index as u64)
    }

    /// A generic named/indexed child stream, for generator stages that need their own
    /// independent draw sequence (e.g. review reviewer sampling, issue generation).
    pub fn child_rng(self, label: &str, index: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(mix(self.0, label, index))
    }
}

/// Splitmix-style avalanche mix so nearby (label, index) pairs don't produce correlated
/// seeds. Deterministic across platforms and `rand` versions since it only uses u64 ops.
fn mix(seed: u64, label: &str, index: u64) -> u64 {
    let mut h: u64 = seed ^ 0x9E3779B97F4A7C15;
    for byte in label.as_bytes() {
        h ^= *byte as u64;
        h = h.wrapping_mul(0x100000001B3);
    }
    h ^= index.wrapping_mul(0xFF51AFD7ED558CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51AFD7ED558CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CEB9FE1A85EC53);
    h ^= h >> 33;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_yields_same_sequence() {
        let mut a = RootSeed(42).root_rng();
        let mut b = RootSeed(42).root_rng();
        let draws_a: Vec<u32> = (0..10).map(|_| a.gen()).collect();
        let draws_b: Vec<u32> = (0..10).map(|_| b.gen()).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = RootSeed(42).root_rng();
        let mut b = RootSeed(43).root_rng();
        let draw_a: u32 = a.gen();
        let draw_b: u32 = b.gen();
        assert_ne!(draw_a, draw_b);
    }

    #[test]
    fn child_streams_are_independent_of_each_other() {
        let seed = RootSeed(7);
        let mut dev0 = seed.developer_rng(0);
        let mut dev1 = seed.developer_rng(1);
        let a: u64 = dev0.gen();
        let b: u64 = dev1.gen();
        assert_ne!(a, b);
    }

    #[test]
    fn child_streams_are_stable_across_calls() {
        let seed = RootSeed(7);
        let mut first = seed.developer_rng(3);
        let mut second = seed.developer_rng(3);
        let a: u64 = first.gen();
        let b: u64 = second.gen();
        assert_eq!(a, b);
    }
}
