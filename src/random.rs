//! Seeded random DNA sequences for benchmarks, query generation, and tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The DNA alphabet in the order used for random draws.
pub const BASES: [u8; 4] = *b"ACGT";

/// Random DNA sequence drawn from an existing generator.
pub fn random_sequence_rng(len: usize, rng: &mut impl Rng) -> String {
    let bytes: Vec<u8> = (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect();
    // always valid UTF-8, the alphabet is ASCII
    String::from_utf8(bytes).unwrap()
}

/// Random DNA sequence from a fresh generator with the given seed.
pub fn random_sequence(len: usize, seed: u64) -> String {
    random_sequence_rng(len, &mut StdRng::seed_from_u64(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_and_length() {
        let s = random_sequence(1000, 42);
        assert_eq!(s.len(), 1000);
        assert!(s.bytes().all(|b| BASES.contains(&b)));
    }

    #[test]
    fn test_seed_determinism() {
        assert_eq!(random_sequence(64, 7), random_sequence(64, 7));
        assert_ne!(random_sequence(64, 7), random_sequence(64, 8));
    }
}
