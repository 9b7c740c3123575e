//! Random sources for stimulus generation.
//!
//! Both sources are seeded, so the same seed always yields the same vectors.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Feedback taps of x^64 + x^63 + x^61 + x^60 + 1 (maximal length).
const LFSR_TAPS: u64 = 0xD800_0000_0000_0000;

/// Substitute for the all-zero lock-up state.
const LFSR_FALLBACK_SEED: u64 = 0xACE1_ACE1_ACE1_ACE1;

/// Produce an unsigned integer uniformly in `[0, max]`.
pub trait RandomSource {
    fn generate(&mut self, max: u64) -> u64;
}

/// Create a deterministic RNG for a run seed and stream id.
pub fn stream_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.wrapping_add(stream))
}

/// The internal uniform generator.
pub struct ChaChaSource {
    rng: ChaCha8Rng,
}

impl ChaChaSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for ChaChaSource {
    fn generate(&mut self, max: u64) -> u64 {
        self.rng.gen_range(0..=max)
    }
}

/// 64-bit Galois linear-feedback shift register.
#[derive(Debug, Clone)]
pub struct Lfsr {
    state: u64,
}

impl Lfsr {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { LFSR_FALLBACK_SEED } else { seed };
        Self { state }
    }

    fn step(&mut self) {
        let lsb = self.state & 1;
        self.state >>= 1;
        if lsb == 1 {
            self.state ^= LFSR_TAPS;
        }
    }

    /// Shift a full word so consecutive outputs do not overlap.
    pub fn next_word(&mut self) -> u64 {
        for _ in 0..64 {
            self.step();
        }
        self.state
    }
}

impl RandomSource for Lfsr {
    fn generate(&mut self, max: u64) -> u64 {
        let Some(span) = max.checked_add(1) else {
            return self.next_word();
        };
        // Words at or above the last whole multiple of span are redrawn so
        // every value in 0..=max is equally likely.
        let zone = u64::MAX - (u64::MAX - max) % span;
        loop {
            let word = self.next_word();
            if word <= zone {
                return word % span;
            }
        }
    }
}
