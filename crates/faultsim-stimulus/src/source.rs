use faultsim_netlist::Port;

use crate::rng::RandomSource;
use crate::vector::{input_maxima, StimulusError, TestVector, TestVectorSet};

/// Abstract source of stimulus for the coverage loop.
///
/// Random sources never run dry; a fixed set returns `None` once drained.
pub trait VectorSource {
    fn next_vector(&mut self) -> Option<TestVector>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Draws every input uniformly from its full range.
pub struct RandomVectorSource<R: RandomSource> {
    rng: R,
    maxima: Vec<u64>,
    name: &'static str,
}

impl<R: RandomSource> RandomVectorSource<R> {
    /// Fails if any input is wider than a vector component can hold.
    pub fn new(rng: R, inputs: &[Port], name: &'static str) -> Result<Self, StimulusError> {
        Ok(Self {
            rng,
            maxima: input_maxima(inputs)?,
            name,
        })
    }
}

impl<R: RandomSource> VectorSource for RandomVectorSource<R> {
    fn next_vector(&mut self) -> Option<TestVector> {
        let values = self.maxima.iter().map(|max| self.rng.generate(*max)).collect();
        Some(TestVector(values))
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Replays a supplied vector set in order.
pub struct FixedVectorSource {
    vectors: std::vec::IntoIter<TestVector>,
}

impl FixedVectorSource {
    pub fn new(set: TestVectorSet) -> Self {
        Self {
            vectors: set.vectors.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.vectors.len()
    }
}

impl VectorSource for FixedVectorSource {
    fn next_vector(&mut self) -> Option<TestVector> {
        self.vectors.next()
    }

    fn name(&self) -> &str {
        "vector-set"
    }
}
