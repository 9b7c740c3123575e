pub mod atpg;
pub mod generator;
pub mod rng;
pub mod source;
pub mod tvset;
pub mod vector;

pub use generator::GeneratorKind;
pub use source::{FixedVectorSource, RandomVectorSource, VectorSource};
pub use vector::{StimulusError, TestVector, TestVectorSet, VectorLedger};
