use std::fmt;
use std::str::FromStr;

use faultsim_netlist::Port;
use serde::{Deserialize, Serialize};

use crate::rng::{ChaChaSource, Lfsr};
use crate::source::{RandomVectorSource, VectorSource};
use crate::vector::StimulusError;

/// Stimulus strategy selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Internal uniform generator.
    #[default]
    Uniform,
    Lfsr,
    /// External ATPG batch producers.
    Atalanta,
    Podem,
}

impl GeneratorKind {
    /// External kinds produce a whole vector set up front instead of
    /// generating per round.
    pub fn is_external(self) -> bool {
        matches!(self, GeneratorKind::Atalanta | GeneratorKind::Podem)
    }

    /// Build the per-round source for an internal kind; `None` for external kinds.
    pub fn random_source(
        self,
        seed: u64,
        inputs: &[Port],
    ) -> Result<Option<Box<dyn VectorSource>>, StimulusError> {
        let source: Box<dyn VectorSource> = match self {
            GeneratorKind::Uniform => Box::new(RandomVectorSource::new(ChaChaSource::new(seed), inputs, "uniform")?),
            GeneratorKind::Lfsr => Box::new(RandomVectorSource::new(Lfsr::new(seed), inputs, "lfsr")?),
            GeneratorKind::Atalanta | GeneratorKind::Podem => return Ok(None),
        };
        Ok(Some(source))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unknown test-vector generator '{0}' (expected uniform, lfsr, atalanta or podem)")]
pub struct UnknownGenerator(pub String);

impl FromStr for GeneratorKind {
    type Err = UnknownGenerator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" | "swift" => Ok(GeneratorKind::Uniform),
            "lfsr" => Ok(GeneratorKind::Lfsr),
            "atalanta" => Ok(GeneratorKind::Atalanta),
            "podem" => Ok(GeneratorKind::Podem),
            _ => Err(UnknownGenerator(s.to_string())),
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeneratorKind::Uniform => "uniform",
            GeneratorKind::Lfsr => "lfsr",
            GeneratorKind::Atalanta => "atalanta",
            GeneratorKind::Podem => "podem",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("LFSR".parse::<GeneratorKind>(), Ok(GeneratorKind::Lfsr));
        assert_eq!("swift".parse::<GeneratorKind>(), Ok(GeneratorKind::Uniform));
        assert_eq!("atalanta".parse::<GeneratorKind>(), Ok(GeneratorKind::Atalanta));
        assert!("quantum".parse::<GeneratorKind>().is_err());
    }

    #[test]
    fn test_external_kinds_have_no_random_source() {
        assert!(GeneratorKind::Podem.is_external());
        assert!(GeneratorKind::Podem.random_source(1, &[]).unwrap().is_none());
        assert!(GeneratorKind::Uniform.random_source(1, &[]).unwrap().is_some());
    }
}
