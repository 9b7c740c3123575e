//! External ATPG batch generators (`atalanta`, `podem`).
//!
//! Both tools read a bench netlist and write a `.test` file with one
//! pattern per line. The tool's input order is taken from the bench
//! `INPUT(...)` lines; bit-blasted inputs (`data[3]`) are folded back into
//! one multi-bit port so the set lines up with the module's real ports.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use faultsim_netlist::{Direction, Port};

use crate::generator::GeneratorKind;
use crate::vector::{input_maxima, StimulusError, TestVector, TestVectorSet};

#[derive(Debug, thiserror::Error)]
pub enum AtpgError {
    #[error("{tool} is not an external generator")]
    NotExternal { tool: GeneratorKind },

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: GeneratorKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status:?}: {diagnostics}")]
    ToolFailed {
        tool: GeneratorKind,
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("ATPG I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Stimulus(#[from] StimulusError),

    #[error("Malformed ATPG pattern at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// No vectors came back; usually floating nets or outputs in the bench.
    #[error("{tool} produced no test vectors for module '{module}'; check the bench netlist for floating nets or outputs")]
    InvalidNetlist { tool: GeneratorKind, module: String },
}

/// One `INPUT(...)` line of a bench netlist.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BenchInput {
    base: String,
    bit: Option<i64>,
}

/// A configured external generator.
#[derive(Debug, Clone)]
pub struct ExternalAtpg {
    pub kind: GeneratorKind,
    pub executable: PathBuf,
    /// Where the tool's `.test` output is written.
    pub work_dir: PathBuf,
}

impl ExternalAtpg {
    /// Use the executable named after the generator, looked up on `PATH`.
    pub fn new(kind: GeneratorKind, work_dir: impl Into<PathBuf>) -> Result<Self, AtpgError> {
        if !kind.is_external() {
            return Err(AtpgError::NotExternal { tool: kind });
        }
        Ok(Self {
            kind,
            executable: PathBuf::from(kind.to_string()),
            work_dir: work_dir.into(),
        })
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Run the tool over `bench` and parse its patterns.
    pub fn generate(&self, bench: &Path, module: &str) -> Result<TestVectorSet, AtpgError> {
        fs::create_dir_all(&self.work_dir)?;
        let test_file = self.work_dir.join(format!("{module}.test"));

        tracing::debug!(tool = %self.kind, bench = %bench.display(), "Running ATPG");
        let output = Command::new(&self.executable)
            .arg("-t")
            .arg(&test_file)
            .arg(bench)
            .output()
            .map_err(|source| AtpgError::Spawn { tool: self.kind, source })?;

        if !output.status.success() {
            return Err(AtpgError::ToolFailed {
                tool: self.kind,
                status: output.status.code(),
                diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let bench_text = fs::read_to_string(bench)?;
        let test_text = fs::read_to_string(&test_file)?;
        let set = parse_patterns(&bench_text, &test_text)?;
        set.validate()?;
        if set.is_empty() {
            return Err(AtpgError::InvalidNetlist {
                tool: self.kind,
                module: module.to_string(),
            });
        }
        tracing::info!(tool = %self.kind, vectors = set.len(), "Generated test vectors");
        Ok(set)
    }
}

fn parse_bench_inputs(bench: &str) -> Vec<BenchInput> {
    bench
        .lines()
        .filter_map(|line| {
            let inner = line.trim().strip_prefix("INPUT(")?.strip_suffix(')')?.trim();
            Some(split_bit(inner))
        })
        .collect()
}

fn split_bit(name: &str) -> BenchInput {
    if let Some(open) = name.rfind('[') {
        if let Some(index) = name[open + 1..].strip_suffix(']') {
            if let Ok(bit) = index.parse::<i64>() {
                return BenchInput {
                    base: name[..open].to_string(),
                    bit: Some(bit),
                };
            }
        }
    }
    BenchInput {
        base: name.to_string(),
        bit: None,
    }
}

/// Fold bench inputs into ports; returns the ports and, for each bench
/// column, the owning port index and bit offset within it.
fn fold_inputs(columns: &[BenchInput]) -> (Vec<Port>, Vec<(usize, u32)>) {
    let mut ports: Vec<Port> = Vec::new();
    for column in columns {
        let bit = column.bit.unwrap_or(0);
        match ports.iter_mut().find(|p| p.name == column.base) {
            Some(port) => {
                port.from = port.from.max(bit);
                port.to = port.to.min(bit);
            }
            None => {
                let ordinal = ports.len();
                ports.push(Port::new(column.base.clone(), ordinal).with_range(Direction::Input, bit, bit));
            }
        }
    }

    let layout = columns
        .iter()
        .map(|column| {
            let index = ports.iter().position(|p| p.name == column.base).unwrap_or_default();
            let offset = column.bit.unwrap_or(0) - ports[index].to;
            (index, offset as u32)
        })
        .collect();
    (ports, layout)
}

/// Parse a `.test` file against the bench input order.
///
/// Pattern lines look like `12: 0x10 1`; the first bit field is the input
/// pattern and don't-care bits are driven low.
fn parse_patterns(bench: &str, test: &str) -> Result<TestVectorSet, AtpgError> {
    let columns = parse_bench_inputs(bench);
    let (inputs, layout) = fold_inputs(&columns);
    // Offsets index into a u64 only once every folded port fits one.
    input_maxima(&inputs)?;

    let mut vectors = Vec::new();
    for (number, line) in test.lines().enumerate() {
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };
        if label.trim().parse::<u64>().is_err() {
            continue;
        }
        let Some(bits) = rest.split_whitespace().next() else {
            continue;
        };
        if bits.len() != columns.len() {
            return Err(AtpgError::Malformed {
                line: number + 1,
                reason: format!("expected {} input bits, got {}", columns.len(), bits.len()),
            });
        }

        let mut values = vec![0u64; inputs.len()];
        for (ch, (port, offset)) in bits.chars().zip(&layout) {
            match ch {
                '1' => values[*port] |= 1u64 << offset,
                '0' | 'x' | 'X' => {}
                other => {
                    return Err(AtpgError::Malformed {
                        line: number + 1,
                        reason: format!("unexpected pattern character '{other}'"),
                    })
                }
            }
        }
        vectors.push(TestVector(values));
    }

    Ok(TestVectorSet { inputs, vectors })
}
