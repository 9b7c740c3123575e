//! Loading externally supplied vector sets.
//!
//! Two layouts are accepted: the persisted coverage report (JSON) and a
//! plain-text table whose first line names the inputs, e.g.
//!
//! ```text
//! a b[3:0]
//! 1 0101
//! 0 1111
//! ```

use std::fs;
use std::path::Path;

use faultsim_netlist::{Direction, Port};
use serde::Deserialize;

use crate::vector::{StimulusError, TestVector, TestVectorSet};

/// Subset of the persisted report needed to replay its vectors.
#[derive(Debug, Deserialize)]
struct StoredReport {
    inputs: Vec<Port>,
    coverage_list: Vec<StoredEntry>,
}

#[derive(Debug, Deserialize)]
struct StoredEntry {
    vector: TestVector,
}

impl TestVectorSet {
    /// Load from `path`, picking the layout by extension (`.json` or text).
    pub fn load(path: &Path) -> Result<Self, StimulusError> {
        let text = fs::read_to_string(path)?;
        let set = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text)?,
            _ => Self::from_text(&text)?,
        };
        tracing::info!(path = %path.display(), vectors = set.len(), "Read test vectors");
        Ok(set)
    }

    pub fn from_json(json: &str) -> Result<Self, StimulusError> {
        let stored: StoredReport = serde_json::from_str(json)?;
        let set = TestVectorSet {
            inputs: stored.inputs,
            vectors: stored.coverage_list.into_iter().map(|e| e.vector).collect(),
        };
        set.validate()?;
        Ok(set)
    }

    pub fn from_text(text: &str) -> Result<Self, StimulusError> {
        let mut rows = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let Some((header_line, header)) = rows.next() else {
            return Err(StimulusError::Malformed {
                line: 1,
                reason: "missing input header".into(),
            });
        };
        let inputs = header
            .split_whitespace()
            .enumerate()
            .map(|(ordinal, column)| parse_column(column, ordinal, header_line))
            .collect::<Result<Vec<_>, _>>()?;

        let mut vectors = Vec::new();
        for (line, row) in rows {
            let fields: Vec<&str> = row.split_whitespace().collect();
            if fields.len() != inputs.len() {
                return Err(StimulusError::Malformed {
                    line,
                    reason: format!("expected {} columns, got {}", inputs.len(), fields.len()),
                });
            }
            let values = fields
                .iter()
                .map(|field| {
                    u64::from_str_radix(field, 2).map_err(|_| StimulusError::Malformed {
                        line,
                        reason: format!("'{field}' is not a binary value"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            vectors.push(TestVector(values));
        }

        let set = TestVectorSet { inputs, vectors };
        set.validate()?;
        Ok(set)
    }
}

/// `name` or `name[msb:lsb]`.
fn parse_column(column: &str, ordinal: usize, line: usize) -> Result<Port, StimulusError> {
    let malformed = || StimulusError::Malformed {
        line,
        reason: format!("bad input column '{column}'"),
    };

    let Some(open) = column.find('[') else {
        return Ok(Port::new(column, ordinal).with_range(Direction::Input, 0, 0));
    };
    let range = column[open + 1..].strip_suffix(']').ok_or_else(malformed)?;
    let (msb, lsb) = range.split_once(':').ok_or_else(malformed)?;
    let msb = msb.trim().parse::<i64>().map_err(|_| malformed())?;
    let lsb = lsb.trim().parse::<i64>().map_err(|_| malformed())?;
    Ok(Port::new(&column[..open], ordinal).with_range(Direction::Input, msb, lsb))
}
