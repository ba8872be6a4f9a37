//src/readers/clarks.rs
//
// CLARK-S writes a CSV with one header line:
//   Object_ID,Length,Assignment,...
// Paired reads carry a /1 or /2 suffix on the object id.

use crate::types::{Classification, ClassificationRecord, Source};

/// Outcome of parsing one CLARK-S data row.
#[derive(Debug, PartialEq, Eq)]
pub enum ClarksRow {
    Record(ClassificationRecord),
    /// Empty line, silently ignored.
    Blank,
    /// Fewer than three columns; logged and dropped by the reader.
    MissingTaxon,
}

/// Strip a trailing mate suffix so both reads of a pair share one id.
pub fn strip_mate_suffix(read_id: &str) -> &str {
    read_id
        .strip_suffix("/1")
        .or_else(|| read_id.strip_suffix("/2"))
        .unwrap_or(read_id)
}

pub fn parse_line(line: &str) -> ClarksRow {
    if line.trim().is_empty() {
        return ClarksRow::Blank;
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 3 {
        return ClarksRow::MissingTaxon;
    }

    let read_id = strip_mate_suffix(fields[0]).to_string();

    // A non-numeric assignment (e.g. "NA") is how CLARK-S says "no call".
    let record = match fields[2].trim().parse::<u32>() {
        Ok(tax_id) => ClassificationRecord::new(Classification::Classified, read_id, tax_id, Source::Clarks),
        Err(_) => ClassificationRecord::new(Classification::Unclassified, read_id, 0, Source::Clarks),
    };
    ClarksRow::Record(record)
}
