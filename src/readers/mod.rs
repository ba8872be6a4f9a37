//src/readers/mod.rs

pub mod clarks;
pub mod tabular;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{MergeError, Result};
use crate::merge_order::SourceInput;
use crate::merge_stats::ReadSets;
use crate::types::{ClassificationRecord, Source, SourceReadCounts};
use clarks::ClarksRow;

/// Open a classifier output file, decompressing it if the name ends in `.gz`.
pub fn open_input<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Reading,
    Exhausted,
    Failed,
}

/// What a reader learned about its whole file.
#[derive(Debug, Clone)]
pub struct SourceTally {
    pub source: Source,
    pub counts: SourceReadCounts,
    /// Only present when the reader was built `with_read_sets`.
    pub read_sets: Option<ReadSets>,
}

/// Lazy, single-pass stream of the records in one classifier output.
///
/// Every row is counted, including rows that `classified_only` keeps out of
/// the stream. The counts describe the whole file and therefore only exist
/// once the iterator has returned `None`: `counts()` is `None` before that,
/// and `into_tally()` fails with `ReaderNotExhausted`.
pub struct RecordReader {
    source: Source,
    reader: Box<dyn BufRead>,
    buffer: String,
    line_number: usize,
    classified_only: bool,
    counts: SourceReadCounts,
    read_sets: Option<ReadSets>,
    state: ReaderState,
}

impl RecordReader {
    pub fn new(source: Source, reader: Box<dyn BufRead>, classified_only: bool) -> Self {
        Self {
            source,
            reader,
            buffer: String::with_capacity(256),
            line_number: 0,
            classified_only,
            counts: SourceReadCounts::default(),
            read_sets: None,
            state: ReaderState::Reading,
        }
    }

    /// Open the file behind a validated input.
    pub fn open(input: &SourceInput, classified_only: bool) -> Result<Self> {
        let reader = open_input(input.path()).map_err(|error| MergeError::Open {
            source_name: input.source(),
            path: input.path().to_path_buf(),
            error,
        })?;
        Ok(Self::new(input.source(), reader, classified_only))
    }

    /// Also remember which read ids were classified / unclassified.
    pub fn with_read_sets(mut self) -> Self {
        self.read_sets = Some(ReadSets::default());
        self
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ReaderState::Exhausted
    }

    pub fn counts(&self) -> Option<&SourceReadCounts> {
        if self.is_exhausted() {
            Some(&self.counts)
        } else {
            None
        }
    }

    pub fn into_tally(self) -> Result<SourceTally> {
        if !self.is_exhausted() {
            return Err(MergeError::ReaderNotExhausted(self.source));
        }
        Ok(SourceTally {
            source: self.source,
            counts: self.counts,
            read_sets: self.read_sets,
        })
    }

    /// Next counted row of the file, before any classified-only filtering.
    fn next_row(&mut self) -> Result<Option<ClassificationRecord>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.buffer.trim_end_matches(['\n', '\r']);

            match self.source {
                Source::Kaiju | Source::Kraken => {
                    match tabular::parse_line(line, self.source) {
                        Ok(Some(record)) => return Ok(Some(record)),
                        Ok(None) => continue,
                        Err(message) => {
                            return Err(MergeError::Parse {
                                source_name: self.source,
                                line: self.line_number,
                                message,
                            })
                        }
                    }
                }
                Source::Clarks => {
                    // Header line, never validated
                    if self.line_number == 1 {
                        continue;
                    }
                    match clarks::parse_line(line) {
                        ClarksRow::Record(record) => return Ok(Some(record)),
                        ClarksRow::Blank => continue,
                        ClarksRow::MissingTaxon => {
                            log::warn!(
                                "Skipping malformed CLARK-S row at line {}: {}",
                                self.line_number,
                                line
                            );
                            continue;
                        }
                    }
                }
            }
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<ClassificationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != ReaderState::Reading {
            return None;
        }

        loop {
            match self.next_row() {
                Ok(Some(record)) => {
                    self.counts.record(record.classification);
                    if let Some(sets) = self.read_sets.as_mut() {
                        sets.insert(&record);
                    }
                    if self.classified_only && !record.classification.is_classified() {
                        continue;
                    }
                    return Some(Ok(record));
                }
                Ok(None) => {
                    self.state = ReaderState::Exhausted;
                    return None;
                }
                Err(e) => {
                    self.state = ReaderState::Failed;
                    return Some(Err(e));
                }
            }
        }
    }
}
