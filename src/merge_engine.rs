//src/merge_engine.rs

use std::time::Instant;

use crate::error::Result;
use crate::merge_order::MergePlan;
use crate::merge_store::MergeStore;
use crate::readers::{RecordReader, SourceTally};
use crate::types::MergedEntry;

/// Applies sources to a `MergeStore` in priority order.
///
/// The first source is loaded as is, classified or not. Every later source
/// only contributes its classified calls, and those only replace an
/// unclassified entry or fill in a missing read. The entry left for a read is
/// therefore the call of the highest-priority source that classified it, or
/// the first source's unclassified call when nobody did.
pub struct MergeEngine<S: MergeStore> {
    store: S,
    chunk_size: usize,
    track_overlaps: bool,
}

impl<S: MergeStore> MergeEngine<S> {
    pub fn new(store: S, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
            track_overlaps: false,
        }
    }

    /// Keep per-source read id sets for the pairwise overlap report.
    pub fn with_overlap_tracking(mut self, enabled: bool) -> Self {
        self.track_overlaps = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Read every input of `plan` into the store. Returns one tally per
    /// source, in merge order.
    pub fn merge(&mut self, plan: &MergePlan) -> Result<Vec<SourceTally>> {
        log::info!("Merging data sources according to merge order: {}", plan.order_string());

        let mut tallies = Vec::with_capacity(plan.inputs.len());
        for (priority, input) in plan.inputs.iter().enumerate() {
            let mut reader = RecordReader::open(input, priority > 0)?;
            if self.track_overlaps {
                reader = reader.with_read_sets();
            }
            log::debug!("Reading {} from {}...", input.source(), input.path().display());
            tallies.push(self.merge_reader(reader, priority == 0)?);
        }

        log::debug!("{} reads in merged table.", self.store.len()?);
        Ok(tallies)
    }

    /// Drain one reader into the store, `chunk_size` records at a time.
    /// `first` selects unconditional insertion (highest priority source)
    /// over filling in unclassified or missing reads.
    pub fn merge_reader(&mut self, mut reader: RecordReader, first: bool) -> Result<SourceTally> {
        let tic = Instant::now();
        let source = reader.source();

        let mut chunk: Vec<MergedEntry> = Vec::with_capacity(self.chunk_size.min(8192));
        for record in reader.by_ref() {
            chunk.push(record?);
            if chunk.len() >= self.chunk_size {
                self.flush(std::mem::take(&mut chunk), first)?;
            }
        }
        if !chunk.is_empty() {
            self.flush(chunk, first)?;
        }

        let tally = reader.into_tally()?;
        log::debug!(
            "Reading {} completed in {:.2} seconds ({} reads).",
            source,
            tic.elapsed().as_secs_f64(),
            tally.counts.total
        );
        Ok(tally)
    }

    fn flush(&mut self, chunk: Vec<MergedEntry>, first: bool) -> Result<()> {
        if first {
            self.store.insert_batch(chunk)
        } else {
            self.store.overwrite_unclassified_batch(chunk)
        }
    }
}
