// src/lib.rs
pub mod error;
pub mod merge_engine;
pub mod merge_order;
pub mod merge_stats;
pub mod merge_store;
pub mod output;
pub mod readers;
pub mod types;

use std::io::Write;

pub use crate::error::{MergeError, Result};
pub use crate::merge_order::{InputPaths, MergeConfig, MergePlan, SourceInput};
pub use crate::types::{Classification, ClassificationRecord, MergedEntry, Source, SourceReadCounts};

use crate::merge_engine::MergeEngine;
use crate::merge_stats::SummaryReport;
use crate::merge_store::{MemoryStore, MergeStore, SqliteStore};
use crate::readers::SourceTally;

/// Outcome of a merge run: the finished store plus everything counted on the way.
pub struct MergeResults {
    /// The merged table, one entry per read id.
    pub store: Box<dyn MergeStore>,
    /// Per-source tallies, in merge order.
    pub tallies: Vec<SourceTally>,
    pub summary: SummaryReport,
}

impl MergeResults {
    /// Write the merged table (sorted by read id) to `out`.
    pub fn write_merged<W: Write>(&self, out: W) -> Result<u64> {
        output::write_merged(self.store.as_ref(), out)
    }

    /// Generate the merged table text on demand
    pub fn get_merged_output(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_merged(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Validate `config`, merge its inputs in priority order and compute the summary.
///
/// Configuration errors are returned before any input file is opened.
pub fn merge_classifications(config: &MergeConfig) -> Result<MergeResults> {
    let plan = config.plan()?;
    log::info!("Merge order: {}", plan.order_string());

    let store: Box<dyn MergeStore> = match &config.dbfile {
        Some(path) => {
            log::debug!("Using on-disk merge store {}", path.display());
            Box::new(SqliteStore::open(path)?)
        }
        None => Box::new(MemoryStore::new()),
    };

    let mut engine = MergeEngine::new(store, plan.chunk_size).with_overlap_tracking(config.track_overlaps);
    let tallies = engine.merge(&plan)?;
    let store = engine.into_store();

    let summary = SummaryReport::build(&tallies, store.grouped_counts()?);
    Ok(MergeResults {
        store,
        tallies,
        summary,
    })
}
