//src/output.rs

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::merge_store::MergeStore;
use crate::types::MergedEntry;

fn write_row<W: Write>(out: &mut W, entry: &MergedEntry) -> std::io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}",
        entry.classification.flag(),
        entry.read_id,
        entry.tax_id
    )
}

/// Write the merged table as `flag<TAB>read id<TAB>taxon id` lines,
/// sorted by read id. Returns the number of rows written.
pub fn write_merged<W: Write>(store: &dyn MergeStore, out: W) -> Result<u64> {
    let mut out = BufWriter::new(out);
    let mut rows = 0u64;
    store.for_each_sorted(&mut |entry| {
        write_row(&mut out, entry)?;
        rows += 1;
        Ok(())
    })?;
    out.flush()?;
    Ok(rows)
}
