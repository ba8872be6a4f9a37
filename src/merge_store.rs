//src/merge_store.rs

use std::collections::BTreeMap;
use std::path::Path;

use ahash::AHashMap;
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::types::{Classification, MergedEntry, Source};

/// Number of surviving entries per (source, classification) pair.
pub type GroupedCounts = AHashMap<(Source, Classification), u64>;

/// Ordered table of the current best call per read id.
///
/// There is at most one entry per read id, and entries are only ever
/// replaced whole. `MergeEngine` decides which primitive each source uses.
pub trait MergeStore {
    /// Store every record. A read id seen twice keeps the last record.
    fn insert_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()>;

    /// Store the classified records of `batch` whose read id is either absent
    /// or currently unclassified. Unclassified records are ignored, and a
    /// classified entry is never replaced.
    fn overwrite_unclassified_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()>;

    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn get(&self, read_id: &str) -> Result<Option<MergedEntry>>;

    fn grouped_counts(&self) -> Result<GroupedCounts>;

    /// Visit every entry in ascending read id order.
    fn for_each_sorted(&self, f: &mut dyn FnMut(&MergedEntry) -> Result<()>) -> Result<()>;
}

impl<S: MergeStore + ?Sized> MergeStore for Box<S> {
    fn insert_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()> {
        (**self).insert_batch(batch)
    }

    fn overwrite_unclassified_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()> {
        (**self).overwrite_unclassified_batch(batch)
    }

    fn len(&self) -> Result<u64> {
        (**self).len()
    }

    fn get(&self, read_id: &str) -> Result<Option<MergedEntry>> {
        (**self).get(read_id)
    }

    fn grouped_counts(&self) -> Result<GroupedCounts> {
        (**self).grouped_counts()
    }

    fn for_each_sorted(&self, f: &mut dyn FnMut(&MergedEntry) -> Result<()>) -> Result<()> {
        (**self).for_each_sorted(f)
    }
}

#[derive(Debug, Clone, Copy)]
struct StoredCall {
    classification: Classification,
    tax_id: u32,
    source: Source,
}

impl StoredCall {
    fn to_entry(self, read_id: &str) -> MergedEntry {
        MergedEntry::new(self.classification, read_id.to_string(), self.tax_id, self.source)
    }
}

/// In-memory store backed by a `BTreeMap`, the default.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, StoredCall>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, entry: MergedEntry) {
        let call = StoredCall {
            classification: entry.classification,
            tax_id: entry.tax_id,
            source: entry.source,
        };
        self.entries.insert(entry.read_id, call);
    }
}

impl MergeStore for MemoryStore {
    fn insert_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()> {
        for entry in batch {
            self.put(entry);
        }
        Ok(())
    }

    fn overwrite_unclassified_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()> {
        for entry in batch {
            if !entry.classification.is_classified() {
                continue;
            }
            let taken = self
                .entries
                .get(&entry.read_id)
                .map(|call| call.classification.is_classified())
                .unwrap_or(false);
            if !taken {
                self.put(entry);
            }
        }
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.entries.len() as u64)
    }

    fn get(&self, read_id: &str) -> Result<Option<MergedEntry>> {
        Ok(self.entries.get(read_id).map(|call| call.to_entry(read_id)))
    }

    fn grouped_counts(&self) -> Result<GroupedCounts> {
        let mut counts = GroupedCounts::new();
        for call in self.entries.values() {
            *counts.entry((call.source, call.classification)).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn for_each_sorted(&self, f: &mut dyn FnMut(&MergedEntry) -> Result<()>) -> Result<()> {
        for (read_id, call) in &self.entries {
            f(&call.to_entry(read_id))?;
        }
        Ok(())
    }
}

const CREATE_MERGED: &str = "CREATE TABLE merged(
    classified TEXT NOT NULL,
    readname TEXT PRIMARY KEY,
    taxid INTEGER NOT NULL,
    source TEXT NOT NULL
)";
const REPLACE_MERGED: &str = "INSERT OR REPLACE INTO merged VALUES (?1, ?2, ?3, ?4)";
const FILL_UNCLASSIFIED: &str = "INSERT INTO merged VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(readname) DO UPDATE SET
        classified = excluded.classified,
        taxid = excluded.taxid,
        source = excluded.source
    WHERE merged.classified = 'U'";

/// On-disk store in an SQLite file, for inputs too large to merge in memory.
///
/// Each batch is written in its own transaction. Journaling and syncing are
/// relaxed since the table is rebuilt from scratch on every run.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // journal_mode returns a row, so it can't go through execute_batch
        let _mode: String = conn.query_row("PRAGMA journal_mode = MEMORY", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous = OFF;")?;
        conn.execute_batch("DROP TABLE IF EXISTS merged;")?;
        conn.execute_batch(CREATE_MERGED)?;
        Ok(Self { conn })
    }

    fn write_batch<I>(&mut self, sql: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = MergedEntry>,
    {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for entry in entries {
                stmt.execute(params![
                    flag_str(entry.classification),
                    entry.read_id,
                    entry.tax_id,
                    entry.source.name()
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn flag_str(classification: Classification) -> &'static str {
    match classification {
        Classification::Classified => "C",
        Classification::Unclassified => "U",
    }
}

fn conversion_error(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value '{value}' in merged table").into(),
    )
}

fn classification_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Classification> {
    let flag: String = row.get(idx)?;
    Classification::from_flag(&flag).ok_or_else(|| conversion_error(idx, &flag))
}

fn source_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Source> {
    let name: String = row.get(idx)?;
    name.parse::<Source>().map_err(|name| conversion_error(idx, &name))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<MergedEntry> {
    Ok(MergedEntry::new(
        classification_column(row, 0)?,
        row.get(1)?,
        row.get(2)?,
        source_column(row, 3)?,
    ))
}

impl MergeStore for SqliteStore {
    fn insert_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()> {
        self.write_batch(REPLACE_MERGED, batch)
    }

    fn overwrite_unclassified_batch(&mut self, batch: Vec<MergedEntry>) -> Result<()> {
        let classified = batch.into_iter().filter(|e| e.classification.is_classified());
        self.write_batch(FILL_UNCLASSIFIED, classified)
    }

    fn len(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(readname) FROM merged", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn get(&self, read_id: &str) -> Result<Option<MergedEntry>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT classified, readname, taxid, source FROM merged WHERE readname = ?1")?;
        let mut rows = stmt.query(params![read_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_entry(row)?)),
            None => Ok(None),
        }
    }

    fn grouped_counts(&self) -> Result<GroupedCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, classified, COUNT(*) FROM merged GROUP BY source, classified")?;
        let mut rows = stmt.query([])?;

        let mut counts = GroupedCounts::new();
        while let Some(row) = rows.next()? {
            let source = source_column(row, 0)?;
            let classification = classification_column(row, 1)?;
            let n: i64 = row.get(2)?;
            counts.insert((source, classification), n as u64);
        }
        Ok(counts)
    }

    fn for_each_sorted(&self, f: &mut dyn FnMut(&MergedEntry) -> Result<()>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT classified, readname, taxid, source FROM merged ORDER BY readname")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entry = row_to_entry(row)?;
            f(&entry)?;
        }
        Ok(())
    }
}
