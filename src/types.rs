//src/types.rs

use std::fmt;
use std::str::FromStr;

/// One of the three classifiers whose output can be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Kaiju,
    Kraken,
    Clarks,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Kaiju, Source::Kraken, Source::Clarks];

    /// Name used in merge orders and in the on-disk store.
    pub fn name(&self) -> &'static str {
        match self {
            Source::Kaiju => "kaiju",
            Source::Kraken => "kraken",
            Source::Clarks => "clarks",
        }
    }

    /// Human readable label for the summary.
    pub fn label(&self) -> &'static str {
        match self {
            Source::Kaiju => "Kaiju",
            Source::Kraken => "Kraken",
            Source::Clarks => "CLARK-S",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kaiju" => Ok(Source::Kaiju),
            "kraken" => Ok(Source::Kraken),
            "clarks" => Ok(Source::Clarks),
            other => Err(other.to_string()),
        }
    }
}

/// Whether a classifier assigned any taxon to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Classified,
    Unclassified,
}

impl Classification {
    /// The one-letter flag used by Kaiju and Kraken ('C' or 'U').
    pub fn flag(&self) -> char {
        match self {
            Classification::Classified => 'C',
            Classification::Unclassified => 'U',
        }
    }

    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "C" => Some(Classification::Classified),
            "U" => Some(Classification::Unclassified),
            _ => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Classification::Classified)
    }
}

/// One classification call for one read, as streamed from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    pub classification: Classification,
    pub read_id: String,
    pub tax_id: u32, // 0 when unclassified
    pub source: Source,
}

impl ClassificationRecord {
    pub fn new(classification: Classification, read_id: String, tax_id: u32, source: Source) -> Self {
        Self {
            classification,
            read_id,
            tax_id,
            source,
        }
    }
}

/// The surviving record for a read id once merging is done.
/// Entries are only ever replaced whole, never patched field by field.
pub type MergedEntry = ClassificationRecord;

/// Streaming tally of every row a source file contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceReadCounts {
    pub total: u64,
    pub classified: u64,
    pub unclassified: u64,
}

impl SourceReadCounts {
    pub fn record(&mut self, classification: Classification) {
        self.total += 1;
        match classification {
            Classification::Classified => self.classified += 1,
            Classification::Unclassified => self.unclassified += 1,
        }
    }

    /// `classified + unclassified == total`
    pub fn is_consistent(&self) -> bool {
        self.classified + self.unclassified == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_names_round_trip() {
        for source in Source::ALL {
            assert_eq!(source.name().parse::<Source>(), Ok(source));
        }
        assert_eq!("clark".parse::<Source>(), Err("clark".to_string()));
    }

    #[test]
    fn test_classification_flags() {
        assert_eq!(Classification::from_flag("C"), Some(Classification::Classified));
        assert_eq!(Classification::from_flag("U"), Some(Classification::Unclassified));
        assert_eq!(Classification::from_flag("c"), None);
        assert_eq!(Classification::Unclassified.flag(), 'U');
    }

    #[test]
    fn test_read_counts_stay_consistent() {
        let mut counts = SourceReadCounts::default();
        counts.record(Classification::Classified);
        counts.record(Classification::Unclassified);
        counts.record(Classification::Classified);

        assert_eq!(counts.total, 3);
        assert_eq!(counts.classified, 2);
        assert_eq!(counts.unclassified, 1);
        assert!(counts.is_consistent());
    }
}
