//src/merge_stats.rs

use ahash::AHashSet;

use crate::merge_store::GroupedCounts;
use crate::readers::SourceTally;
use crate::types::{Classification, ClassificationRecord, Source, SourceReadCounts};

/// Read ids a source classified and left unclassified.
/// Only collected when the pairwise overlap report is requested.
#[derive(Debug, Clone, Default)]
pub struct ReadSets {
    pub classified: AHashSet<String>,
    pub unclassified: AHashSet<String>,
}

impl ReadSets {
    pub fn insert(&mut self, record: &ClassificationRecord) {
        let set = match record.classification {
            Classification::Classified => &mut self.classified,
            Classification::Unclassified => &mut self.unclassified,
        };
        set.insert(record.read_id.clone());
    }
}

/// `100 * part / whole`, or `None` when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(100.0 * part as f64 / whole as f64)
    }
}

fn with_pct(count: u64, whole: u64) -> String {
    match percentage(count, whole) {
        Some(pct) => format!("{count} ({pct:.2}%)"),
        None => count.to_string(),
    }
}

/// Agreement between two sources, computed from their read id sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOverlap {
    pub first: Source,
    pub second: Source,
    /// Reads classified by both sources.
    pub classified: u64,
    /// Reads left unclassified by either source.
    pub unclassified: u64,
    /// Total reads of `first`.
    pub expected_total: u64,
}

impl PairOverlap {
    pub fn is_congruent(&self) -> bool {
        self.classified + self.unclassified == self.expected_total
    }
}

/// Overlap of every unordered pair of sources that kept read sets,
/// pairs ordered by source name.
pub fn pairwise_overlaps(tallies: &[SourceTally]) -> Vec<PairOverlap> {
    // Within a pair, the source listed first in `Source::ALL` comes first.
    let tracked: Vec<(&SourceTally, &ReadSets)> = Source::ALL
        .iter()
        .filter_map(|&source| tallies.iter().find(|t| t.source == source))
        .filter_map(|t| t.read_sets.as_ref().map(|sets| (t, sets)))
        .collect();

    let mut pairs = Vec::new();
    for (i, &first) in tracked.iter().enumerate() {
        for &second in &tracked[i + 1..] {
            pairs.push((first, second));
        }
    }
    pairs.sort_by_key(|((a, _), (b, _))| (a.source.name(), b.source.name()));

    pairs
        .into_iter()
        .map(|((first, first_sets), (second, second_sets))| PairOverlap {
            first: first.source,
            second: second.source,
            classified: first_sets.classified.intersection(&second_sets.classified).count() as u64,
            unclassified: first_sets.unclassified.union(&second_sets.unclassified).count() as u64,
            expected_total: first.counts.total,
        })
        .collect()
}

/// Distinct read ids across all sources, if every source kept its read sets.
pub fn combined_unique_reads(tallies: &[SourceTally]) -> Option<u64> {
    let mut all: AHashSet<&str> = AHashSet::new();
    for tally in tallies {
        let sets = tally.read_sets.as_ref()?;
        all.extend(sets.classified.iter().map(String::as_str));
        all.extend(sets.unclassified.iter().map(String::as_str));
    }
    Some(all.len() as u64)
}

/// Where the surviving merged entries came from.
#[derive(Debug, Clone, Default)]
pub struct MergedBreakdown {
    counts: GroupedCounts,
}

impl MergedBreakdown {
    pub fn new(counts: GroupedCounts) -> Self {
        Self { counts }
    }

    pub fn count(&self, source: Source, classification: Classification) -> u64 {
        self.counts.get(&(source, classification)).copied().unwrap_or(0)
    }

    pub fn from_source(&self, source: Source) -> u64 {
        self.count(source, Classification::Classified) + self.count(source, Classification::Unclassified)
    }

    pub fn total_classified(&self) -> u64 {
        Source::ALL.iter().map(|&s| self.count(s, Classification::Classified)).sum()
    }

    pub fn total_unclassified(&self) -> u64 {
        Source::ALL.iter().map(|&s| self.count(s, Classification::Unclassified)).sum()
    }

    pub fn total(&self) -> u64 {
        self.total_classified() + self.total_unclassified()
    }
}

/// Everything reported once a merge run is complete.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    /// Per-source counts, in merge order.
    pub source_counts: Vec<(Source, SourceReadCounts)>,
    pub combined_unique: Option<u64>,
    pub merged: MergedBreakdown,
    pub overlaps: Vec<PairOverlap>,
}

impl SummaryReport {
    pub fn build(tallies: &[SourceTally], grouped: GroupedCounts) -> Self {
        Self {
            source_counts: tallies.iter().map(|t| (t.source, t.counts)).collect(),
            combined_unique: combined_unique_reads(tallies),
            merged: MergedBreakdown::new(grouped),
            overlaps: pairwise_overlaps(tallies),
        }
    }

    pub fn counts_for(&self, source: Source) -> Option<&SourceReadCounts> {
        self.source_counts
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, counts)| counts)
    }

    /// True when every source reported the same number of reads.
    pub fn totals_agree(&self) -> bool {
        self.source_counts
            .windows(2)
            .all(|w| w[0].1.total == w[1].1.total)
    }

    /// Summary as text lines, one per log message.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let label = |s: &Source| format!("{}:", s.label());

        lines.push("Reads per source:".to_string());
        for (source, counts) in &self.source_counts {
            lines.push(format!("  {:<9} {}", label(source), counts.total));
        }
        if let Some(unique) = self.combined_unique {
            lines.push(format!("  {:<9} {}", "Combined:", unique));
        }

        lines.push("Classified reads:".to_string());
        for (source, counts) in &self.source_counts {
            lines.push(format!("  {:<9} {}", label(source), with_pct(counts.classified, counts.total)));
        }
        lines.push("Unclassified reads:".to_string());
        for (source, counts) in &self.source_counts {
            lines.push(format!("  {:<9} {}", label(source), with_pct(counts.unclassified, counts.total)));
        }

        let merged_total = self.merged.total();
        lines.push(format!("Merged reads: {merged_total}"));
        for (source, _) in &self.source_counts {
            if self.merged.from_source(*source) == 0 {
                continue;
            }
            lines.push(format!(
                "  from {:<9} classified {}, unclassified {}",
                label(source),
                with_pct(self.merged.count(*source, Classification::Classified), merged_total),
                with_pct(self.merged.count(*source, Classification::Unclassified), merged_total),
            ));
        }
        if merged_total > 0 {
            lines.push(format!("Total classified:   {}", with_pct(self.merged.total_classified(), merged_total)));
            lines.push(format!("Total unclassified: {}", with_pct(self.merged.total_unclassified(), merged_total)));
        }

        if !self.overlaps.is_empty() {
            lines.push("Pairwise overlaps:".to_string());
            for pair in &self.overlaps {
                lines.push(format!(
                    "  {}/{}: classified by both {}, unclassified by either {}",
                    pair.first, pair.second, pair.classified, pair.unclassified
                ));
            }
        }
        lines
    }

    /// Log the summary at info level, and any incongruence found on the way.
    pub fn log(&self) {
        for line in self.lines() {
            log::info!("{}", line);
        }

        if !self.totals_agree() {
            let totals: Vec<String> = self
                .source_counts
                .iter()
                .map(|(s, c)| format!("{}={}", s, c.total))
                .collect();
            log::info!("Sources report different read totals: {}", totals.join(", "));
        }

        for pair in self.overlaps.iter().filter(|p| !p.is_congruent()) {
            log::warn!(
                "{} and {} are incongruent; C:{} and U:{} should sum to {}",
                pair.first,
                pair.second,
                pair.classified,
                pair.unclassified,
                pair.expected_total
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification::{Classified, Unclassified};

    fn tally(source: Source, calls: &[(Classification, &str)]) -> SourceTally {
        let mut counts = SourceReadCounts::default();
        let mut sets = ReadSets::default();
        for (c, id) in calls {
            counts.record(*c);
            sets.insert(&ClassificationRecord::new(*c, id.to_string(), 0, source));
        }
        SourceTally {
            source,
            counts,
            read_sets: Some(sets),
        }
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(1, 0), None);
        assert_eq!(percentage(1, 4), Some(25.0));
        assert_eq!(with_pct(0, 0), "0");
        assert_eq!(with_pct(1, 3), "1 (33.33%)");
    }

    #[test]
    fn test_pairwise_overlaps_order_and_counts() {
        let tallies = vec![
            tally(Source::Clarks, &[(Classified, "r1"), (Unclassified, "r2")]),
            tally(Source::Kraken, &[(Classified, "r1"), (Classified, "r2")]),
            tally(Source::Kaiju, &[(Classified, "r1"), (Unclassified, "r3")]),
        ];
        let overlaps = pairwise_overlaps(&tallies);
        let pairs: Vec<(Source, Source)> = overlaps.iter().map(|p| (p.first, p.second)).collect();
        assert_eq!(
            pairs,
            vec![
                (Source::Kaiju, Source::Clarks),
                (Source::Kaiju, Source::Kraken),
                (Source::Kraken, Source::Clarks),
            ]
        );

        let kaiju_clarks = &overlaps[0];
        assert_eq!(kaiju_clarks.classified, 1);
        assert_eq!(kaiju_clarks.unclassified, 2);
        assert_eq!(kaiju_clarks.expected_total, 2);
        assert!(!kaiju_clarks.is_congruent());

        let kaiju_kraken = &overlaps[1];
        assert_eq!(kaiju_kraken.classified, 1);
        assert_eq!(kaiju_kraken.unclassified, 1);
        assert!(kaiju_kraken.is_congruent());
    }

    #[test]
    fn test_overlaps_skip_untracked_sources() {
        let mut untracked = tally(Source::Kraken, &[(Classified, "r1")]);
        untracked.read_sets = None;
        let tallies = vec![tally(Source::Kaiju, &[(Classified, "r1")]), untracked];

        assert!(pairwise_overlaps(&tallies).is_empty());
        assert_eq!(combined_unique_reads(&tallies), None);
    }

    #[test]
    fn test_combined_unique_reads() {
        let tallies = vec![
            tally(Source::Kaiju, &[(Classified, "r1"), (Unclassified, "r2")]),
            tally(Source::Kraken, &[(Classified, "r2"), (Classified, "r3")]),
        ];
        assert_eq!(combined_unique_reads(&tallies), Some(3));
    }

    #[test]
    fn test_breakdown_totals() {
        let mut grouped = GroupedCounts::new();
        grouped.insert((Source::Kraken, Classified), 6);
        grouped.insert((Source::Kraken, Unclassified), 2);
        grouped.insert((Source::Kaiju, Classified), 2);
        let breakdown = MergedBreakdown::new(grouped);

        assert_eq!(breakdown.total(), 10);
        assert_eq!(breakdown.total_classified(), 8);
        assert_eq!(breakdown.from_source(Source::Clarks), 0);

        let classified_pct = percentage(breakdown.total_classified(), breakdown.total()).unwrap();
        let unclassified_pct = percentage(breakdown.total_unclassified(), breakdown.total()).unwrap();
        assert!((classified_pct + unclassified_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_lines_skip_empty_sources() {
        let tallies = vec![
            tally(Source::Kraken, &[(Unclassified, "r1")]),
            SourceTally {
                source: Source::Clarks,
                counts: SourceReadCounts::default(),
                read_sets: None,
            },
        ];
        let mut grouped = GroupedCounts::new();
        grouped.insert((Source::Kraken, Unclassified), 1);
        let report = SummaryReport::build(&tallies, grouped);
        let lines = report.lines();

        assert!(lines.contains(&"  CLARK-S:  0".to_string()));
        assert!(lines.contains(&"Merged reads: 1".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("  from Kraken:")));
        assert!(!lines.iter().any(|l| l.starts_with("  from CLARK-S:")));
        assert!(lines.contains(&"Total unclassified: 1 (100.00%)".to_string()));
        assert!(!report.totals_agree());
        assert_eq!(report.counts_for(Source::Kraken).unwrap().unclassified, 1);
        assert!(report.counts_for(Source::Kaiju).is_none());
    }

    #[test]
    fn test_empty_merge_has_no_totals() {
        let report = SummaryReport::build(&[], GroupedCounts::new());
        let lines = report.lines();
        assert!(lines.contains(&"Merged reads: 0".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Total classified")));
    }
}
