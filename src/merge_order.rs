//src/merge_order.rs

use std::path::{Path, PathBuf};

use crate::error::{MergeError, Result};
use crate::types::Source;

pub const DEFAULT_MERGE_ORDER: &str = "clarks,kraken,kaiju";
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Paths to the classifier outputs. Any of them may be left out
/// as long as the merge order does not name that source.
#[derive(Debug, Clone, Default)]
pub struct InputPaths {
    pub kaiju: Option<PathBuf>,
    pub kraken: Option<PathBuf>,
    pub clarks: Option<PathBuf>,
}

impl InputPaths {
    pub fn get(&self, source: Source) -> Option<&PathBuf> {
        match source {
            Source::Kaiju => self.kaiju.as_ref(),
            Source::Kraken => self.kraken.as_ref(),
            Source::Clarks => self.clarks.as_ref(),
        }
    }
}

/// A validated input: which parser to use, and on which file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    Kaiju(PathBuf),
    Kraken(PathBuf),
    Clarks(PathBuf),
}

impl SourceInput {
    pub fn new(source: Source, path: PathBuf) -> Self {
        match source {
            Source::Kaiju => SourceInput::Kaiju(path),
            Source::Kraken => SourceInput::Kraken(path),
            Source::Clarks => SourceInput::Clarks(path),
        }
    }

    pub fn source(&self) -> Source {
        match self {
            SourceInput::Kaiju(_) => Source::Kaiju,
            SourceInput::Kraken(_) => Source::Kraken,
            SourceInput::Clarks(_) => Source::Clarks,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SourceInput::Kaiju(p) | SourceInput::Kraken(p) | SourceInput::Clarks(p) => p,
        }
    }
}

/// Parse a comma-separated merge order such as `kraken,kaiju,clarks`.
/// Index 0 of the result has the highest priority.
pub fn parse_merge_order(order: &str) -> Result<Vec<Source>> {
    let mut sources: Vec<Source> = Vec::with_capacity(3);

    for token in order.split(',').map(str::trim) {
        if token.is_empty() && order.trim().is_empty() {
            return Err(MergeError::EmptyMergeOrder);
        }
        let source = token.parse::<Source>().map_err(|name| MergeError::InvalidSource {
            name,
            order: order.to_string(),
        })?;
        if sources.contains(&source) {
            return Err(MergeError::DuplicateSource(source));
        }
        sources.push(source);
    }

    Ok(sources)
}

/// Everything a merge run needs, as supplied by the caller.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub merge_order: String,
    pub inputs: InputPaths,
    /// Records per bulk write into the merge store.
    pub chunk_size: usize,
    /// Keep the merge store in an SQLite file instead of memory.
    pub dbfile: Option<PathBuf>,
    /// Retain per-source read id sets for the pairwise overlap report.
    pub track_overlaps: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            merge_order: DEFAULT_MERGE_ORDER.to_string(),
            inputs: InputPaths::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            dbfile: None,
            track_overlaps: false,
        }
    }
}

/// A merge order resolved against the available inputs.
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub inputs: Vec<SourceInput>,
    pub chunk_size: usize,
}

impl MergePlan {
    pub fn sources(&self) -> Vec<Source> {
        self.inputs.iter().map(SourceInput::source).collect()
    }

    pub fn order_string(&self) -> String {
        self.sources()
            .iter()
            .map(Source::name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl MergeConfig {
    /// Validate the configuration. Input files must exist, but nothing is opened or read here.
    pub fn plan(&self) -> Result<MergePlan> {
        if self.chunk_size == 0 {
            return Err(MergeError::InvalidChunkSize);
        }

        let order = parse_merge_order(&self.merge_order)?;
        let mut inputs = Vec::with_capacity(order.len());
        for source in &order {
            let path = self
                .inputs
                .get(*source)
                .ok_or(MergeError::MissingInput(*source))?;
            if !path.is_file() {
                return Err(MergeError::InputNotFound {
                    source_name: *source,
                    path: path.clone(),
                });
            }
            inputs.push(SourceInput::new(*source, path.clone()));
        }

        for source in Source::ALL {
            if !order.contains(&source) {
                if let Some(path) = self.inputs.get(source) {
                    log::warn!(
                        "{} input {} is not in the merge order and will be ignored",
                        source.label(),
                        path.display()
                    );
                }
            }
        }

        Ok(MergePlan {
            inputs,
            chunk_size: self.chunk_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "").unwrap();
        path
    }

    fn all_inputs(dir: &TempDir) -> InputPaths {
        InputPaths {
            kaiju: Some(touch(dir, "kaiju.tab")),
            kraken: Some(touch(dir, "kraken.tab")),
            clarks: Some(touch(dir, "clarks.csv")),
        }
    }

    #[test]
    fn test_parse_full_order() {
        let order = parse_merge_order("kraken,kaiju,clarks").unwrap();
        assert_eq!(order, vec![Source::Kraken, Source::Kaiju, Source::Clarks]);
    }

    #[test]
    fn test_parse_partial_order_with_spaces() {
        let order = parse_merge_order(" kraken , kaiju ").unwrap();
        assert_eq!(order, vec![Source::Kraken, Source::Kaiju]);
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = parse_merge_order("kaiju,kaiju,kraken").unwrap_err();
        assert!(matches!(err, MergeError::DuplicateSource(Source::Kaiju)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_rejects_unknown_and_empty_tokens() {
        let err = parse_merge_order("kaiju,clark").unwrap_err();
        match err {
            MergeError::InvalidSource { name, order } => {
                assert_eq!(name, "clark");
                assert_eq!(order, "kaiju,clark");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            parse_merge_order("kaiju,,kraken"),
            Err(MergeError::InvalidSource { .. })
        ));
        assert!(matches!(parse_merge_order(""), Err(MergeError::EmptyMergeOrder)));
        assert!(matches!(parse_merge_order("  "), Err(MergeError::EmptyMergeOrder)));
    }

    #[test]
    fn test_plan_uses_merge_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = MergeConfig {
            merge_order: "kaiju,clarks,kraken".to_string(),
            inputs: all_inputs(&dir),
            ..Default::default()
        };
        let plan = config.plan().unwrap();
        assert_eq!(plan.sources(), vec![Source::Kaiju, Source::Clarks, Source::Kraken]);
        assert_eq!(plan.inputs[1], SourceInput::Clarks(dir.path().join("clarks.csv")));
        assert_eq!(plan.order_string(), "kaiju,clarks,kraken");
        assert_eq!(plan.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_plan_requires_inputs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = MergeConfig {
            merge_order: "kraken,kaiju".to_string(),
            inputs: InputPaths {
                kraken: Some(touch(&dir, "kraken.tab")),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.plan(), Err(MergeError::MissingInput(Source::Kaiju))));
    }

    #[test]
    fn test_plan_rejects_nonexistent_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = MergeConfig {
            merge_order: "kraken,kaiju".to_string(),
            inputs: InputPaths {
                kraken: Some(touch(&dir, "kraken.tab")),
                kaiju: Some(dir.path().join("typo.out")),
                clarks: None,
            },
            ..Default::default()
        };
        let err = config.plan().unwrap_err();
        match &err {
            MergeError::InputNotFound { source_name, path } => {
                assert_eq!(*source_name, Source::Kaiju);
                assert_eq!(path, &dir.path().join("typo.out"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_config_error());

        // a directory is not an input file either
        let config = MergeConfig {
            merge_order: "kraken".to_string(),
            inputs: InputPaths {
                kraken: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.plan(), Err(MergeError::InputNotFound { .. })));
    }

    #[test]
    fn test_plan_rejects_zero_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = MergeConfig {
            inputs: all_inputs(&dir),
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.plan(), Err(MergeError::InvalidChunkSize)));
    }
}
