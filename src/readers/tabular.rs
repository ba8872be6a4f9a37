//src/readers/tabular.rs
//
// Kaiju and Kraken both write whitespace-separated lines:
//   <C|U> <read id> <taxon id> [anything else...]

use crate::types::{Classification, ClassificationRecord, Source};

/// Parse one Kaiju/Kraken line. Blank lines yield `Ok(None)`.
/// Any other deviation from the format is an error message for the caller to wrap.
pub fn parse_line(line: &str, source: Source) -> Result<Option<ClassificationRecord>, String> {
    let mut fields = line.split_whitespace();

    let flag = match fields.next() {
        Some(flag) => flag,
        None => return Ok(None),
    };
    let read_id = fields
        .next()
        .ok_or_else(|| "missing read id column".to_string())?;
    let tax_field = fields
        .next()
        .ok_or_else(|| format!("missing taxon id column for read {read_id}"))?;

    let classification = Classification::from_flag(flag)
        .ok_or_else(|| format!("invalid classification flag '{flag}' (expected C or U)"))?;
    let tax_id: u32 = tax_field
        .parse()
        .map_err(|e| format!("invalid taxon id '{tax_field}' for read {read_id}: {e}"))?;

    Ok(Some(ClassificationRecord::new(
        classification,
        read_id.to_string(),
        tax_id,
        source,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kraken_line_with_extra_columns() {
        let line = "C\tread1\t562\t150\t562:10 0:5";
        let record = parse_line(line, Source::Kraken).unwrap().unwrap();
        assert_eq!(record.classification, Classification::Classified);
        assert_eq!(record.read_id, "read1");
        assert_eq!(record.tax_id, 562);
        assert_eq!(record.source, Source::Kraken);
    }

    #[test]
    fn test_parse_unclassified_kaiju_line() {
        let record = parse_line("U read7 0", Source::Kaiju).unwrap().unwrap();
        assert_eq!(record.classification, Classification::Unclassified);
        assert_eq!(record.tax_id, 0);
        assert_eq!(record.source, Source::Kaiju);
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert_eq!(parse_line("", Source::Kaiju), Ok(None));
        assert_eq!(parse_line("   \t", Source::Kraken), Ok(None));
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        assert!(parse_line("C read1 abc", Source::Kraken).is_err());
        assert!(parse_line("C read1 -5", Source::Kraken).is_err());
        assert!(parse_line("C read1", Source::Kaiju).is_err());
        assert!(parse_line("X read1 5", Source::Kaiju).is_err());
    }
}
