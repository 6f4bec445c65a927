// ==============================================================================
// allele.rs - SNP Allele Table Parser
// ==============================================================================
// Description: Parser for per-marker allele tables (one file per SNP)
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-09
// Version: 1.0.0
// ==============================================================================
// Format: Comma-delimited CSV with quoted fields and a header row
// Example:
//   "strain","chr","pos","alt"
//   "CS76778","1","12345","A"
//   "CS76779","1","12345","C"
// ==============================================================================

use std::io::Read;
use tracing::debug;

use crate::error::Result;
use crate::models::AlleleRecord;
use crate::parsers::table::TableLoader;

/// Parser for allele tables
#[derive(Debug, Clone)]
pub struct AlleleParser {
    /// Accepted names for the accession column, in preference order
    pub key_columns: Vec<String>,
    /// Column holding the allele value
    pub value_column: String,
    pub max_rows: Option<usize>,
}

impl Default for AlleleParser {
    fn default() -> Self {
        Self {
            key_columns: vec!["strain".to_string(), "Accession_ID".to_string()],
            value_column: "alt".to_string(),
            max_rows: None,
        }
    }
}

impl AlleleParser {
    pub fn new(key_columns: Vec<String>, value_column: impl Into<String>) -> Self {
        Self {
            key_columns,
            value_column: value_column.into(),
            max_rows: None,
        }
    }

    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Parse an allele table from a byte stream
    ///
    /// Rows keep input order, which the merger relies on for first-match
    /// resolution. Empty allele cells become `None`. Rows with an empty
    /// accession identifier cannot join anything and are skipped.
    pub fn parse<R: Read>(&self, source_name: &str, reader: R) -> Result<Vec<AlleleRecord>> {
        let table = TableLoader::comma()
            .with_max_rows(self.max_rows)
            .load(source_name, reader)
            .map_err(|e| e.into_pipeline(source_name))?;

        let key_idx = table
            .require_any(&self.key_columns)
            .map_err(|e| e.into_pipeline(source_name))?;
        let value_idx = table
            .require(&self.value_column)
            .map_err(|e| e.into_pipeline(source_name))?;

        let mut skipped = 0usize;
        let records: Vec<AlleleRecord> = table
            .rows
            .iter()
            .filter_map(|row| {
                let accession_id = row[key_idx].clone();
                if accession_id.is_empty() {
                    skipped += 1;
                    return None;
                }
                let value = row[value_idx].clone();
                Some(AlleleRecord {
                    accession_id,
                    allele_value: if value.is_empty() { None } else { Some(value) },
                })
            })
            .collect();

        debug!(
            "Parsed {} allele records from {} ({} rows without accession skipped)",
            records.len(),
            source_name,
            skipped
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_parse_strain_alias() {
        let contents = "\"strain\",\"alt\"\n\"CS1\",\"A\"\n\"CS2\",\"C\"\n\"CS3\",\"\"\n";
        let records = AlleleParser::default()
            .parse("snp1.csv", contents.as_bytes())
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].accession_id, "CS1");
        assert_eq!(records[1].allele_value.as_deref(), Some("C"));
        assert_eq!(records[2].allele_value, None);
    }

    #[test]
    fn test_parse_accession_id_header() {
        let contents = "Accession_ID,alt\nCS1,T\n";
        let records = AlleleParser::default()
            .parse("snp1.csv", contents.as_bytes())
            .unwrap();

        assert_eq!(records[0].accession_id, "CS1");
        assert_eq!(records[0].allele_value.as_deref(), Some("T"));
    }

    #[test]
    fn test_headerless_file_is_malformed() {
        // First data row is taken as the header, so no accession column exists
        let contents = "CS1,A\nCS2,C\n";
        let err = AlleleParser::default()
            .parse("broken.csv", contents.as_bytes())
            .unwrap_err();

        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn test_missing_value_column() {
        let contents = "strain,ref\nCS1,A\n";
        let err = AlleleParser::default()
            .parse("snp1.csv", contents.as_bytes())
            .unwrap_err();

        assert!(err.to_string().contains("'alt'"));
    }
}
