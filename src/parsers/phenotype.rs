// ==============================================================================
// phenotype.rs - Phenotype Table Parser
// ==============================================================================
// Description: Parser for tab-delimited phenotype measurement tables
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-09
// Version: 1.0.0
// ==============================================================================
// Format: Tab-delimited text with header row
// Example:
//   Accession_ID    treatment    Ave_RLN
//   CS76778    Mock    14.2
//   CS76778    ABA    6.1
// ==============================================================================

use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{PhenotypeRecord, Treatment};
use crate::parsers::table::{Table, TableLoader};

/// Parser for phenotype tables
#[derive(Debug, Clone)]
pub struct PhenotypeParser {
    /// Column holding the accession identifier
    pub accession_column: String,
    /// Column holding the treatment category
    pub treatment_column: String,
    /// Numeric column that must be present; values are parsed when plotted
    pub trait_column: String,
    /// Row ceiling, if any
    pub max_rows: Option<usize>,
}

impl Default for PhenotypeParser {
    fn default() -> Self {
        Self::new("Accession_ID")
    }
}

impl PhenotypeParser {
    pub fn new(accession_column: impl Into<String>) -> Self {
        Self {
            accession_column: accession_column.into(),
            treatment_column: "treatment".to_string(),
            trait_column: "Ave_RLN".to_string(),
            max_rows: None,
        }
    }

    pub fn with_trait_column(mut self, trait_column: impl Into<String>) -> Self {
        self.trait_column = trait_column.into();
        self
    }

    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Parse a phenotype table from a byte stream
    ///
    /// Fails with `MalformedInput` when the header or a required column is
    /// missing, and with `UnknownCategory` when a treatment value is outside
    /// the fixed Mock/ABA ordering.
    pub fn parse<R: Read>(&self, source_name: &str, reader: R) -> Result<Vec<PhenotypeRecord>> {
        let table = TableLoader::tab()
            .with_max_rows(self.max_rows)
            .load(source_name, reader)
            .map_err(|e| e.into_pipeline(source_name))?;

        self.records_from_table(&table)
    }

    fn records_from_table(&self, table: &Table) -> Result<Vec<PhenotypeRecord>> {
        let accession_idx = table
            .require(&self.accession_column)
            .map_err(|e| e.into_pipeline(&table.source_name))?;
        let treatment_idx = table
            .require(&self.treatment_column)
            .map_err(|e| e.into_pipeline(&table.source_name))?;
        table
            .require(&self.trait_column)
            .map_err(|e| e.into_pipeline(&table.source_name))?;

        let mut records = Vec::with_capacity(table.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let accession_id = row[accession_idx].clone();
            if accession_id.is_empty() {
                return Err(PipelineError::malformed(
                    &table.source_name,
                    format!("Empty accession identifier in data row {}", row_idx + 1),
                ));
            }

            let treatment: Treatment = row[treatment_idx].parse()?;

            let fields: BTreeMap<String, String> = table
                .headers
                .iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(idx, _)| *idx != accession_idx && *idx != treatment_idx)
                .map(|(_, (header, value))| (header.clone(), value.clone()))
                .collect();

            records.push(PhenotypeRecord {
                accession_id,
                treatment,
                fields,
            });
        }

        debug!(
            "Parsed {} phenotype records from {}",
            records.len(),
            table.source_name
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_phenotype() {
        let contents = "\
Accession_ID\ttreatment\tAve_RLN\tLength
CS1\tMock\t14.2\t3
CS1\tABA\t6.1\t2
CS2\tMock\t12.0\t4
";
        let records = PhenotypeParser::default()
            .parse("pheno.txt", contents.as_bytes())
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].accession_id, "CS1");
        assert_eq!(records[0].treatment, Treatment::Mock);
        assert_eq!(records[1].treatment, Treatment::Aba);
        assert_eq!(records[1].trait_value("Ave_RLN"), Some(6.1));
        assert_eq!(records[2].fields.get("Length").map(String::as_str), Some("4"));
        assert!(!records[0].fields.contains_key("Accession_ID"));
    }

    #[test]
    fn test_unknown_treatment_fails() {
        let contents = "Accession_ID\ttreatment\tAve_RLN\nCS1\tHeat\t1.0\n";
        let err = PhenotypeParser::default()
            .parse("pheno.txt", contents.as_bytes())
            .unwrap_err();

        match err {
            PipelineError::UnknownCategory { value } => assert_eq!(value, "Heat"),
            other => panic!("Expected UnknownCategory, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_accession_column() {
        let contents = "strain\ttreatment\tAve_RLN\nCS1\tMock\t1.0\n";
        let err = PhenotypeParser::default()
            .parse("pheno.txt", contents.as_bytes())
            .unwrap_err();

        match err {
            PipelineError::MalformedInput {
                source_name,
                message,
            } => {
                assert_eq!(source_name, "pheno.txt");
                assert!(message.contains("Accession_ID"));
            }
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_trait_column() {
        let contents = "Accession_ID\ttreatment\tLength\nCS1\tMock\t3\n";
        let err = PhenotypeParser::default()
            .parse("pheno.txt", contents.as_bytes())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
        assert!(err.to_string().contains("Ave_RLN"));

        // A configured column replaces the default requirement
        let records = PhenotypeParser::default()
            .with_trait_column("Length")
            .parse("pheno.txt", contents.as_bytes())
            .unwrap();
        assert_eq!(records[0].trait_value("Length"), Some(3.0));
    }

    #[test]
    fn test_non_numeric_trait_is_kept_raw() {
        let contents = "Accession_ID\ttreatment\tAve_RLN\nCS1\tMock\tNA\n";
        let records = PhenotypeParser::default()
            .parse("pheno.txt", contents.as_bytes())
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trait_value("Ave_RLN"), None);
    }
}
