// ==============================================================================
// table.rs - Header-Driven Delimited Table Loader
// ==============================================================================
// Description: Reads tab/comma delimited text into named-column row sets
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-11
// Version: 1.1.0
// ==============================================================================
// Format: First non-empty row is the header; every data row must have the
// same number of fields as the header. Quoted fields are supported.
// Example (allele table):
//   "strain","alt"
//   "CS1","A"
//   "CS2","C"
// ==============================================================================

use csv::{ReaderBuilder, Trim};
use std::io::Read;
use thiserror::Error;

use crate::error::PipelineError;

/// Parsed table with header names and raw string cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub source_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Errors that can occur while loading a delimited table
#[derive(Error, Debug)]
pub enum TableParseError {
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing header row")]
    MissingHeader,

    #[error("Field count mismatch at line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Required column '{column}' not found (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("Table exceeds the row ceiling of {limit} rows")]
    TooManyRows { limit: usize },
}

impl TableParseError {
    /// Attach the input's name and lift into the pipeline taxonomy
    pub fn into_pipeline(self, source_name: &str) -> PipelineError {
        match self {
            TableParseError::TooManyRows { .. } => {
                PipelineError::rejected(format!("{}: {}", source_name, self))
            }
            other => PipelineError::malformed(source_name, other.to_string()),
        }
    }
}

/// Delimited table loader
#[derive(Debug, Clone)]
pub struct TableLoader {
    delimiter: u8,
    max_rows: Option<usize>,
}

impl TableLoader {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            max_rows: None,
        }
    }

    /// Tab-delimited loader (phenotype tables)
    pub fn tab() -> Self {
        Self::new(b'\t')
    }

    /// Comma-delimited loader with quoted fields (allele tables)
    pub fn comma() -> Self {
        Self::new(b',')
    }

    /// Reject tables with more than `max_rows` data rows
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Load a table from any byte stream
    ///
    /// # Arguments
    /// * `source_name` - Name used in error messages (usually the upload filename)
    /// * `reader` - Raw table bytes
    ///
    /// # Returns
    /// * `Ok(Table)` - Header plus data rows, cells trimmed of surrounding whitespace
    /// * `Err(TableParseError)` - Missing header, ragged row, CSV syntax error or row ceiling hit
    pub fn load<R: Read>(&self, source_name: &str, reader: R) -> Result<Table, TableParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(TableParseError::MissingHeader);
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.len() != headers.len() {
                return Err(TableParseError::FieldCount {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            if let Some(limit) = self.max_rows {
                if rows.len() >= limit {
                    return Err(TableParseError::TooManyRows { limit });
                }
            }

            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Table {
            source_name: source_name.to_string(),
            headers,
            rows,
        })
    }
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the first column matching any of `names`, in preference order
    pub fn require_any(&self, names: &[String]) -> Result<usize, TableParseError> {
        names
            .iter()
            .find_map(|name| self.column_index(name))
            .ok_or_else(|| TableParseError::MissingColumn {
                column: names.join("' or '"),
                available: self.headers.join(", "),
            })
    }

    pub fn require(&self, name: &str) -> Result<usize, TableParseError> {
        self.require_any(&[name.to_string()])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
