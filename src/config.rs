// ==============================================================================
// config.rs - Pipeline Configuration
// ==============================================================================
// Description: Run options (columns, policies, style, limits) with defaults
// Author: Matt Barham
// Created: 2026-10-04
// Modified: 2026-10-14
// Version: 1.1.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::classifier::AlleleClassifier;
use crate::error::{PipelineError, Result};
use crate::merger::AccessionMerger;
use crate::models::{ClassificationPolicy, DuplicatePolicy};
use crate::parsers::{AlleleParser, PhenotypeParser};
use crate::plot::{PlotComposer, PlotStyle};
use crate::validator::{InputLimits, InputValidator};

/// Everything a run needs besides its inputs.
///
/// Read-only once a pipeline is built; every field has a default so a JSON
/// file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub classification: ClassificationPolicy,
    pub duplicate_policy: DuplicatePolicy,
    /// Numeric phenotype column plotted on the value axis
    pub trait_column: String,
    /// Accession column of the phenotype table
    pub accession_column: String,
    /// Accepted accession column names of allele tables, in preference order
    pub allele_key_columns: Vec<String>,
    pub allele_value_column: String,
    pub style: PlotStyle,
    pub limits: InputLimits,
    /// Archive file stem written by a batch run
    pub bundle_name: String,
    /// Keep the unpacked per-file directories next to the archive
    pub keep_staging: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classification: ClassificationPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            trait_column: "Ave_RLN".to_string(),
            accession_column: "Accession_ID".to_string(),
            allele_key_columns: vec!["strain".to_string(), "Accession_ID".to_string()],
            allele_value_column: "alt".to_string(),
            style: PlotStyle::default(),
            limits: InputLimits::default(),
            bundle_name: "output_results".to_string(),
            keep_staging: false,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&text).map_err(|e| {
            PipelineError::config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("trait_column", &self.trait_column),
            ("accession_column", &self.accession_column),
            ("allele_value_column", &self.allele_value_column),
            ("bundle_name", &self.bundle_name),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::config(format!("{} must not be empty", name)));
            }
        }

        if self.allele_key_columns.is_empty()
            || self.allele_key_columns.iter().any(|c| c.trim().is_empty())
        {
            return Err(PipelineError::config(
                "allele_key_columns must list at least one non-empty column",
            ));
        }

        if let ClassificationPolicy::FixedBaseline { minor_allele } = &self.classification {
            if minor_allele.trim().is_empty() {
                return Err(PipelineError::config("minor_allele must not be empty"));
            }
        }

        if self
            .bundle_name
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        {
            return Err(PipelineError::config(format!(
                "bundle_name '{}' may only contain letters, digits, '_' and '-'",
                self.bundle_name
            )));
        }

        if self.limits.max_bytes == 0 {
            return Err(PipelineError::config("limits.max_bytes must be positive"));
        }

        self.style.validate()
    }

    pub fn phenotype_parser(&self) -> PhenotypeParser {
        PhenotypeParser::new(self.accession_column.clone())
            .with_trait_column(self.trait_column.clone())
            .with_max_rows(self.limits.max_rows)
    }

    pub fn allele_parser(&self) -> AlleleParser {
        AlleleParser::new(
            self.allele_key_columns.clone(),
            self.allele_value_column.clone(),
        )
        .with_max_rows(self.limits.max_rows)
    }

    pub fn merger(&self) -> AccessionMerger {
        AccessionMerger::new(self.duplicate_policy)
    }

    pub fn classifier(&self) -> AlleleClassifier {
        AlleleClassifier::new(self.classification.clone())
    }

    pub fn composer(&self) -> Result<PlotComposer> {
        PlotComposer::new(self.style.clone(), self.trait_column.clone())
    }

    pub fn validator(&self) -> InputValidator {
        InputValidator::new(self.limits)
    }
}
