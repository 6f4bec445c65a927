// ==============================================================================
// processor.rs - Phenotype/Allele Plot Pipeline
// ==============================================================================
// Description: Validate, parse, join, classify and render one allele table
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-16
// Version: 2.0.0
// ==============================================================================

use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

use crate::classifier::{AlleleClassifier, ClassCounts};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::merger::{AccessionMerger, MergeStats};
use crate::models::{JoinedRecord, PhenotypeRecord};
use crate::parsers::{AlleleParser, PhenotypeParser};
use crate::plot::{ChartKind, PlotComposer};
use crate::validator::{InputValidator, UploadedTable, ValidatedTable};
use crate::workspace::RequestWorkspace;

/// One interactive request: a phenotype table and an allele table, either of
/// which may be absent when the caller forgot an upload.
#[derive(Debug, Clone, Default)]
pub struct PlotRequest {
    pub phenotype: Option<UploadedTable>,
    pub allele: Option<UploadedTable>,
}

impl PlotRequest {
    pub fn new(phenotype: Option<UploadedTable>, allele: Option<UploadedTable>) -> Self {
        Self { phenotype, allele }
    }

    fn inputs(&self) -> Result<(&UploadedTable, &UploadedTable)> {
        match (&self.phenotype, &self.allele) {
            (Some(phenotype), Some(allele)) => Ok((phenotype, allele)),
            _ => Err(PipelineError::missing_input("Both files are required")),
        }
    }
}

/// What the presentation boundary hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestOutcome {
    /// Map a pipeline result to a caller-facing outcome. Only the error's
    /// display text crosses this boundary.
    pub fn from_result(result: Result<PathBuf>) -> Self {
        match result {
            Ok(image) => Self {
                success: true,
                image: Some(image),
                error: None,
            },
            Err(e) => {
                error!("Request failed ({}): {}", e.kind(), e);
                Self {
                    success: false,
                    image: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Parsed phenotype table, shared by every allele table of a run
#[derive(Debug, Clone)]
pub struct PhenotypeSet {
    pub input: ValidatedTable,
    pub records: Vec<PhenotypeRecord>,
}

/// One allele table joined and classified against the phenotype set
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    pub input: ValidatedTable,
    pub records: Vec<JoinedRecord>,
    pub merge: MergeStats,
    pub counts: ClassCounts,
}

pub struct PlotPipeline {
    config: PipelineConfig,
    validator: InputValidator,
    phenotype_parser: PhenotypeParser,
    allele_parser: AlleleParser,
    merger: AccessionMerger,
    classifier: AlleleClassifier,
    composer: PlotComposer,
}

impl PlotPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: config.validator(),
            phenotype_parser: config.phenotype_parser(),
            allele_parser: config.allele_parser(),
            merger: config.merger(),
            classifier: config.classifier(),
            composer: config.composer()?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn composer(&self) -> &PlotComposer {
        &self.composer
    }

    /// Single request: render the violin figure into the request workspace
    pub fn run(&self, request: &PlotRequest, workspace: &RequestWorkspace) -> Result<PathBuf> {
        info!("Starting plot request {}", workspace.id());

        // 1. Both uploads must be present
        let (phenotype_upload, allele_upload) = request.inputs()?;

        // 2. Phenotype table
        let phenotypes = self.load_phenotypes(phenotype_upload)?;

        // 3. Allele table, joined and classified
        let table = self.classify_alleles(&phenotypes, allele_upload)?;

        // 4. Render
        let path = self
            .composer
            .artifact_path(workspace.root(), ChartKind::Violin);
        self.composer
            .compose(ChartKind::Violin, &table.records, &table.input.stem, &path)?;

        info!("Plot request {} complete: {:?}", workspace.id(), path);
        Ok(path)
    }

    pub fn load_phenotypes(&self, upload: &UploadedTable) -> Result<PhenotypeSet> {
        let input = self.validator.validate(upload)?;
        let records = self
            .phenotype_parser
            .parse(&input.original_name, upload.data.as_slice())?;

        info!(
            "Loaded {} phenotype rows from {}",
            records.len(),
            input.original_name
        );

        Ok(PhenotypeSet { input, records })
    }

    pub fn classify_alleles(
        &self,
        phenotypes: &PhenotypeSet,
        upload: &UploadedTable,
    ) -> Result<ClassifiedTable> {
        let input = self.validator.validate(upload)?;
        let alleles = self
            .allele_parser
            .parse(&input.original_name, upload.data.as_slice())?;

        info!(
            "Loaded {} allele rows from {}",
            alleles.len(),
            input.original_name
        );

        let (merged, merge) =
            self.merger
                .merge(&phenotypes.records, &alleles, &input.original_name)?;
        let records = self.classifier.classify(merged);
        let counts = ClassCounts::of(&records);

        Ok(ClassifiedTable {
            input,
            records,
            merge,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlleleClass;
    use crate::plot::PlotStyle;
    use tempfile::TempDir;

    const PHENOTYPES: &str = "Accession_ID\ttreatment\tAve_RLN\n\
        CS1\tMock\t40.5\n\
        CS1\tABA\t21.0\n\
        CS2\tMock\t52.0\n\
        CS2\tABA\t30.0\n\
        CS3\tMock\t47.0\n";

    const ALLELES: &str = "strain,alt\n\"CS1\",\"C\"\n\"CS2\",\"T\"\n";

    fn pipeline() -> PlotPipeline {
        let config = PipelineConfig {
            style: PlotStyle {
                width: 800,
                height: 400,
                ..PlotStyle::default()
            },
            ..PipelineConfig::default()
        };
        PlotPipeline::new(config).unwrap()
    }

    #[test]
    fn test_missing_upload_reports_both_files_required() {
        let base = TempDir::new().unwrap();
        let workspace = RequestWorkspace::create(base.path()).unwrap();
        let request = PlotRequest::new(Some(UploadedTable::new("pheno.txt", PHENOTYPES)), None);

        let outcome = RequestOutcome::from_result(pipeline().run(&request, &workspace));

        assert!(!outcome.success);
        assert_eq!(outcome.image, None);
        assert_eq!(outcome.error.as_deref(), Some("Both files are required"));
    }

    #[test]
    fn test_single_request_renders_violin() {
        let base = TempDir::new().unwrap();
        let workspace = RequestWorkspace::create(base.path()).unwrap();
        let request = PlotRequest::new(
            Some(UploadedTable::new("pheno.txt", PHENOTYPES)),
            Some(UploadedTable::new("snp1.csv", ALLELES)),
        );

        let outcome = RequestOutcome::from_result(pipeline().run(&request, &workspace));

        assert!(outcome.success, "{:?}", outcome.error);
        let image = outcome.image.unwrap();
        assert!(image.starts_with(workspace.root()));
        assert!(image.exists());
    }

    #[test]
    fn test_unmatched_accessions_are_major() {
        let pipeline = pipeline();
        let phenotypes = pipeline
            .load_phenotypes(&UploadedTable::new("pheno.txt", PHENOTYPES))
            .unwrap();
        let table = pipeline
            .classify_alleles(&phenotypes, &UploadedTable::new("snp1.csv", ALLELES))
            .unwrap();

        assert_eq!(table.records.len(), 5);
        assert_eq!(table.merge.unmatched, 1);
        assert_eq!(table.counts, ClassCounts { major: 3, minor: 2 });

        let cs3 = table
            .records
            .iter()
            .find(|r| r.accession_id() == "CS3")
            .unwrap();
        assert_eq!(cs3.allele_value, None);
        assert_eq!(cs3.allele_class, AlleleClass::Major);
    }

    #[test]
    fn test_unknown_treatment_fails_request() {
        let base = TempDir::new().unwrap();
        let workspace = RequestWorkspace::create(base.path()).unwrap();
        let request = PlotRequest::new(
            Some(UploadedTable::new(
                "pheno.txt",
                "Accession_ID\ttreatment\tAve_RLN\nCS1\tHeat\t40.0\n",
            )),
            Some(UploadedTable::new("snp1.csv", ALLELES)),
        );

        let err = pipeline().run(&request, &workspace).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCategory { .. }));
    }
}
