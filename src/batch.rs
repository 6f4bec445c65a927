// ==============================================================================
// batch.rs - Batch Plot Runner
// ==============================================================================
// Description: One phenotype table x many allele tables -> one ZIP bundle
// Author: Matt Barham
// Created: 2026-10-08
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::{write::SimpleFileOptions, ZipWriter};

use crate::classifier::ClassCounts;
use crate::error::{PipelineError, Result};
use crate::merger::MergeStats;
use crate::processor::{PhenotypeSet, PlotPipeline};
use crate::validator::UploadedTable;
use crate::workspace::{remove_tree, RequestWorkspace};

/// One allele table that made it into the bundle
#[derive(Debug, Clone, Serialize)]
pub struct BundleEntry {
    /// Client-supplied name of the allele table
    pub source: String,
    /// Sub-bundle directory inside the archive
    pub stem: String,
    pub sha256: String,
    /// Archive paths of the written figures, e.g. `snp1/violin_plot.png`
    pub artifacts: Vec<String>,
    /// Figure titles, in the same order as `artifacts`
    pub titles: Vec<String>,
    pub counts: ClassCounts,
    pub merge: MergeStats,
}

/// One allele table that did not
#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub source: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub archive: PathBuf,
    pub entries: Vec<BundleEntry>,
    pub failed: Vec<FailedItem>,
}

pub struct BatchRunner<'a> {
    pipeline: &'a PlotPipeline,
}

impl<'a> BatchRunner<'a> {
    pub fn new(pipeline: &'a PlotPipeline) -> Self {
        Self { pipeline }
    }

    /// Render both chart families for every allele table and package them.
    ///
    /// Failures reading the phenotype table abort the run. A failing allele
    /// table is recorded in the report and the run continues with the next.
    pub fn run(
        &self,
        phenotype: Option<&UploadedTable>,
        alleles: &[UploadedTable],
        workspace: &RequestWorkspace,
    ) -> Result<BatchReport> {
        let config = self.pipeline.config();
        info!(
            "Starting batch {} with {} allele files",
            workspace.id(),
            alleles.len()
        );

        // 1. Inputs
        let phenotype = phenotype.ok_or_else(|| {
            PipelineError::missing_input("Both files are required")
        })?;
        if alleles.is_empty() {
            return Err(PipelineError::missing_input(
                "At least one allele file is required",
            ));
        }

        // 2. Phenotype table (shared by every item)
        let phenotypes = self.pipeline.load_phenotypes(phenotype)?;

        // 3. Per allele table
        let staging = workspace.subdir(&config.bundle_name)?;
        let mut used_stems = HashSet::new();
        let mut entries = Vec::new();
        let mut failed = Vec::new();

        for upload in alleles {
            match self.process_item(&phenotypes, upload, &staging, &used_stems) {
                Ok(entry) => {
                    used_stems.insert(entry.stem.clone());
                    entries.push(entry);
                }
                Err(e) => {
                    warn!("Skipping {} ({}): {}", upload.name, e.kind(), e);
                    failed.push(FailedItem {
                        source: upload.name.clone(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if entries.is_empty() {
            warn!("No allele file produced figures; the bundle will be empty");
        }

        // 4. Archive
        let archive = workspace
            .root()
            .join(format!("{}.zip", config.bundle_name));
        let file_count = write_archive(&staging, &archive)?;

        if !config.keep_staging {
            remove_tree(&staging)?;
        }

        info!(
            "Batch {} complete: {} bundles, {} failed, {} files in {:?}",
            workspace.id(),
            entries.len(),
            failed.len(),
            file_count,
            archive
        );

        Ok(BatchReport {
            request_id: workspace.id(),
            created_at: Utc::now(),
            archive,
            entries,
            failed,
        })
    }

    fn process_item(
        &self,
        phenotypes: &PhenotypeSet,
        upload: &UploadedTable,
        staging: &Path,
        used_stems: &HashSet<String>,
    ) -> Result<BundleEntry> {
        let table = self.pipeline.classify_alleles(phenotypes, upload)?;

        let stem = unique_stem(&table.input.stem, used_stems);
        let out_dir = staging.join(&stem);
        std::fs::create_dir_all(&out_dir).map_err(|e| PipelineError::io(&out_dir, e))?;

        let figures = match self
            .pipeline
            .composer()
            .compose_all(&table.records, &stem, &out_dir)
        {
            Ok(figures) => figures,
            Err(e) => {
                // No half-written sub-bundle may reach the archive
                remove_tree(&out_dir)?;
                return Err(e);
            }
        };

        let artifacts = figures
            .iter()
            .filter_map(|f| f.path.file_name())
            .map(|name| format!("{}/{}", stem, name.to_string_lossy()))
            .collect();
        let titles = figures.into_iter().map(|f| f.title).collect();

        Ok(BundleEntry {
            source: upload.name.clone(),
            stem,
            sha256: table.input.hash_sha256,
            artifacts,
            titles,
            counts: table.counts,
            merge: table.merge,
        })
    }
}

/// `base`, or `base_2`, `base_3`, ... when already taken
fn unique_stem(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Pack `source_dir` into a ZIP at `archive_path`.
///
/// The archive is written to a temporary file next to the destination and
/// renamed into place once complete, so a failed run leaves no archive.
/// Uses STORE method since PNG/JPEG data is already compressed.
pub fn write_archive(source_dir: &Path, archive_path: &Path) -> Result<usize> {
    info!("Creating ZIP archive: {:?}", archive_path);

    let parent = match archive_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let temp = tempfile::Builder::new()
        .prefix(".bundle-")
        .suffix(".zip.partial")
        .tempfile_in(parent)
        .map_err(|e| PipelineError::io(parent, e))?;

    let zip_error = |e: zip::result::ZipError| {
        PipelineError::io(archive_path, std::io::Error::other(e))
    };

    let mut zip = ZipWriter::new(temp.as_file());
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let mut file_count = 0;
    for entry in walkdir::WalkDir::new(source_dir)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PipelineError::io(source_dir, std::io::Error::from(e)))?;
        let path = entry.path();
        let name = archive_name(source_dir, path)?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(zip_error)?;
            continue;
        }

        debug!("Adding to ZIP: {}", name);
        zip.start_file(name, options).map_err(zip_error)?;
        let mut file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        std::io::copy(&mut file, &mut zip).map_err(|e| PipelineError::io(path, e))?;
        file_count += 1;
    }

    zip.finish().map_err(zip_error)?;
    temp.as_file()
        .sync_all()
        .map_err(|e| PipelineError::io(temp.path(), e))?;
    temp.persist(archive_path)
        .map_err(|e| PipelineError::io(archive_path, e.error))?;

    info!("ZIP archive created successfully with {} files", file_count);
    Ok(file_count)
}

/// Archive entry name: relative to `root`, `/`-separated
fn archive_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        PipelineError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path outside bundle"),
        )
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_stem() {
        let mut used = HashSet::new();
        assert_eq!(unique_stem("snp1", &used), "snp1");

        used.insert("snp1".to_string());
        assert_eq!(unique_stem("snp1", &used), "snp1_2");

        used.insert("snp1_2".to_string());
        assert_eq!(unique_stem("snp1", &used), "snp1_3");
    }

    #[test]
    fn test_write_archive_layout() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("output_results");
        std::fs::create_dir_all(staging.join("snp1")).unwrap();
        std::fs::create_dir_all(staging.join("snp2")).unwrap();
        std::fs::write(staging.join("snp1/violin_plot.png"), b"a").unwrap();
        std::fs::write(staging.join("snp2/violin_plot.png"), b"b").unwrap();

        let archive_path = dir.path().join("output_results.zip");
        assert_eq!(write_archive(&staging, &archive_path).unwrap(), 2);

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "snp1/",
                "snp1/violin_plot.png",
                "snp2/",
                "snp2/violin_plot.png"
            ]
        );
        assert_eq!(archive.by_name("snp2/violin_plot.png").unwrap().size(), 1);

        // Only the final archive is left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_archive_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("output_results.zip");

        let result = write_archive(&dir.path().join("missing"), &archive_path);

        assert!(result.is_err());
        assert!(!archive_path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
