// ==============================================================================
// lib.rs - SNP Phenotype Plotter Library
// ==============================================================================
// Description: Library interface for phenotype/allele merging and plotting
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod merger;
pub mod models;
pub mod parsers;
pub mod plot;
pub mod processor;
pub mod validator;
pub mod workspace;

pub use batch::{BatchReport, BatchRunner};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use processor::{PlotPipeline, PlotRequest, RequestOutcome};
pub use validator::UploadedTable;
pub use workspace::RequestWorkspace;
