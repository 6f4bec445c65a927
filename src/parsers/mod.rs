// ==============================================================================
// parsers/mod.rs - Table parser modules
// ==============================================================================
// Description: Parsers for phenotype and SNP allele tables
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-09
// Version: 1.1.0
// ==============================================================================

pub mod table;
pub mod phenotype;
pub mod allele;

pub use table::{Table, TableLoader, TableParseError};
pub use phenotype::PhenotypeParser;
pub use allele::AlleleParser;
