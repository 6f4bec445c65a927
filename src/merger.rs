// ==============================================================================
// merger.rs - Accession Left Join
// ==============================================================================
// Description: Attaches allele values to phenotype observations by accession
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-12
// Version: 1.1.0
// ==============================================================================

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{AlleleRecord, DuplicatePolicy, PhenotypeRecord};

/// Phenotype observation with the allele value it joined to, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub phenotype: PhenotypeRecord,
    pub allele_value: Option<String>,
}

/// Join statistics, logged and reported per allele file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_keys: usize,
}

/// Left outer join of phenotype rows onto allele rows.
///
/// Every phenotype row is kept in input order. Rows without a matching
/// accession keep a `None` allele value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessionMerger {
    pub duplicate_policy: DuplicatePolicy,
}

impl AccessionMerger {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self { duplicate_policy }
    }

    pub fn merge(
        &self,
        phenotypes: &[PhenotypeRecord],
        alleles: &[AlleleRecord],
        allele_source: &str,
    ) -> Result<(Vec<MergedRecord>, MergeStats)> {
        let mut stats = MergeStats::default();
        let lookup = self.build_lookup(alleles, allele_source, &mut stats)?;

        let merged: Vec<MergedRecord> = phenotypes
            .iter()
            .map(|phenotype| {
                let allele_value = match lookup.get(phenotype.accession_id.as_str()) {
                    Some(value) => {
                        stats.matched += 1;
                        value.clone()
                    }
                    None => {
                        stats.unmatched += 1;
                        None
                    }
                };
                MergedRecord {
                    phenotype: phenotype.clone(),
                    allele_value,
                }
            })
            .collect();

        info!(
            "Merged {} phenotype rows with {}: {} matched, {} unmatched",
            merged.len(),
            allele_source,
            stats.matched,
            stats.unmatched
        );

        Ok((merged, stats))
    }

    /// Build accession -> allele lookup, resolving duplicates per policy
    fn build_lookup<'a>(
        &self,
        alleles: &'a [AlleleRecord],
        allele_source: &str,
        stats: &mut MergeStats,
    ) -> Result<HashMap<&'a str, Option<String>>> {
        let mut lookup: HashMap<&str, Option<String>> = HashMap::with_capacity(alleles.len());
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for record in alleles {
            let key = record.accession_id.as_str();
            *counts.entry(key).or_insert(0) += 1;

            if lookup.contains_key(key) {
                stats.duplicate_keys += 1;
                continue;
            }
            lookup.insert(key, record.allele_value.clone());
        }

        if stats.duplicate_keys > 0 {
            // Report the first duplicated accession by input order
            let first_dup = alleles
                .iter()
                .map(|r| r.accession_id.as_str())
                .find(|key| counts.get(key).copied().unwrap_or(0) > 1);

            if let Some(accession_id) = first_dup {
                let count = counts[accession_id];
                match self.duplicate_policy {
                    DuplicatePolicy::Strict => {
                        return Err(PipelineError::MergeAmbiguity {
                            accession_id: accession_id.to_string(),
                            source_name: allele_source.to_string(),
                            count,
                        });
                    }
                    DuplicatePolicy::FirstMatch => {
                        warn!(
                            "{} duplicate accession rows in {} (e.g. '{}' x{}); keeping first match",
                            stats.duplicate_keys, allele_source, accession_id, count
                        );
                    }
                }
            }
        }

        debug!("Built allele lookup with {} accessions", lookup.len());
        Ok(lookup)
    }
}
