// ==============================================================================
// models.rs - Phenotype/Allele Data Models
// ==============================================================================
// Description: Records, treatment ordering and classification policies
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-14
// Version: 1.2.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Experimental condition applied to a subject.
///
/// The ordering is fixed (Mock before ABA) and drives axis placement and the
/// endpoint order of per-subject trajectories. It is never derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Treatment {
    Mock,
    #[serde(rename = "ABA")]
    Aba,
}

impl Treatment {
    /// Every treatment in axis order
    pub const ALL: [Treatment; 2] = [Treatment::Mock, Treatment::Aba];

    /// Categorical axis position
    pub fn position(&self) -> usize {
        match self {
            Treatment::Mock => 0,
            Treatment::Aba => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Treatment::Mock => "Mock",
            Treatment::Aba => "ABA",
        }
    }

    pub fn from_position(position: usize) -> Option<Treatment> {
        Self::ALL.get(position).copied()
    }
}

impl FromStr for Treatment {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Mock" => Ok(Treatment::Mock),
            "ABA" => Ok(Treatment::Aba),
            other => Err(PipelineError::UnknownCategory {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Treatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allele group a joined record is plotted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlleleClass {
    Major,
    Minor,
}

impl AlleleClass {
    pub const ALL: [AlleleClass; 2] = [AlleleClass::Major, AlleleClass::Minor];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlleleClass::Major => "major",
            AlleleClass::Minor => "minor",
        }
    }
}

impl fmt::Display for AlleleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subject observation from the phenotype table
#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeRecord {
    /// Accession (strain) identifier; repeats across treatments are expected
    pub accession_id: String,

    pub treatment: Treatment,

    /// Remaining columns kept as raw text, keyed by header name.
    /// Numeric trait values are parsed on demand.
    pub fields: BTreeMap<String, String>,
}

impl PhenotypeRecord {
    /// Parse a trait column as a float. Missing, empty and `NA`-style values
    /// yield `None`.
    pub fn trait_value(&self, column: &str) -> Option<f64> {
        let raw = self.fields.get(column)?.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
            return None;
        }
        raw.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// One accession's allele at a single marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleRecord {
    pub accession_id: String,
    /// Allele value (usually a nucleotide); `None` when the cell is empty
    pub allele_value: Option<String>,
}

/// Phenotype observation joined with its allele and classification
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub phenotype: PhenotypeRecord,
    pub allele_value: Option<String>,
    pub allele_class: AlleleClass,
}

impl JoinedRecord {
    pub fn accession_id(&self) -> &str {
        &self.phenotype.accession_id
    }
}

/// How the minor allele is chosen for one allele file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// Minor iff the allele equals a fixed reference character
    FixedBaseline { minor_allele: String },
    /// The most frequent allele is major, everything else minor
    FrequencyBaseline,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        ClassificationPolicy::FixedBaseline {
            minor_allele: "C".to_string(),
        }
    }
}

impl fmt::Display for ClassificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationPolicy::FixedBaseline { minor_allele } => {
                write!(f, "fixed-baseline (minor = '{}')", minor_allele)
            }
            ClassificationPolicy::FrequencyBaseline => f.write_str("frequency-baseline"),
        }
    }
}

/// Resolution of repeated accession identifiers inside one allele table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// First row by input order wins
    #[default]
    FirstMatch,
    /// Any duplicate fails the merge
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_order_is_total_and_fixed() {
        assert!(Treatment::Mock < Treatment::Aba);
        assert_eq!(Treatment::Mock.position(), 0);
        assert_eq!(Treatment::Aba.position(), 1);
        for t in Treatment::ALL {
            assert_eq!(Treatment::from_position(t.position()), Some(t));
        }
        assert_eq!(Treatment::from_position(2), None);
    }

    #[test]
    fn test_treatment_parse() {
        assert_eq!("Mock".parse::<Treatment>().unwrap(), Treatment::Mock);
        assert_eq!(" ABA ".parse::<Treatment>().unwrap(), Treatment::Aba);

        for bad in ["mock", "aba", "Heat", ""] {
            match bad.parse::<Treatment>() {
                Err(PipelineError::UnknownCategory { value }) => assert_eq!(value, bad.trim()),
                other => panic!("Expected UnknownCategory for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_trait_value_parsing() {
        let mut fields = BTreeMap::new();
        fields.insert("Ave_RLN".to_string(), " 42.5 ".to_string());
        fields.insert("Empty".to_string(), "".to_string());
        fields.insert("Missing".to_string(), "NA".to_string());
        fields.insert("Text".to_string(), "abc".to_string());
        let record = PhenotypeRecord {
            accession_id: "CS1".to_string(),
            treatment: Treatment::Mock,
            fields,
        };

        assert_eq!(record.trait_value("Ave_RLN"), Some(42.5));
        assert_eq!(record.trait_value("Empty"), None);
        assert_eq!(record.trait_value("Missing"), None);
        assert_eq!(record.trait_value("Text"), None);
        assert_eq!(record.trait_value("Absent"), None);
    }

    #[test]
    fn test_policy_serde() {
        let fixed: ClassificationPolicy =
            serde_json::from_str(r#"{"mode":"fixed_baseline","minor_allele":"T"}"#).unwrap();
        assert_eq!(
            fixed,
            ClassificationPolicy::FixedBaseline {
                minor_allele: "T".to_string()
            }
        );

        let freq: ClassificationPolicy =
            serde_json::from_str(r#"{"mode":"frequency_baseline"}"#).unwrap();
        assert_eq!(freq, ClassificationPolicy::FrequencyBaseline);

        assert_eq!(AlleleClass::Minor.as_str(), "minor");
        assert_eq!(
            serde_json::to_string(&DuplicatePolicy::Strict).unwrap(),
            "\"strict\""
        );
    }
}
