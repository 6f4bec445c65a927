// ==============================================================================
// classifier.rs - Major/Minor Allele Classification
// ==============================================================================
// Description: Assigns each joined observation to the major or minor group
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-12
// Version: 1.1.0
// ==============================================================================

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::merger::MergedRecord;
use crate::models::{AlleleClass, ClassificationPolicy, JoinedRecord};

/// Counts per class after classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub major: usize,
    pub minor: usize,
}

impl ClassCounts {
    pub fn of(records: &[JoinedRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            match r.allele_class {
                AlleleClass::Major => acc.major += 1,
                AlleleClass::Minor => acc.minor += 1,
            }
            acc
        })
    }
}

/// Classifies merged records under one policy.
///
/// Records with no allele value are always `Major`.
#[derive(Debug, Clone)]
pub struct AlleleClassifier {
    policy: ClassificationPolicy,
}

impl AlleleClassifier {
    pub fn new(policy: ClassificationPolicy) -> Self {
        Self { policy }
    }

    pub fn classify(&self, merged: Vec<MergedRecord>) -> Vec<JoinedRecord> {
        let records: Vec<JoinedRecord> = match &self.policy {
            ClassificationPolicy::FixedBaseline { minor_allele } => {
                debug!("Classifying with fixed minor allele '{}'", minor_allele);
                merged
                    .into_iter()
                    .map(|m| {
                        let class = match m.allele_value.as_deref() {
                            Some(value) if value == minor_allele.as_str() => AlleleClass::Minor,
                            _ => AlleleClass::Major,
                        };
                        join(m, class)
                    })
                    .collect()
            }
            ClassificationPolicy::FrequencyBaseline => {
                let major_allele = most_frequent_allele(&merged);
                debug!("Most frequent allele: {:?}", major_allele);
                merged
                    .into_iter()
                    .map(|m| {
                        let class = match (m.allele_value.as_deref(), major_allele.as_deref()) {
                            (None, _) => AlleleClass::Major,
                            (Some(value), Some(major)) if value == major => AlleleClass::Major,
                            (Some(_), _) => AlleleClass::Minor,
                        };
                        join(m, class)
                    })
                    .collect()
            }
        };

        let counts = ClassCounts::of(&records);
        info!(
            "Classified {} rows ({}): {} major, {} minor",
            records.len(),
            self.policy,
            counts.major,
            counts.minor
        );

        records
    }
}

fn join(merged: MergedRecord, allele_class: AlleleClass) -> JoinedRecord {
    JoinedRecord {
        phenotype: merged.phenotype,
        allele_value: merged.allele_value,
        allele_class,
    }
}

/// Mode of the non-null allele values; ties go to the value seen first
pub fn most_frequent_allele(merged: &[MergedRecord]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, value) in merged
        .iter()
        .filter_map(|m| m.allele_value.as_deref())
        .enumerate()
    {
        counts.entry(value).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PhenotypeRecord, Treatment};
    use std::collections::BTreeMap;

    fn merged(id: &str, value: Option<&str>) -> MergedRecord {
        MergedRecord {
            phenotype: PhenotypeRecord {
                accession_id: id.to_string(),
                treatment: Treatment::Mock,
                fields: BTreeMap::new(),
            },
            allele_value: value.map(str::to_string),
        }
    }

    fn classes(records: &[JoinedRecord]) -> Vec<AlleleClass> {
        records.iter().map(|r| r.allele_class).collect()
    }

    #[test]
    fn test_fixed_baseline() {
        let classifier = AlleleClassifier::new(ClassificationPolicy::FixedBaseline {
            minor_allele: "C".to_string(),
        });
        let records = classifier.classify(vec![
            merged("CS1", Some("A")),
            merged("CS2", Some("C")),
            merged("CS3", None),
        ]);

        assert_eq!(
            classes(&records),
            vec![AlleleClass::Major, AlleleClass::Minor, AlleleClass::Major]
        );
    }

    #[test]
    fn test_frequency_baseline_mode_is_major() {
        let classifier = AlleleClassifier::new(ClassificationPolicy::FrequencyBaseline);
        let records = classifier.classify(vec![
            merged("CS1", Some("T")),
            merged("CS2", Some("G")),
            merged("CS3", Some("G")),
            merged("CS4", None),
        ]);

        assert_eq!(
            classes(&records),
            vec![
                AlleleClass::Minor,
                AlleleClass::Major,
                AlleleClass::Major,
                AlleleClass::Major
            ]
        );
        assert_eq!(ClassCounts::of(&records), ClassCounts { major: 3, minor: 1 });
    }

    #[test]
    fn test_mode_tie_breaks_on_first_seen() {
        let rows = vec![
            merged("CS1", None),
            merged("CS2", Some("T")),
            merged("CS3", Some("A")),
            merged("CS4", Some("A")),
            merged("CS5", Some("T")),
        ];
        assert_eq!(most_frequent_allele(&rows).as_deref(), Some("T"));
        assert_eq!(most_frequent_allele(&[merged("CS1", None)]), None);
    }

    #[test]
    fn test_all_null_is_all_major() {
        let classifier = AlleleClassifier::new(ClassificationPolicy::FrequencyBaseline);
        let records = classifier.classify(vec![merged("CS1", None), merged("CS2", None)]);
        assert!(records.iter().all(|r| r.allele_class == AlleleClass::Major));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let input = vec![
            merged("CS1", Some("A")),
            merged("CS2", Some("C")),
            merged("CS3", Some("C")),
            merged("CS4", Some("A")),
        ];
        let classifier = AlleleClassifier::new(ClassificationPolicy::FrequencyBaseline);
        let first = classes(&classifier.classify(input.clone()));
        for _ in 0..10 {
            assert_eq!(classes(&classifier.classify(input.clone())), first);
        }
    }
}
