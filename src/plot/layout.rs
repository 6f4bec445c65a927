// ==============================================================================
// layout.rs - Plot Geometry
// ==============================================================================
// Description: Backend-independent geometry for violin, box and swarm charts
// Author: Matt Barham
// Created: 2026-10-05
// Modified: 2026-10-15
// Version: 1.2.0
// ==============================================================================

use std::collections::HashMap;

use crate::models::{AlleleClass, JoinedRecord, Treatment};

/// Points evaluated along each violin outline
pub const KDE_GRID_POINTS: usize = 100;

/// Bandwidths the violin extends past the extreme observations
pub const KDE_CUT: f64 = 2.0;

/// One plottable measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub accession_id: String,
    pub treatment: Treatment,
    pub value: f64,
}

/// Observations of one allele class, ready for drawing
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    pub class: AlleleClass,
    pub observations: Vec<Observation>,
}

impl PanelData {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Values for one treatment, in input order
    pub fn values_for(&self, treatment: Treatment) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|o| o.treatment == treatment)
            .map(|o| o.value)
            .collect()
    }
}

/// Split joined records into the major and minor panels.
///
/// Returns the panels plus the number of rows dropped because the trait value
/// was missing or non-numeric.
pub fn split_panels(records: &[JoinedRecord], trait_column: &str) -> ([PanelData; 2], usize) {
    let mut skipped = 0usize;
    let mut panels = AlleleClass::ALL.map(|class| PanelData {
        class,
        observations: Vec::new(),
    });

    for record in records {
        let Some(value) = record.phenotype.trait_value(trait_column) else {
            skipped += 1;
            continue;
        };
        let idx = match record.allele_class {
            AlleleClass::Major => 0,
            AlleleClass::Minor => 1,
        };
        panels[idx].observations.push(Observation {
            accession_id: record.phenotype.accession_id.clone(),
            treatment: record.phenotype.treatment,
            value,
        });
    }

    (panels, skipped)
}

/// Repeated-measures path of one accession across treatments
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub accession_id: String,
    /// (treatment, value), ordered by treatment position
    pub points: Vec<(Treatment, f64)>,
}

/// One trajectory per accession observed under at least two distinct
/// treatments. Accessions appear in first-seen order.
pub fn subject_trajectories(observations: &[Observation]) -> Vec<Trajectory> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_accession: HashMap<&str, Vec<(Treatment, f64)>> = HashMap::new();

    for obs in observations {
        let entry = by_accession
            .entry(obs.accession_id.as_str())
            .or_insert_with(|| {
                order.push(obs.accession_id.as_str());
                Vec::new()
            });
        entry.push((obs.treatment, obs.value));
    }

    order
        .into_iter()
        .filter_map(|accession_id| {
            let mut points = by_accession.remove(accession_id)?;
            let first = points.first()?.0;
            if points.iter().all(|(t, _)| *t == first) {
                return None;
            }
            points.sort_by_key(|(t, _)| t.position());
            Some(Trajectory {
                accession_id: accession_id.to_string(),
                points,
            })
        })
        .collect()
}

/// Five-number style summary used by the box markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Lowest observation within 1.5 IQR of q1
    pub whisker_low: f64,
    /// Highest observation within 1.5 IQR of q3
    pub whisker_high: f64,
    pub count: usize,
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let whisker_low = sorted
        .iter()
        .copied()
        .find(|v| *v >= low_fence)
        .unwrap_or(q1);
    let whisker_high = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= high_fence)
        .unwrap_or(q3);

    Some(BoxSummary {
        q1,
        median,
        q3,
        whisker_low,
        whisker_high,
        count: sorted.len(),
    })
}

/// Gaussian KDE outline: (value, density) pairs over the data range extended
/// by `KDE_CUT` bandwidths. Scott's rule picks the bandwidth.
///
/// Returns `None` for fewer than two observations or zero variance; those
/// groups are drawn as a flat line instead of a shape.
pub fn kde_outline(values: &[f64]) -> Option<Vec<(f64, f64)>> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if !std_dev.is_finite() || std_dev <= f64::EPSILON {
        return None;
    }

    let bandwidth = std_dev * (n as f64).powf(-0.2);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min) - KDE_CUT * bandwidth;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max) + KDE_CUT * bandwidth;
    let step = (max - min) / (KDE_GRID_POINTS - 1) as f64;
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    let outline = (0..KDE_GRID_POINTS)
        .map(|i| {
            let y = min + step * i as f64;
            let density = values
                .iter()
                .map(|v| {
                    let z = (y - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (y, density)
        })
        .collect();

    Some(outline)
}

/// Pixel scales needed to keep swarm markers from overlapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmScale {
    /// Pixels per categorical unit on the x axis
    pub px_per_x: f64,
    /// Pixels per value unit on the y axis
    pub px_per_y: f64,
    /// Marker diameter in pixels
    pub marker_px: f64,
    /// Widest allowed offset from the category center, in categorical units
    pub max_half_width: f64,
}

/// Swarm placement result
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmLayout {
    /// Horizontal offset per input value (categorical units), input order
    pub offsets: Vec<f64>,
    /// Points pushed back inside the category gutter
    pub clamped: usize,
}

/// Place markers so that no two overlap, as close to the center line as
/// possible. Values are placed lowest first; each candidate position either
/// sits on the center line or touches an already placed neighbor.
pub fn swarm_offsets(values: &[f64], scale: SwarmScale) -> SwarmLayout {
    let diameter = scale.marker_px;
    let diameter_sq = diameter * diameter;

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]).then(a.cmp(b)));

    let mut placed: Vec<(f64, f64)> = Vec::with_capacity(values.len());
    let mut offsets = vec![0.0; values.len()];

    for idx in order {
        let y = values[idx] * scale.px_per_y;
        let neighbors: Vec<(f64, f64)> = placed
            .iter()
            .copied()
            .filter(|(_, py)| (py - y).abs() < diameter)
            .collect();

        let mut candidates = vec![0.0];
        for (nx, ny) in &neighbors {
            let dy = ny - y;
            let dx = (diameter_sq - dy * dy).max(0.0).sqrt();
            candidates.push(nx + dx);
            candidates.push(nx - dx);
        }
        candidates.sort_by(|a, b| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)));

        let x = candidates
            .into_iter()
            .find(|cx| {
                neighbors.iter().all(|(nx, ny)| {
                    let dx = cx - nx;
                    let dy = ny - y;
                    dx * dx + dy * dy >= diameter_sq - 1e-6
                })
            })
            .unwrap_or(0.0);

        placed.push((x, y));
        offsets[idx] = x / scale.px_per_x;
    }

    let mut clamped = 0usize;
    for offset in offsets.iter_mut() {
        if offset.abs() > scale.max_half_width {
            *offset = scale.max_half_width.copysign(*offset);
            clamped += 1;
        }
    }

    SwarmLayout { offsets, clamped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhenotypeRecord;
    use std::collections::BTreeMap;

    fn obs(id: &str, treatment: Treatment, value: f64) -> Observation {
        Observation {
            accession_id: id.to_string(),
            treatment,
            value,
        }
    }

    fn joined(id: &str, treatment: Treatment, value: &str, class: AlleleClass) -> JoinedRecord {
        let mut fields = BTreeMap::new();
        fields.insert("Ave_RLN".to_string(), value.to_string());
        JoinedRecord {
            phenotype: PhenotypeRecord {
                accession_id: id.to_string(),
                treatment,
                fields,
            },
            allele_value: None,
            allele_class: class,
        }
    }

    #[test]
    fn test_split_panels_drops_non_numeric() {
        let records = vec![
            joined("CS1", Treatment::Mock, "10", AlleleClass::Major),
            joined("CS2", Treatment::Aba, "NA", AlleleClass::Minor),
            joined("CS3", Treatment::Aba, "7.5", AlleleClass::Minor),
        ];
        let ([major, minor], skipped) = split_panels(&records, "Ave_RLN");

        assert_eq!(major.class, AlleleClass::Major);
        assert_eq!(major.observations.len(), 1);
        assert_eq!(minor.observations, vec![obs("CS3", Treatment::Aba, 7.5)]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_trajectories_require_two_treatments() {
        let observations = vec![
            obs("CS2", Treatment::Aba, 5.0),
            obs("CS1", Treatment::Mock, 10.0),
            obs("CS2", Treatment::Mock, 9.0),
            obs("CS3", Treatment::Mock, 4.0),
            obs("CS3", Treatment::Mock, 4.5),
            obs("CS1", Treatment::Aba, 6.0),
        ];
        let trajectories = subject_trajectories(&observations);

        // CS3 has two rows but only one treatment
        assert_eq!(trajectories.len(), 2);
        assert_eq!(trajectories[0].accession_id, "CS2");
        assert_eq!(
            trajectories[0].points,
            vec![(Treatment::Mock, 9.0), (Treatment::Aba, 5.0)]
        );
        assert_eq!(trajectories[1].accession_id, "CS1");
    }

    #[test]
    fn test_box_summary_quantiles() {
        let summary = box_summary(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(summary.q1, 2.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q3, 4.0);
        assert_eq!(summary.whisker_low, 1.0);
        assert_eq!(summary.whisker_high, 5.0);
        assert_eq!(summary.count, 5);

        let with_outlier = box_summary(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(with_outlier.whisker_high, 4.0);

        assert!(box_summary(&[]).is_none());
    }

    #[test]
    fn test_kde_outline() {
        assert!(kde_outline(&[3.0]).is_none());
        assert!(kde_outline(&[3.0, 3.0, 3.0]).is_none());

        let outline = kde_outline(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(outline.len(), KDE_GRID_POINTS);
        assert!(outline.first().unwrap().0 < 1.0);
        assert!(outline.last().unwrap().0 > 4.0);
        assert!(outline.iter().all(|(_, d)| *d > 0.0));

        // Symmetric data peaks in the middle
        let peak = outline
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        assert!((peak.0 - 2.5).abs() < 0.5);
    }

    #[test]
    fn test_swarm_points_do_not_overlap() {
        let scale = SwarmScale {
            px_per_x: 100.0,
            px_per_y: 10.0,
            marker_px: 8.0,
            max_half_width: 0.4,
        };
        let values = vec![10.0, 10.0, 10.0, 10.2, 30.0];
        let layout = swarm_offsets(&values, scale);

        assert_eq!(layout.offsets.len(), values.len());
        assert_eq!(layout.clamped, 0);
        // Isolated value stays on the center line
        assert_eq!(layout.offsets[4], 0.0);

        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                let dx = (layout.offsets[i] - layout.offsets[j]) * scale.px_per_x;
                let dy = (values[i] - values[j]) * scale.px_per_y;
                assert!(
                    dx * dx + dy * dy >= scale.marker_px * scale.marker_px - 1e-3,
                    "points {} and {} overlap",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_swarm_clamps_to_gutter() {
        let scale = SwarmScale {
            px_per_x: 10.0,
            px_per_y: 1.0,
            marker_px: 5.0,
            max_half_width: 0.4,
        };
        let values = vec![1.0; 6];
        let layout = swarm_offsets(&values, scale);

        assert!(layout.clamped > 0);
        assert!(layout.offsets.iter().all(|o| o.abs() <= 0.4 + 1e-12));
    }
}
