// ==============================================================================
// plot/mod.rs - Plot Composition
// ==============================================================================
// Description: Two-panel (major | minor) violin and beeswarm figures
// Author: Matt Barham
// Created: 2026-10-05
// Modified: 2026-10-15
// Version: 1.2.0
// ==============================================================================

pub mod fonts;
pub mod layout;
mod render;

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{JoinedRecord, Treatment};

pub use layout::{Observation, PanelData, Trajectory};

/// Raster encoding of written figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension; the bitmap encoder picks the codec from it
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Fill colors keyed by treatment, as `#RRGGBB`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentPalette {
    pub mock: String,
    pub aba: String,
}

impl Default for TreatmentPalette {
    fn default() -> Self {
        Self {
            mock: "#FF9999".to_string(),
            aba: "#66C2A5".to_string(),
        }
    }
}

impl TreatmentPalette {
    pub fn hex(&self, treatment: Treatment) -> &str {
        match treatment {
            Treatment::Mock => &self.mock,
            Treatment::Aba => &self.aba,
        }
    }

    pub fn color(&self, treatment: Treatment) -> Result<RGBColor> {
        parse_hex_color(self.hex(treatment))
    }
}

/// Parse `#RRGGBB` (leading `#` optional)
pub fn parse_hex_color(hex: &str) -> Result<RGBColor> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PipelineError::config(format!(
            "Invalid color '{}': expected #RRGGBB",
            hex
        )));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|e| PipelineError::config(format!("Invalid color '{}': {}", hex, e)))
    };
    Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Per-run figure options. Fonts sizes, spines and marker geometry are fixed
/// in the renderer and not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    /// Shared value-axis range for every panel of a run
    pub y_range: (f64, f64),
    pub palette: TreatmentPalette,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// TrueType font to register before the built-in search list
    pub font_path: Option<PathBuf>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            y_range: (0.0, 175.0),
            palette: TreatmentPalette::default(),
            width: 2400,
            height: 1200,
            format: ImageFormat::Png,
            font_path: None,
        }
    }
}

impl PlotStyle {
    pub fn validate(&self) -> Result<()> {
        let (low, high) = self.y_range;
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(PipelineError::config(format!(
                "Invalid y range [{}, {}]",
                low, high
            )));
        }
        if self.width < 400 || self.height < 300 {
            return Err(PipelineError::config(format!(
                "Figure size {}x{} is too small (minimum 400x300)",
                self.width, self.height
            )));
        }
        for treatment in Treatment::ALL {
            self.palette.color(treatment)?;
        }
        Ok(())
    }
}

/// The two chart families written per allele file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Violin,
    Beeswarm,
}

impl ChartKind {
    pub const ALL: [ChartKind; 2] = [ChartKind::Violin, ChartKind::Beeswarm];

    pub fn file_stem(&self) -> &'static str {
        match self {
            ChartKind::Violin => "violin_plot",
            ChartKind::Beeswarm => "beeswarm_plot",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Violin => "violin",
            ChartKind::Beeswarm => "beeswarm",
        }
    }

    pub fn figure_title(&self, source_stem: &str) -> String {
        match self {
            ChartKind::Violin => format!("Violin Plots - {}", source_stem),
            ChartKind::Beeswarm => format!("Beeswarm Plots - {}", source_stem),
        }
    }
}

/// What a rendered figure contains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureSummary {
    pub kind: ChartKind,
    pub path: PathBuf,
    pub title: String,
    /// Observations drawn in the major and minor panels
    pub observations: [usize; 2],
    /// Connecting lines drawn in the major and minor panels (violin only)
    pub connecting_lines: [usize; 2],
}

/// Builds and writes the two-panel figures for one allele file
#[derive(Debug, Clone)]
pub struct PlotComposer {
    style: PlotStyle,
    trait_column: String,
}

impl PlotComposer {
    pub fn new(style: PlotStyle, trait_column: impl Into<String>) -> Result<Self> {
        style.validate()?;
        Ok(Self {
            style,
            trait_column: trait_column.into(),
        })
    }

    /// Output path of one chart family inside `out_dir`
    pub fn artifact_path(&self, out_dir: &Path, kind: ChartKind) -> PathBuf {
        out_dir.join(format!("{}.{}", kind.file_stem(), self.style.format.extension()))
    }

    /// Render every chart family into `out_dir`
    pub fn compose_all(
        &self,
        records: &[JoinedRecord],
        source_stem: &str,
        out_dir: &Path,
    ) -> Result<Vec<FigureSummary>> {
        ChartKind::ALL
            .iter()
            .map(|kind| {
                let path = self.artifact_path(out_dir, *kind);
                self.compose(*kind, records, source_stem, &path)
            })
            .collect()
    }

    /// Render one chart family to `path`
    pub fn compose(
        &self,
        kind: ChartKind,
        records: &[JoinedRecord],
        source_stem: &str,
        path: &Path,
    ) -> Result<FigureSummary> {
        let (panels, skipped) = layout::split_panels(records, &self.trait_column);
        if skipped > 0 {
            warn!(
                "{} rows without a numeric '{}' value were not plotted",
                skipped, self.trait_column
            );
        }

        let text = fonts::ensure_registered(self.style.font_path.as_deref());
        let figure = render::Figure {
            kind,
            title: kind.figure_title(source_stem),
            trait_column: &self.trait_column,
            panels: &panels,
            style: &self.style,
            text,
        };

        let connecting_lines = render::draw_figure(&figure, path)
            .map_err(|message| PipelineError::render(path.display().to_string(), message))?;

        let summary = FigureSummary {
            kind,
            path: path.to_path_buf(),
            title: figure.title,
            observations: [panels[0].observations.len(), panels[1].observations.len()],
            connecting_lines,
        };

        info!(
            "Wrote {} figure {:?} (major n={}, minor n={})",
            kind.label(),
            path,
            summary.observations[0],
            summary.observations[1]
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlleleClass, PhenotypeRecord};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn joined(id: &str, treatment: Treatment, value: f64, class: AlleleClass) -> JoinedRecord {
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

    fn sample_records() -> Vec<JoinedRecord> {
        vec![
            joined("CS1", Treatment::Mock, 40.0, AlleleClass::Major),
            joined("CS1", Treatment::Aba, 20.0, AlleleClass::Major),
            joined("CS2", Treatment::Mock, 55.0, AlleleClass::Major),
            joined("CS2", Treatment::Aba, 31.0, AlleleClass::Major),
            joined("CS3", Treatment::Mock, 47.0, AlleleClass::Major),
            joined("CS4", Treatment::Mock, 60.0, AlleleClass::Minor),
            joined("CS4", Treatment::Aba, 22.0, AlleleClass::Minor),
        ]
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF9999").unwrap(), RGBColor(255, 153, 153));
        assert_eq!(parse_hex_color("66c2a5").unwrap(), RGBColor(102, 194, 165));
        assert!(parse_hex_color("#FFF").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
    }

    #[test]
    fn test_style_validation() {
        assert!(PlotStyle::default().validate().is_ok());

        let inverted = PlotStyle {
            y_range: (175.0, 0.0),
            ..PlotStyle::default()
        };
        assert!(matches!(inverted.validate(), Err(PipelineError::Config { .. })));

        let mut bad_color = PlotStyle::default();
        bad_color.palette.aba = "teal".to_string();
        assert!(bad_color.validate().is_err());
    }

    #[test]
    fn test_compose_violin_counts_lines() {
        let dir = TempDir::new().unwrap();
        let style = PlotStyle {
            width: 800,
            height: 400,
            ..PlotStyle::default()
        };
        let composer = PlotComposer::new(style, "Ave_RLN").unwrap();
        let path = composer.artifact_path(dir.path(), ChartKind::Violin);

        let summary = composer
            .compose(ChartKind::Violin, &sample_records(), "snp1", &path)
            .unwrap();

        assert_eq!(summary.observations, [5, 2]);
        assert_eq!(summary.connecting_lines, [2, 1]);
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_compose_with_empty_minor_panel() {
        let dir = TempDir::new().unwrap();
        let style = PlotStyle {
            width: 800,
            height: 400,
            ..PlotStyle::default()
        };
        let composer = PlotComposer::new(style, "Ave_RLN").unwrap();
        let records: Vec<JoinedRecord> = sample_records()
            .into_iter()
            .filter(|r| r.allele_class == AlleleClass::Major)
            .collect();

        let summaries = composer.compose_all(&records, "snp1", dir.path()).unwrap();

        assert_eq!(summaries.len(), 2);
        for summary in &summaries {
            assert_eq!(summary.observations[1], 0);
            assert!(summary.path.exists());
        }
        assert_eq!(summaries[0].path, dir.path().join("violin_plot.png"));
        assert_eq!(summaries[1].path, dir.path().join("beeswarm_plot.png"));
    }

    #[test]
    fn test_jpeg_extension() {
        let style = PlotStyle {
            format: ImageFormat::Jpeg,
            ..PlotStyle::default()
        };
        let composer = PlotComposer::new(style, "Ave_RLN").unwrap();
        assert_eq!(
            composer.artifact_path(Path::new("out"), ChartKind::Beeswarm),
            Path::new("out").join("beeswarm_plot.jpg")
        );
    }
}
