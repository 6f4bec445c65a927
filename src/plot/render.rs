// ==============================================================================
// render.rs - Bitmap Figure Rendering
// ==============================================================================
// Description: Draws violin and beeswarm panels with the plotters bitmap backend
// Author: Matt Barham
// Created: 2026-10-06
// Modified: 2026-10-15
// Version: 1.2.0
// ==============================================================================
// Style invariants (not configurable):
// - only the left and bottom axis lines are drawn
// - title 40px, panel titles 34px, axis descriptions 30px, tick labels 26px
// - categorical x axis with Mock at 0 and ABA at 1
// ==============================================================================

use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::debug;

use super::fonts::FONT_FAMILY;
use super::layout::{self, PanelData, SwarmScale};
use super::{ChartKind, PlotStyle};
use crate::models::Treatment;

const TITLE_BAND_PX: u32 = 90;
const TITLE_FONT: f64 = 40.0;
const PANEL_TITLE_FONT: f64 = 34.0;
const AXIS_DESC_FONT: f64 = 30.0;
const TICK_FONT: f64 = 26.0;
const LEGEND_FONT: f64 = 24.0;

const PANEL_MARGIN: u32 = 30;
const X_LABEL_AREA: u32 = 80;
const Y_LABEL_AREA: u32 = 100;

const VIOLIN_WIDTH: f64 = 0.8;
const BOX_WIDTH: f64 = 0.3;
const SWARM_MARKER_RADIUS: u32 = 5;
const TRAJECTORY_MARKER_RADIUS: u32 = 4;

const OUTLINE: RGBColor = RGBColor(64, 64, 64);
const TRAJECTORY: RGBColor = RGBColor(128, 128, 128);

type PanelChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Everything the renderer needs for one figure
pub(super) struct Figure<'a> {
    pub kind: ChartKind,
    pub title: String,
    pub trait_column: &'a str,
    pub panels: &'a [PanelData; 2],
    pub style: &'a PlotStyle,
    /// Whether a font is registered; without one no text is drawn
    pub text: bool,
}

fn text_style(size: f64) -> TextStyle<'static> {
    TextStyle::from((FONT_FAMILY, size).into_font()).color(&BLACK)
}

fn treatment_label(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    Treatment::from_position(rounded as usize)
        .map(|t| t.as_str().to_string())
        .unwrap_or_default()
}

/// Draw the full two-panel figure and write it to `path`.
///
/// Returns the number of connecting lines drawn per panel.
pub(super) fn draw_figure(figure: &Figure<'_>, path: &Path) -> Result<[usize; 2], String> {
    let root = BitMapBackend::new(path, (figure.style.width, figure.style.height)).into_drawing_area();
    let lines = draw_on(&root, figure).map_err(|e| e.to_string())?;
    root.present().map_err(|e| e.to_string())?;
    Ok(lines)
}

fn draw_on<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure<'_>,
) -> Result<[usize; 2], DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let (title_band, body) = root.split_vertically(TITLE_BAND_PX);
    if figure.text {
        let (width, height) = title_band.dim_in_pixel();
        title_band.draw(&Text::new(
            figure.title.clone(),
            ((width / 2) as i32, (height / 2) as i32),
            text_style(TITLE_FONT).pos(Pos::new(HPos::Center, VPos::Center)),
        ))?;
    }

    let areas = body.split_evenly((1, 2));
    let mut lines = [0usize; 2];
    for (idx, (area, panel)) in areas.iter().zip(figure.panels.iter()).enumerate() {
        lines[idx] = draw_panel(area, panel, figure)?;
    }

    draw_legend(root, figure)?;
    Ok(lines)
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &PanelData,
    figure: &Figure<'_>,
) -> Result<usize, DrawingAreaErrorKind<DB::ErrorType>> {
    let (y_min, y_max) = figure.style.y_range;
    let panel_title = format!("{} ({})", panel.class.as_str(), figure.kind.label());

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(PANEL_MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA);
    if figure.text {
        builder.caption(&panel_title, text_style(PANEL_TITLE_FONT));
    }
    let mut chart = builder.build_cartesian_2d(-0.5f64..1.5f64, y_min..y_max)?;

    draw_axes(&mut chart, figure)?;

    if panel.is_empty() {
        debug!("Panel '{}' has no observations", panel_title);
        if figure.text {
            chart.draw_series(std::iter::once(Text::new(
                "no observations".to_string(),
                (0.5, (y_min + y_max) / 2.0),
                text_style(AXIS_DESC_FONT).pos(Pos::new(HPos::Center, VPos::Center)),
            )))?;
        }
        return Ok(0);
    }

    match figure.kind {
        ChartKind::Violin => draw_violin_panel(&mut chart, panel, figure.style),
        ChartKind::Beeswarm => {
            draw_beeswarm_panel(&mut chart, panel, figure.style)?;
            Ok(0)
        }
    }
}

/// Left and bottom axis lines, ticks and descriptions. Ticks fall on
/// half-category steps; only the whole positions carry a treatment label.
fn draw_axes<DB: DrawingBackend>(
    chart: &mut PanelChart<'_, DB>,
    figure: &Figure<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    if figure.text {
        let formatter = |v: &f64| treatment_label(*v);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc("treatment")
            .y_desc(figure.trait_column)
            .axis_desc_style(text_style(AXIS_DESC_FONT))
            .label_style(text_style(TICK_FONT))
            .x_label_formatter(&formatter)
            .x_labels(5)
            .y_labels(8)
            .axis_style(BLACK.stroke_width(2))
            .draw()?;
    } else {
        let (y_min, y_max) = figure.style.y_range;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(-0.5, y_max), (-0.5, y_min), (1.5, y_min)],
            BLACK.stroke_width(2),
        )))?;
    }
    Ok(())
}

fn clamp_y(value: f64, style: &PlotStyle) -> f64 {
    value.clamp(style.y_range.0, style.y_range.1)
}

fn draw_violin_panel<DB: DrawingBackend>(
    chart: &mut PanelChart<'_, DB>,
    panel: &PanelData,
    style: &PlotStyle,
) -> Result<usize, DrawingAreaErrorKind<DB::ErrorType>> {
    let (y_min, y_max) = style.y_range;
    let outlines: Vec<(Treatment, Vec<f64>, Option<Vec<(f64, f64)>>)> = Treatment::ALL
        .iter()
        .map(|t| {
            let values = panel.values_for(*t);
            let outline = layout::kde_outline(&values);
            (*t, values, outline)
        })
        .collect();

    // Area scaling: the densest point across the panel spans the full width
    let max_density = outlines
        .iter()
        .filter_map(|(_, _, outline)| outline.as_ref())
        .flat_map(|outline| outline.iter().map(|(_, d)| *d))
        .fold(0.0f64, f64::max);

    for (treatment, values, outline) in &outlines {
        if values.is_empty() {
            continue;
        }
        let center = treatment.position() as f64;
        let fill = style.palette.color(*treatment).unwrap_or(OUTLINE);

        match outline {
            Some(outline) if max_density > 0.0 => {
                let visible: Vec<(f64, f64)> = outline
                    .iter()
                    .copied()
                    .filter(|(y, _)| *y >= y_min && *y <= y_max)
                    .collect();
                let half_width = |d: f64| d / max_density * VIOLIN_WIDTH / 2.0;
                let mut shape: Vec<(f64, f64)> = visible
                    .iter()
                    .map(|(y, d)| (center + half_width(*d), *y))
                    .collect();
                shape.extend(visible.iter().rev().map(|(y, d)| (center - half_width(*d), *y)));

                if shape.len() >= 3 {
                    chart.draw_series(std::iter::once(Polygon::new(shape.clone(), fill.mix(0.9).filled())))?;
                    let mut closed = shape;
                    if let Some(first) = closed.first().copied() {
                        closed.push(first);
                    }
                    chart.draw_series(std::iter::once(PathElement::new(closed, OUTLINE.stroke_width(2))))?;
                }
            }
            _ => {
                // Single observation or zero spread
                let y = clamp_y(values[0], style);
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(center - VIOLIN_WIDTH / 4.0, y), (center + VIOLIN_WIDTH / 4.0, y)],
                    fill.stroke_width(3),
                )))?;
            }
        }

        // Narrow embedded box: IQR bar, whisker line, median dot
        if let Some(summary) = layout::box_summary(values) {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![
                    (center, clamp_y(summary.whisker_low, style)),
                    (center, clamp_y(summary.whisker_high, style)),
                ],
                OUTLINE.stroke_width(2),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (center - 0.02, clamp_y(summary.q1, style)),
                    (center + 0.02, clamp_y(summary.q3, style)),
                ],
                OUTLINE.filled(),
            )))?;
            chart.draw_series(std::iter::once(Circle::new(
                (center, clamp_y(summary.median, style)),
                5,
                WHITE.filled(),
            )))?;
        }
    }

    // Per-accession repeated-measures overlay
    let trajectories = layout::subject_trajectories(&panel.observations);
    for trajectory in &trajectories {
        let coords: Vec<(f64, f64)> = trajectory
            .points
            .iter()
            .map(|(t, v)| (t.position() as f64, clamp_y(*v, style)))
            .collect();
        chart.draw_series(std::iter::once(PathElement::new(
            coords.clone(),
            TRAJECTORY.mix(0.5).stroke_width(2),
        )))?;
        chart.draw_series(
            coords
                .into_iter()
                .map(|c| Circle::new(c, TRAJECTORY_MARKER_RADIUS, BLACK.mix(0.7).filled())),
        )?;
    }

    Ok(trajectories.len())
}

fn draw_beeswarm_panel<DB: DrawingBackend>(
    chart: &mut PanelChart<'_, DB>,
    panel: &PanelData,
    style: &PlotStyle,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (y_min, y_max) = style.y_range;
    let (plot_w, plot_h) = chart.plotting_area().dim_in_pixel();
    let scale = SwarmScale {
        px_per_x: plot_w as f64 / 2.0,
        px_per_y: plot_h as f64 / (y_max - y_min),
        marker_px: (SWARM_MARKER_RADIUS * 2 + 1) as f64,
        max_half_width: VIOLIN_WIDTH / 2.0,
    };

    for treatment in Treatment::ALL {
        let values = panel.values_for(treatment);
        if values.is_empty() {
            continue;
        }
        let center = treatment.position() as f64;
        let fill = style.palette.color(treatment).unwrap_or(OUTLINE);

        // Unfilled box without caps or whiskers
        if let Some(summary) = layout::box_summary(&values) {
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (center - BOX_WIDTH / 2.0, clamp_y(summary.q1, style)),
                    (center + BOX_WIDTH / 2.0, clamp_y(summary.q3, style)),
                ],
                OUTLINE.stroke_width(2),
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![
                    (center - BOX_WIDTH / 2.0, clamp_y(summary.median, style)),
                    (center + BOX_WIDTH / 2.0, clamp_y(summary.median, style)),
                ],
                OUTLINE.stroke_width(3),
            )))?;
        }

        let swarm = layout::swarm_offsets(&values, scale);
        if swarm.clamped > 0 {
            debug!(
                "{} of {} {} points could not be placed without overlap",
                swarm.clamped,
                values.len(),
                treatment
            );
        }
        chart.draw_series(values.iter().zip(swarm.offsets.iter()).map(|(v, dx)| {
            Circle::new(
                (center + dx, clamp_y(*v, style)),
                SWARM_MARKER_RADIUS,
                fill.mix(0.7).filled(),
            )
        }))?;
    }

    Ok(())
}

/// Figure-level legend keyed by treatment, upper right corner
fn draw_legend<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (width, _) = root.dim_in_pixel();
    let right = width as i32 - 30;
    let left = right - 190;
    let mut y = 20;

    if figure.text {
        root.draw(&Text::new(
            "treatment".to_string(),
            (left, y),
            text_style(LEGEND_FONT),
        ))?;
    }
    y += 32;

    for treatment in Treatment::ALL {
        let color = figure.style.palette.color(treatment).unwrap_or(OUTLINE);
        root.draw(&Rectangle::new([(left, y + 8), (left + 48, y + 14)], color.filled()))?;
        if figure.text {
            root.draw(&Text::new(
                treatment.as_str().to_string(),
                (left + 60, y),
                text_style(LEGEND_FONT),
            ))?;
        }
        y += 30;
    }

    Ok(())
}
