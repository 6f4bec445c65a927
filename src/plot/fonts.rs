// ==============================================================================
// fonts.rs - Runtime Font Registration
// ==============================================================================
// Description: Registers a TrueType font with plotters for headless rendering
// Author: Matt Barham
// Created: 2026-10-06
// Modified: 2026-10-06
// Version: 1.0.0
// ==============================================================================
// plotters' ab_glyph backend has no built-in fonts. A font is loaded once per
// process from the configured path or a well-known system location. When none
// is found, charts are still rendered but without any text.
// ==============================================================================

use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Family name every text style in the crate uses
pub const FONT_FAMILY: &str = "sans-serif";

const CANDIDATE_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Ensure a font is registered. Returns whether text can be drawn.
///
/// Only the first call does any work; later calls reuse its outcome even if
/// they pass a different path.
pub fn ensure_registered(preferred: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| register_first_available(preferred))
}

fn register_first_available(preferred: Option<&Path>) -> bool {
    let candidates: Vec<PathBuf> = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(CANDIDATE_FONTS.iter().map(PathBuf::from))
        .collect();

    for path in candidates {
        let Some(bytes) = read_font(&path) else {
            continue;
        };

        // plotters keeps a reference for the lifetime of the process
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());

        let normal = register_font(FONT_FAMILY, FontStyle::Normal, bytes);
        let bold = register_font(FONT_FAMILY, FontStyle::Bold, bytes);
        if normal.is_ok() && bold.is_ok() {
            info!("Registered plot font {:?}", path);
            return true;
        }
        debug!("Font {:?} was rejected by plotters, trying next", path);
    }

    warn!("No usable TrueType font found; charts will be rendered without text");
    false
}

/// Font file contents, if the file exists and parses as a font
fn read_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    if ab_glyph::FontRef::try_from_slice(&bytes).is_err() {
        debug!("Font {:?} could not be parsed, trying next", path);
        return None;
    }
    Some(bytes)
}
