// ==============================================================================
// validator.rs - Input Table Validation
// ==============================================================================
// Description: Validates uploaded tables (size, name, type) before parsing
// Author: Matt Barham
// Created: 2026-10-04
// Modified: 2026-10-13
// Version: 1.1.0
// Security: Allowlist-only file types, sanitized names, bounded input size
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024; // 50 MB
const MAX_ROWS: usize = 1_000_000;
const ALLOWED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Per-request processing budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub max_bytes: u64,
    /// Data rows allowed per table; `None` disables the ceiling
    pub max_rows: Option<usize>,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_SIZE,
            max_rows: Some(MAX_ROWS),
        }
    }
}

/// Table bytes as handed over by the upload boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedTable {
    /// Client-supplied filename
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadedTable {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a table from disk, named after its file name
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| PipelineError::missing_input(format!("Invalid file path: {:?}", path)))?;

        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PipelineError::missing_input(format!("File not found: {}", path.display()))
            }
            _ => PipelineError::io(path, e),
        })?;

        Ok(Self { name, data })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedTable {
    pub original_name: String,
    pub safe_name: String,
    /// Safe name with the table suffix stripped; names the output sub-bundle
    pub stem: String,
    pub extension: String,
    pub size: u64,
    pub hash_sha256: String,
    pub validated_at: DateTime<Utc>,
}

pub struct InputValidator {
    limits: InputLimits,
}

impl InputValidator {
    pub fn new(limits: InputLimits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, upload: &UploadedTable) -> Result<ValidatedTable> {
        info!("Validating input: {}", upload.name);

        // 1. Size check
        let size = upload.data.len() as u64;
        if size > self.limits.max_bytes {
            return Err(PipelineError::rejected(format!(
                "{} is too large: {} bytes (max: {} bytes)",
                upload.name, size, self.limits.max_bytes
            )));
        }
        if size == 0 {
            return Err(PipelineError::malformed(&upload.name, "File is empty"));
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Filename sanitization
        let safe_name = sanitize_filename(&upload.name)?;
        debug!("Sanitized filename: {}", safe_name);

        // 3. Extension check (allowlist)
        let extension = get_extension(&safe_name).ok_or_else(|| {
            PipelineError::rejected(format!("{} has no file extension", upload.name))
        })?;
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PipelineError::rejected(format!(
                "Invalid file type: .{} (allowed: {})",
                extension,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        debug!("Extension check passed: {}", extension);

        // Stem names the output directory, so it must be a plain name
        let stem = source_stem(&safe_name, &extension);
        if !stem.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(PipelineError::rejected(format!(
                "Invalid filename {:?}: no name before the extension",
                upload.name
            )));
        }

        // 4. Text check
        if std::str::from_utf8(&upload.data).is_err() {
            return Err(PipelineError::malformed(&upload.name, "File is not UTF-8 text"));
        }

        // 5. Compute SHA-256 hash
        let hash = compute_sha256(&upload.data);
        debug!("SHA-256: {}", hash);

        Ok(ValidatedTable {
            original_name: upload.name.clone(),
            safe_name,
            stem,
            extension,
            size,
            hash_sha256: hash,
            validated_at: Utc::now(),
        })
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(InputLimits::default())
    }
}

fn sanitize_filename(name: &str) -> Result<String> {
    // Remove path separators, null bytes, control characters
    let safe = name
        .replace(['/', '\\', '\0'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .collect::<String>();

    // Limit length to 255 characters
    let truncated: String = safe.chars().take(255).collect();

    if truncated.is_empty() || truncated.chars().all(|c| c == '.') {
        return Err(PipelineError::rejected(format!(
            "Invalid filename after sanitization: {:?}",
            name
        )));
    }

    Ok(truncated)
}

fn get_extension(filename: &str) -> Option<String> {
    let (base, ext) = filename.rsplit_once('.')?;
    if base.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Strip the table suffix: `snp_1234.csv` -> `snp_1234`
fn source_stem(safe_name: &str, extension: &str) -> String {
    safe_name
        .len()
        .checked_sub(extension.len() + 1)
        .map(|end| safe_name[..end].to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| safe_name.to_string())
}

fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
