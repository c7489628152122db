//! High-level conversion API: spreadsheet bytes in, JSON document out.
//!
//! Combines sheet resolution, sheet reading and the table transformer.
//!
//! # Example
//!
//! ```rust,ignore
//! use stockfilter::{convert_file, ConvertOptions};
//!
//! let document = convert_file("inventario.xlsx", &ConvertOptions::default())?;
//! println!("{} products in stock", document.meta.output_count);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::policy::{FilterMode, FilterPolicy};
use super::table::transform;
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::ConvertError;
use crate::models::ConversionDocument;
use crate::workbook::read_resolved;

/// Options for one conversion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Sheet named by the user (blank = not given)
    pub sheet_name: Option<String>,

    /// Sheet used when the user names none (`None` = first sheet)
    pub default_sheet: Option<String>,

    /// Existence filter policy
    pub policy: FilterPolicy,
}

impl ConvertOptions {
    /// Options for a named policy preset.
    pub fn for_mode(mode: FilterMode) -> Self {
        Self {
            sheet_name: None,
            default_sheet: mode.default_sheet(),
            policy: mode.policy(),
        }
    }

    pub fn with_sheet(mut self, sheet_name: Option<String>) -> Self {
        self.sheet_name = sheet_name;
        self
    }
}

/// Convert spreadsheet bytes into the filtered JSON document.
pub fn convert_bytes(
    bytes: &[u8],
    options: &ConvertOptions,
) -> Result<ConversionDocument, ConvertError> {
    log_info(format!("📖 Reading workbook ({} bytes)...", bytes.len()));

    let (sheet_name, table) = read_resolved(
        bytes,
        options.sheet_name.as_deref(),
        options.default_sheet.as_deref(),
    )
    .map_err(|e| {
        log_error(e.to_string());
        e
    })?;

    log_success(format!("Sheet \"{}\": {} rows, {} columns", sheet_name, table.rows.len(), table.headers.len()));

    let document = transform(&table, &sheet_name, &options.policy).map_err(|e| {
        log_error(e.to_string());
        e
    })?;

    match document.meta.existence_column {
        Some(ref column) => log_success(format!(
            "Existence column \"{}\": {} of {} rows marked SI",
            column, document.meta.existence_count, document.meta.total
        )),
        None => log_warning("No existence column found, keeping every row"),
    }
    log_success(format!("{} records exported", document.meta.output_count));

    Ok(document)
}

/// Convert a spreadsheet file on disk.
pub fn convert_file<P: AsRef<Path>>(
    path: P,
    options: &ConvertOptions,
) -> Result<ConversionDocument, ConvertError> {
    log_info(format!("📄 Processing: {}", path.as_ref().display()));
    let bytes = std::fs::read(path.as_ref())?;
    convert_bytes(&bytes, options)
}
