//! # Stockfilter - in-stock product export from spreadsheets
//!
//! Stockfilter reads a product spreadsheet, keeps the rows whose existence
//! column says `SI`, projects a fixed set of columns and emits JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ .xlsx bytes │────▶│  Workbook   │────▶│  Transform  │────▶│  JSON doc   │
//! │ (+ sheet)   │     │ (calamine)  │     │ (filter)    │     │ meta + data │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stockfilter::{convert_file, ConvertOptions};
//!
//! let document = convert_file("inventario.xlsx", &ConvertOptions::default())?;
//! println!("{}", document.to_json_pretty()?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Rows, output records and the conversion summary
//! - [`workbook`] - Spreadsheet reading and sheet resolution
//! - [`transform`] - Filter policy, table transformer and pipeline
//! - [`store`] - Expiring keyed store for downloads
//! - [`config`] - Server configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Reading
pub mod workbook;

// Transformation
pub mod transform;

// Downloads
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConvertError, ServerError, SheetError, TransformError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ConversionDocument, ConversionSummary, OutputRecord, Row, Table};

// =============================================================================
// Re-exports - Workbook
// =============================================================================

pub use workbook::{list_sheets, list_sheets_file, read_resolved, read_sheet, resolve_sheet};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::pipeline::{convert_bytes, convert_file, ConvertOptions};
pub use transform::policy::{FilterMode, FilterPolicy};
pub use transform::table::transform;

// =============================================================================
// Re-exports - Store / Config
// =============================================================================

pub use config::AppConfig;
pub use store::{download_filename, sanitize_download_name, ExpiringStore};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
