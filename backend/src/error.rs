//! Error types for the stockfilter conversion pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SheetError`] - Spreadsheet reading errors (unreadable payload, missing sheet)
//! - [`TransformError`] - Table transformation errors (missing columns)
//! - [`ConvertError`] - Top-level conversion errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Display messages are user-facing and written in Spanish, the language of
//! the upload form.

use thiserror::Error;

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors while reading a spreadsheet payload.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Payload is not a spreadsheet calamine can open.
    #[error("El archivo no es un Excel válido: {0}")]
    Unreadable(String),

    /// Requested sheet does not exist in the workbook.
    #[error("No existe la hoja '{requested}' (hojas disponibles: {})", .available.join(", "))]
    SheetNotFound {
        requested: String,
        available: Vec<String>,
    },

    /// Workbook has no sheets at all.
    #[error("No se encontraron hojas en el archivo.")]
    NoSheets,
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised by the table transformer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Required output columns absent and not recoverable via alias substitution.
    #[error("Faltan columnas en el Excel: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl TransformError {
    /// Columns reported as missing.
    pub fn missing_columns(&self) -> &[String] {
        match self {
            TransformError::MissingColumns(columns) => columns,
        }
    }
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion errors.
///
/// This is the error type returned by [`crate::transform::pipeline::convert_bytes`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Spreadsheet reading error.
    #[error("{0}")]
    Sheet(#[from] SheetError),

    /// Transformation error.
    #[error("{0}")]
    Transform(#[from] TransformError),

    /// IO error (CLI file access).
    #[error("No se pudo leer el archivo: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion error.
    #[error("{0}")]
    Convert(#[from] ConvertError),

    /// Invalid request.
    #[error("{0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Error interno: {0}")]
    Internal(String),
}

/// Result type for spreadsheet operations.
pub type SheetResult<T> = Result<T, SheetError>;
