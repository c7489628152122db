//! Domain models for the stockfilter conversion pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Row`] - One spreadsheet row, column header to cell text
//! - [`Table`] - Header list plus rows, as read from a sheet
//! - [`OutputRecord`] - A filtered, projected and coerced product record
//! - [`ConversionSummary`] - Counters reported alongside the records
//! - [`ConversionDocument`] - The `{"meta": ..., "data": [...]}` JSON document

use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

// =============================================================================
// Input Table
// =============================================================================

/// One spreadsheet row: exact column header → cell text.
///
/// A header with no entry means the cell is absent (blank in the sheet).
pub type Row = HashMap<String, String>;

/// Rows of string-typed cells plus the ordered header list of the sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column headers in sheet order.
    pub headers: Vec<String>,
    /// Data rows in sheet order.
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Whether a header is present (exact match).
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

// =============================================================================
// Output Columns
// =============================================================================

/// Existence column as emitted in the output.
pub const COL_EXISTENCIAS: &str = "EXISTENCIAS";
pub const COL_STOCK: &str = "STOCK";
pub const COL_CODIGO: &str = "CODIGO";
pub const COL_CATEGORIA: &str = "CATEGORIA";
pub const COL_NOMBRE: &str = "NOMBRE CONTIFICO";
pub const COL_PRECIO: &str = "PRECIO";
pub const COL_DESCRIPCION: &str = "DESCRIPCION";
/// Source header of the image link, renamed to `LINK IMAGEN` on output.
pub const COL_ENLACE_WEB: &str = "ENLACE WEB";

/// Required source columns, in output order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_EXISTENCIAS,
    COL_STOCK,
    COL_CODIGO,
    COL_CATEGORIA,
    COL_NOMBRE,
    COL_PRECIO,
    COL_DESCRIPCION,
    COL_ENLACE_WEB,
];

/// Placeholder reported when no existence column was detected.
pub const EXISTENCE_NOT_FOUND: &str = "(no encontrada)";

// =============================================================================
// Output Records
// =============================================================================

/// A product row restricted to the output columns.
///
/// Field order is the JSON key order. Blank cells are `null`; whole numbers
/// are written without a fractional part (`10`, not `10.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "EXISTENCIAS")]
    pub existence: Option<String>,

    #[serde(rename = "STOCK", serialize_with = "serialize_number")]
    pub stock: Option<f64>,

    #[serde(rename = "CODIGO")]
    pub code: Option<String>,

    #[serde(rename = "CATEGORIA")]
    pub category: Option<String>,

    #[serde(rename = "NOMBRE CONTIFICO")]
    pub name: Option<String>,

    #[serde(rename = "PRECIO", serialize_with = "serialize_number")]
    pub price: Option<f64>,

    #[serde(rename = "DESCRIPCION")]
    pub description: Option<String>,

    #[serde(rename = "LINK IMAGEN")]
    pub image_link: Option<String>,
}

/// Largest magnitude below which every whole `f64` is an exact integer (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn serialize_number<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(n) if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER => {
            serializer.serialize_i64(*n as i64)
        }
        Some(n) => serializer.serialize_f64(*n),
        None => serializer.serialize_none(),
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Counters describing one conversion.
///
/// Serialized with the key names the download consumers already rely on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionSummary {
    /// Rows in the sheet before filtering.
    #[serde(rename = "total_productos")]
    pub total: usize,

    /// Rows whose existence flag is `SI` (0 when no existence column).
    #[serde(rename = "productos_existente_si")]
    pub existence_count: usize,

    /// Sheet the rows were read from.
    pub sheet_name: String,

    /// Records emitted.
    #[serde(rename = "registros_filtrados")]
    pub output_count: usize,

    /// Header of the detected existence column.
    #[serde(rename = "columna_existencias", serialize_with = "serialize_existence_column")]
    pub existence_column: Option<String>,
}

fn serialize_existence_column<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(EXISTENCE_NOT_FOUND))
}

impl ConversionSummary {
    /// Detected column, or the "not found" placeholder.
    pub fn existence_column_label(&self) -> &str {
        self.existence_column.as_deref().unwrap_or(EXISTENCE_NOT_FOUND)
    }
}

/// Full conversion output: `{"meta": summary, "data": records}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionDocument {
    pub meta: ConversionSummary,
    pub data: Vec<OutputRecord>,
}

impl ConversionDocument {
    /// Pretty-printed JSON, as written to download files.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> OutputRecord {
        OutputRecord {
            existence: Some("SI".into()),
            stock: Some(10.0),
            code: Some("A1".into()),
            category: Some("X".into()),
            name: Some("Widget".into()),
            price: None,
            description: None,
            image_link: Some("http://x".into()),
        }
    }

    #[test]
    fn test_record_keys_in_output_order() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        let keys = [
            "\"EXISTENCIAS\"",
            "\"STOCK\"",
            "\"CODIGO\"",
            "\"CATEGORIA\"",
            "\"NOMBRE CONTIFICO\"",
            "\"PRECIO\"",
            "\"DESCRIPCION\"",
            "\"LINK IMAGEN\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!json.contains("ENLACE WEB"));
    }

    #[test]
    fn test_null_numeric_fields() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["STOCK"], json!(10));
        assert!(value["PRECIO"].is_null());
        assert!(value["DESCRIPCION"].is_null());
    }

    #[test]
    fn test_whole_numbers_written_as_integers() {
        let mut record = sample_record();
        record.stock = Some(-3.0);
        record.price = Some(9.99);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"STOCK\":-3,"));
        assert!(json.contains("\"PRECIO\":9.99,"));

        record.price = Some(120.0);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"PRECIO\":120,"));
    }

    #[test]
    fn test_summary_wire_keys() {
        let summary = ConversionSummary {
            total: 2,
            existence_count: 1,
            sheet_name: "Hoja 1".into(),
            output_count: 1,
            existence_column: None,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            json!({
                "total_productos": 2,
                "productos_existente_si": 1,
                "sheet_name": "Hoja 1",
                "registros_filtrados": 1,
                "columna_existencias": "(no encontrada)"
            })
        );
    }

    #[test]
    fn test_table_has_column_is_exact() {
        let table = Table::new(vec!["CODIGO".into()], vec![]);
        assert!(table.has_column("CODIGO"));
        assert!(!table.has_column("codigo"));
    }
}
