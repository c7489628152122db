//! Table transformer: existence filter, column projection and type coercion.
//!
//! # Algorithm
//!
//! ```text
//! rows ──▶ detect existence column ──▶ keep "SI" rows ──▶ check required columns
//!                                                              │
//!          ConversionDocument ◀── coerce STOCK/PRECIO ◀── project + rename
//! ```
//!
//! The transformer is pure: no I/O, input is never mutated and identical
//! input yields identical output.

use crate::error::TransformError;
use crate::models::{
    ConversionDocument, ConversionSummary, OutputRecord, Row, Table, COL_CATEGORIA, COL_CODIGO,
    COL_DESCRIPCION, COL_ENLACE_WEB, COL_EXISTENCIAS, COL_NOMBRE, COL_PRECIO, COL_STOCK,
    REQUIRED_COLUMNS,
};

use super::policy::FilterPolicy;

/// Filter, project and coerce a sheet's rows.
///
/// # Errors
/// [`TransformError::MissingColumns`] when required columns are absent and
/// cannot be recovered from the detected existence alias.
pub fn transform(
    table: &Table,
    sheet_name: &str,
    policy: &FilterPolicy,
) -> Result<ConversionDocument, TransformError> {
    let total = table.rows.len();
    let existence_column = policy.detect_existence_column(&table.headers);

    let (kept, existence_count): (Vec<&Row>, usize) = match existence_column {
        Some(column) => {
            let kept: Vec<&Row> = table
                .rows
                .iter()
                .filter(|row| policy.is_in_stock(row.get(column).map(String::as_str)))
                .collect();
            let count = kept.len();
            (kept, count)
        }
        None => (table.rows.iter().collect(), 0),
    };

    let existence_source = existence_source_column(table, existence_column, policy)?;

    let data: Vec<OutputRecord> = kept
        .into_iter()
        .map(|row| project_row(row, existence_source))
        .collect();

    Ok(ConversionDocument {
        meta: ConversionSummary {
            total,
            existence_count,
            sheet_name: sheet_name.to_string(),
            output_count: data.len(),
            existence_column: existence_column.map(str::to_string),
        },
        data,
    })
}

/// Check required columns and return the header that feeds `EXISTENCIAS`.
///
/// `EXISTENCIAS` may be missing only if a differently-named existence column
/// was detected and the policy allows substitution.
fn existence_source_column<'a>(
    table: &Table,
    existence_column: Option<&'a str>,
    policy: &FilterPolicy,
) -> Result<&'a str, TransformError> {
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();

    let mut source = COL_EXISTENCIAS;
    if missing.iter().any(|c| c == COL_EXISTENCIAS) {
        if let Some(alias) = existence_column {
            if policy.substitute_alias && alias != COL_EXISTENCIAS {
                missing.retain(|c| c != COL_EXISTENCIAS);
                source = alias;
            }
        }
    }

    if missing.is_empty() {
        Ok(source)
    } else {
        Err(TransformError::MissingColumns(missing))
    }
}

fn project_row(row: &Row, existence_source: &str) -> OutputRecord {
    OutputRecord {
        existence: cell_text(row, existence_source),
        stock: cell_number(row, COL_STOCK),
        code: cell_text(row, COL_CODIGO),
        category: cell_text(row, COL_CATEGORIA),
        name: cell_text(row, COL_NOMBRE).map(|name| name.trim().to_string()),
        price: cell_number(row, COL_PRECIO),
        description: cell_text(row, COL_DESCRIPCION),
        image_link: cell_text(row, COL_ENLACE_WEB),
    }
}

/// Cell text; blank cells are `None`.
fn cell_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).filter(|v| !v.is_empty()).cloned()
}

fn cell_number(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(|v| parse_number(v))
}

/// Parse a cell as a finite number; anything else is `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
