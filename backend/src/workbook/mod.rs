//! Spreadsheet reader: turns an uploaded workbook into a [`Table`] of text cells.
//!
//! Backed by calamine, so xlsx, xlsm, xls and ods payloads are all accepted.
//! No stock-specific logic here.
//!
//! # Layout rules
//!
//! - The first row of the sheet's used range is the header row.
//! - Blank header cells are named `Unnamed: {index}`.
//! - Repeated headers get a `.1`, `.2`, ... suffix; the first keeps its name.
//! - Fully blank data rows are skipped.
//! - Empty and error cells are absent from the [`Row`].
//! - Date cells are rendered as `YYYY-MM-DD HH:MM:SS`.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader, Sheets};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use crate::error::{SheetError, SheetResult};
use crate::models::{Row, Table};

type Workbook = Sheets<Cursor<Vec<u8>>>;

/// Open a workbook from raw bytes.
fn open(bytes: &[u8]) -> SheetResult<Workbook> {
    open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::Unreadable(e.to_string()))
}

/// Sheet names in workbook order.
pub fn list_sheets(bytes: &[u8]) -> SheetResult<Vec<String>> {
    Ok(open(bytes)?.sheet_names().to_vec())
}

/// Sheet names of a workbook on disk.
pub fn list_sheets_file<P: AsRef<Path>>(path: P) -> SheetResult<Vec<String>> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| SheetError::Unreadable(format!("{}: {}", path.as_ref().display(), e)))?;
    list_sheets(&bytes)
}

/// Pick the sheet to read.
///
/// Order: a non-blank `requested` name, then `default`, then the first sheet.
pub fn resolve_sheet(
    available: &[String],
    requested: Option<&str>,
    default: Option<&str>,
) -> SheetResult<String> {
    let wanted = requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(default);

    match wanted {
        Some(name) if available.iter().any(|s| s == name) => Ok(name.to_string()),
        Some(name) => Err(SheetError::SheetNotFound {
            requested: name.to_string(),
            available: available.to_vec(),
        }),
        None => available.first().cloned().ok_or(SheetError::NoSheets),
    }
}

/// Read one sheet of a workbook into a [`Table`].
pub fn read_sheet(bytes: &[u8], sheet_name: &str) -> SheetResult<Table> {
    let mut workbook = open(bytes)?;
    read_sheet_from(&mut workbook, sheet_name)
}

/// Open a workbook, resolve the sheet and read it in one pass.
///
/// Returns the resolved sheet name alongside the table.
pub fn read_resolved(
    bytes: &[u8],
    requested: Option<&str>,
    default: Option<&str>,
) -> SheetResult<(String, Table)> {
    let mut workbook = open(bytes)?;
    let sheet_name = resolve_sheet(&workbook.sheet_names(), requested, default)?;
    let table = read_sheet_from(&mut workbook, &sheet_name)?;
    Ok((sheet_name, table))
}

fn read_sheet_from(workbook: &mut Workbook, sheet_name: &str) -> SheetResult<Table> {
    let available = workbook.sheet_names().to_vec();
    if !available.iter().any(|s| s == sheet_name) {
        return Err(SheetError::SheetNotFound {
            requested: sheet_name.to_string(),
            available,
        });
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let mut rows_iter = range.rows();

    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => dedupe_headers(
            header_row
                .iter()
                .enumerate()
                .map(|(i, cell)| cell_to_string(cell).unwrap_or_else(|| format!("Unnamed: {}", i))),
        ),
        None => return Ok(Table::default()),
    };

    let mut rows = Vec::new();
    for cells in rows_iter {
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if let Some(text) = cell_to_string(cell) {
                row.insert(header.clone(), text);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(Table::new(headers, rows))
}

/// Make header names unique so no column shadows another in a [`Row`].
///
/// `CODIGO, CODIGO, CODIGO` becomes `CODIGO, CODIGO.1, CODIGO.2`.
fn dedupe_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::new();

    for name in raw {
        let mut unique = name.clone();
        if seen.contains(&name) {
            let count = counts.entry(name.clone()).or_insert(0);
            loop {
                *count += 1;
                unique = format!("{}.{}", name, count);
                if !seen.contains(&unique) {
                    break;
                }
            }
        }
        seen.insert(unique.clone());
        headers.push(unique);
    }

    headers
}

/// Render a cell as text; empty and error cells are `None`.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(
            cell.as_datetime()
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| cell.to_string()),
        ),
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook as XlsxWorkbook, XlsxError};

    fn inventory_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = XlsxWorkbook::new();

        let notes = workbook.add_worksheet();
        notes.set_name("Notas")?;
        notes.write_string(0, 0, "solo notas")?;

        let sheet = workbook.add_worksheet();
        sheet.set_name("Inventario")?;
        sheet.write_string(0, 0, "CODIGO")?;
        sheet.write_string(0, 1, "STOCK")?;
        sheet.write_string(0, 3, "PRECIO")?;
        sheet.write_string(1, 0, "A1")?;
        sheet.write_number(1, 1, 10)?;
        sheet.write_number(1, 3, 9.99)?;
        // row 2 left blank
        sheet.write_string(3, 0, "A2")?;
        sheet.write_boolean(3, 1, true)?;

        Ok(workbook.save_to_buffer()?)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_sheets() {
        let bytes = inventory_workbook().unwrap();
        assert_eq!(list_sheets(&bytes).unwrap(), vec!["Notas", "Inventario"]);
    }

    #[test]
    fn test_read_sheet() {
        let bytes = inventory_workbook().unwrap();
        let table = read_sheet(&bytes, "Inventario").unwrap();

        assert_eq!(table.headers, vec!["CODIGO", "STOCK", "Unnamed: 2", "PRECIO"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["CODIGO"], "A1");
        assert_eq!(table.rows[0]["STOCK"], "10");
        assert_eq!(table.rows[0]["PRECIO"], "9.99");
        assert!(!table.rows[0].contains_key("Unnamed: 2"));
        assert_eq!(table.rows[1]["STOCK"], "true");
        assert!(!table.rows[1].contains_key("PRECIO"));
    }

    #[test]
    fn test_repeated_headers_keep_first_column() {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in ["CODIGO", "PRECIO", "CODIGO", "CODIGO"].iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        for (c, v) in ["first", "9.5", "second", "third"].iter().enumerate() {
            sheet.write_string(1, c as u16, *v).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let table = read_sheet(&bytes, "Sheet1").unwrap();

        assert_eq!(table.headers, vec!["CODIGO", "PRECIO", "CODIGO.1", "CODIGO.2"]);
        assert_eq!(table.rows[0]["CODIGO"], "first");
        assert_eq!(table.rows[0]["CODIGO.1"], "second");
        assert_eq!(table.rows[0]["CODIGO.2"], "third");
    }

    #[test]
    fn test_dedupe_skips_taken_suffix() {
        let raw = ["A", "A.1", "A"].iter().map(|s| s.to_string());
        assert_eq!(dedupe_headers(raw), vec!["A", "A.1", "A.2"]);
    }

    #[test]
    fn test_date_cells_as_iso_text() {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "DESCRIPCION").unwrap();
        let date = ExcelDateTime::from_ymd(2024, 1, 15).unwrap();
        let format = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_datetime_with_format(1, 0, &date, &format).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = read_sheet(&bytes, "Sheet1").unwrap();

        assert_eq!(table.rows[0]["DESCRIPCION"], "2024-01-15 00:00:00");
    }

    #[test]
    fn test_read_missing_sheet() {
        let bytes = inventory_workbook().unwrap();
        match read_sheet(&bytes, "Hoja 1") {
            Err(SheetError::SheetNotFound { requested, available }) => {
                assert_eq!(requested, "Hoja 1");
                assert_eq!(available, vec!["Notas", "Inventario"]);
            }
            other => panic!("expected SheetNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_payload() {
        let result = list_sheets(b"CODIGO;STOCK\nA1;10");
        assert!(matches!(result, Err(SheetError::Unreadable(_))));
    }

    #[test]
    fn test_read_resolved_first_sheet() {
        let bytes = inventory_workbook().unwrap();
        let (name, table) = read_resolved(&bytes, Some("  "), None).unwrap();
        assert_eq!(name, "Notas");
        assert_eq!(table.headers, vec!["solo notas"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_resolve_sheet_order() {
        let available = names(&["Hoja 1", "Precios"]);

        assert_eq!(resolve_sheet(&available, Some(" Precios "), Some("Hoja 1")).unwrap(), "Precios");
        assert_eq!(resolve_sheet(&available, None, Some("Hoja 1")).unwrap(), "Hoja 1");
        assert_eq!(resolve_sheet(&available, Some(""), None).unwrap(), "Hoja 1");
        assert!(matches!(
            resolve_sheet(&available, Some("Otra"), None),
            Err(SheetError::SheetNotFound { .. })
        ));
        assert!(matches!(resolve_sheet(&[], None, None), Err(SheetError::NoSheets)));
        assert!(matches!(
            resolve_sheet(&[], None, Some("Hoja 1")),
            Err(SheetError::SheetNotFound { .. })
        ));
    }
}
