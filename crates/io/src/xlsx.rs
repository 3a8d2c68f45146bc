// Spreadsheet parsing (xlsx, xlsm, xlsb, xls, ods) and xlsx export

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use sheetdesk_engine::{Matrix, ParseError};

/// Read the first worksheet as a matrix of display strings.
///
/// The matrix starts at the sheet's first used cell. Rows with no non-empty
/// cell are dropped.
pub fn parse(bytes: &[u8]) -> Result<Matrix, ParseError> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ParseError::Corrupt(format!("failed to open spreadsheet: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::Corrupt(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows: Matrix = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(trim_trailing_empty(cells));
    }

    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }
    log::debug!("xlsx: sheet '{sheet_name}' read {} rows", rows.len());
    Ok(rows)
}

fn trim_trailing_empty(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

/// Display text of one calamine cell.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Integers without decimals.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Excel serial date (1900 system) to ISO text.
///
/// Whole serials render as dates, serials below 1 as times, anything else
/// as both.
pub fn serial_to_text(serial: f64) -> String {
    let has_date = serial.floor() > 0.0;
    let has_time = serial.fract().abs() > 0.0001;

    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return format_number(serial);
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let Some(stamp) = Duration::try_milliseconds(millis).and_then(|d| epoch.checked_add_signed(d)) else {
        return format_number(serial);
    };

    if has_date && has_time {
        stamp.format("%Y-%m-%d %H:%M:%S").to_string()
    } else if has_time {
        stamp.format("%H:%M:%S").to_string()
    } else {
        stamp.format("%Y-%m-%d").to_string()
    }
}

/// Write rows to a single-sheet xlsx workbook. Every cell is written as text
/// so identifiers keep their leading zeros.
pub fn export(table: &[Vec<String>], sheet_name: &str) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("invalid sheet name '{sheet_name}': {e}"))?;

    for (r, row) in table.iter().enumerate() {
        let row32 = u32::try_from(r).map_err(|_| format!("row {r} exceeds xlsx limits"))?;
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let col16 = u16::try_from(c).map_err(|_| format!("column {c} exceeds xlsx limits"))?;
            if r == 0 {
                worksheet
                    .write_string_with_format(row32, col16, value, &header_format)
                    .map_err(|e| format!("failed to write header cell {c}: {e}"))?;
            } else {
                worksheet
                    .write_string(row32, col16, value)
                    .map_err(|e| format!("failed to write cell ({r}, {c}): {e}"))?;
            }
        }
    }

    if !table.is_empty() {
        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| format!("failed to freeze header: {e}"))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("failed to encode xlsx: {e}"))
}
