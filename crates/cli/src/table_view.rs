// Plain-text table sink for `view` and `draft show`

use std::io::{self, Write};

use sheetdesk_engine::columns::CellKind;
use sheetdesk_engine::render::{RenderColumn, RenderSink, RenderedRow};
use sheetdesk_engine::validation::{BarcodeStatus, ValidationReport};

/// Collects rendered batches and prints an aligned table.
///
/// Marker columns: `x` for a selected row, `!` for a barcode error and `?`
/// for a warning. Input columns carry a `*` after their name.
pub struct TextTable<'a> {
    report: Option<&'a ValidationReport>,
    limit: Option<usize>,
    header: Vec<String>,
    lines: Vec<Vec<String>>,
    total: usize,
}

impl<'a> TextTable<'a> {
    pub fn new(report: Option<&'a ValidationReport>, limit: Option<usize>) -> Self {
        Self {
            report,
            limit,
            header: Vec::new(),
            lines: Vec::new(),
            total: 0,
        }
    }

    fn marker(&self, row: &RenderedRow) -> &'static str {
        match self.report.and_then(|r| r.get(row.id)).map(|v| v.status) {
            Some(BarcodeStatus::Error) => "!",
            Some(BarcodeStatus::Warning) => "?",
            _ => "",
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_aligned(out, &self.header, &self.lines)?;
        if self.lines.len() < self.total {
            writeln!(out, "... {} more rows", self.total - self.lines.len())?;
        }
        Ok(())
    }
}

/// Left-aligned columns separated by two spaces.
pub fn write_aligned<W: Write>(out: &mut W, header: &[String], lines: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in lines {
        for (w, cell) in widths.iter_mut().zip(line) {
            *w = (*w).max(cell.chars().count());
        }
    }

    write_line(out, header, &widths)?;
    for line in lines {
        write_line(out, line, &widths)?;
    }
    Ok(())
}

fn write_line<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| {
            let pad = w.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    writeln!(out, "{}", padded.join("  ").trim_end())
}

impl RenderSink for TextTable<'_> {
    fn header(&mut self, columns: &[RenderColumn]) {
        self.header = vec!["#".to_string(), String::new(), String::new()];
        self.header.extend(columns.iter().map(|c| match c.kind {
            CellKind::Input => format!("{}*", c.name),
            CellKind::ReadOnly => c.name.clone(),
        }));
    }

    fn rows(&mut self, batch: Vec<RenderedRow>) {
        for row in batch {
            self.total += 1;
            if self.limit.is_some_and(|limit| self.lines.len() >= limit) {
                continue;
            }
            let mut line = vec![
                row.index.to_string(),
                if row.selected { "x" } else { "" }.to_string(),
                self.marker(&row).to_string(),
            ];
            line.extend(row.cells.into_iter().map(|c| c.value));
            self.lines.push(line);
        }
    }

    fn finish(&mut self, total: usize) {
        log::debug!("rendered {total} rows");
    }
}
