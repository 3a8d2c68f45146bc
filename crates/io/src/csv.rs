// CSV/TSV parsing and export

use sheetdesk_engine::{Matrix, ParseError};

/// Parse delimited text into a matrix, sniffing the delimiter.
///
/// Rows whose fields are all blank are dropped. A file with nothing left
/// after that is `NoDataRows`.
pub fn parse(bytes: &[u8]) -> Result<Matrix, ParseError> {
    let content = decode(bytes);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let delimiter = sniff_delimiter(content);
    parse_with_delimiter(content, delimiter)
}

pub fn parse_with_delimiter(content: &str, delimiter: u8) -> Result<Matrix, ParseError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Matrix = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ParseError::Corrupt(format!("record {}: {e}", line + 1)))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(String::from).collect());
    }

    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }
    log::debug!(
        "csv: {} rows with delimiter {:?}",
        rows.len(),
        delimiter as char
    );
    Ok(rows)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                ::csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // First line must split into more than one field
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Bytes to text: UTF-8 when valid, otherwise Windows-1252 (Excel-exported CSVs).
pub fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            log::debug!("csv: input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Encode rows as delimited text. Quoting follows the `csv` crate defaults.
pub fn export(table: &[Vec<String>], delimiter: u8) -> Result<Vec<u8>, String> {
    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    for row in table {
        writer.write_record(row).map_err(|e| e.to_string())?;
    }

    writer.into_inner().map_err(|e| e.to_string())
}
