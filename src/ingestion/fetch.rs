//! Fetch functions - read the raw trade table from a spreadsheet or delimited file

use crate::error::EtlError;
use crate::ingestion::types::{RawData, RawTable};
use crate::ingestion::utils::{excel_serial_to_datetime, format_cell_number};
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];
const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// Read the whole input table into memory, every cell as optional text
pub fn read_table(raw: &RawData) -> Result<RawTable> {
    match raw {
        RawData::File(path) => read_file(path),
        RawData::Csv(text) => read_delimited(text.as_bytes(), b','),
    }
}

fn read_file(path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        return read_spreadsheet(path);
    }

    if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
        let delimiter = if extension == "tsv" { b'\t' } else { b',' };
        return read_delimited_path(path, delimiter);
    }

    // Unknown extension: spreadsheet first, then delimited text
    match read_spreadsheet(path) {
        Ok(table) => Ok(table),
        Err(e) => {
            debug!("{:?} is not a spreadsheet ({}), trying CSV", path, e);
            read_delimited_path(path, b',').map_err(|e| {
                debug!("{:?} is not CSV either: {}", path, e);
                anyhow::Error::from(EtlError::UnreadableInput {
                    path: path.to_path_buf(),
                })
            })
        }
    }
}

/// Read the first sheet; the first row holds the headers
pub fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    info!("Reading spreadsheet {:?}", path);

    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook {:?}", path))?;

    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(anyhow::anyhow!("No sheets found in workbook"));
    }

    let sheet_name = &sheet_names[0];
    info!("Reading sheet: {}", sheet_name);

    let range = workbook
        .worksheet_range(sheet_name)
        .with_context(|| format!("Failed to read sheet {}", sheet_name))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(idx, cell)| header_name(idx, cell_to_text(cell).as_deref()))
            .collect::<Vec<_>>(),
        None => {
            warn!("Sheet {} is empty", sheet_name);
            return Ok(RawTable::default());
        }
    };

    let headers = dedupe_headers(headers);
    let rows: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(cell_to_text).collect())
        .collect();

    info!("Read {} rows x {} columns", rows.len(), headers.len());

    Ok(RawTable { headers, rows })
}

/// Cell as text, the way it reads when the sheet is loaded with string dtype
fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(format_cell_number(*f)),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn header_name(idx: usize, raw: Option<&str>) -> String {
    match raw.map(|h| h.trim_start_matches('\u{feff}').trim()) {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => format!("Unnamed: {}", idx),
    }
}

/// Repeated header names get `.1`, `.2`, ... so every column stays addressable
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut repeats: HashMap<String, usize> = HashMap::new();

    headers
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }

            let count = repeats.entry(name.clone()).or_insert(0);
            loop {
                *count += 1;
                let candidate = format!("{}.{}", name, count);
                if seen.insert(candidate.clone()) {
                    warn!("Duplicate column {:?} renamed to {:?}", name, candidate);
                    return candidate;
                }
            }
        })
        .collect()
}

fn read_delimited_path(path: &Path, delimiter: u8) -> Result<RawTable> {
    info!("Reading delimited file {:?}", path);

    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_delimited(file, delimiter)
}

/// Parse delimited text; short rows are padded and long rows truncated to the header width
pub fn read_delimited<R: Read>(input: R, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .enumerate()
        .map(|(idx, h)| header_name(idx, Some(h)))
        .collect();
    let headers = dedupe_headers(headers);

    let width = headers.len();
    let mut rows = Vec::new();
    let mut ragged = 0;

    for (idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", idx + 1))?;

        if record.len() != width {
            ragged += 1;
            if ragged <= 10 {
                // Only log first 10 mismatches
                warn!(
                    "Row {} has {} fields, expected {}",
                    idx + 1,
                    record.len(),
                    width
                );
            }
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .take(width)
            .map(|field| (!field.is_empty()).then(|| field.to_string()))
            .collect();
        row.resize(width, None);
        rows.push(row);
    }

    if ragged > 0 {
        warn!("{} rows did not match the header width", ragged);
    }
    info!("Read {} rows x {} columns", rows.len(), width);

    Ok(RawTable { headers, rows })
}
