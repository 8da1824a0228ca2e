//! Clean functions - parse descriptions, coerce numbers and dates, derive financials

use crate::ingestion::parse::{parse_goods_description, parsing_pass};
use crate::ingestion::patterns::{normalize_unit, PatternLibrary};
use crate::ingestion::types::{CleanedRecord, CleanedTable, RawRecord, RawTable};
use crate::ingestion::utils::{clean_numeric, parse_day_first_date};
use crate::{grand_total, landed_cost_per_unit};
use chrono::Datelike;
use tracing::{debug, info};

/// Clean one row
/// Pure function - malformed fields degrade to None, the row is always produced
pub fn clean_record(patterns: &PatternLibrary, record: RawRecord<'_>) -> CleanedRecord {
    // Step 1: Stable copy of the description
    let raw_description = record.goods_description.unwrap_or_default().to_string();

    // Step 2: Parse description
    let parsed = parse_goods_description(patterns, Some(&raw_description));

    // Step 3: Normalize unit
    let unit_standard = normalize_unit(record.unit);

    // Step 4: Numeric coercion
    let unit_price_num = clean_numeric(record.unit_price);
    let total_value_num = clean_numeric(record.total_value);
    let duty_paid_num = clean_numeric(record.duty_paid);
    let quantity_num = clean_numeric(record.quantity);

    // Step 5: Shipment date
    let date = parse_day_first_date(record.shipment_date);
    let year = date.map(|d| d.year());
    let month = date.map(|d| d.month());

    // Step 6: Financials
    let grand_total = grand_total(total_value_num, duty_paid_num);
    let landed_cost_per_unit = landed_cost_per_unit(grand_total, quantity_num);

    // Step 7: Pass flag
    let parsing_pass = parsing_pass(parsed.parsing_confidence);

    CleanedRecord {
        original: record.values.to_vec(),
        raw_description,
        parsed,
        unit_standard,
        unit_price_num,
        total_value_num,
        duty_paid_num,
        quantity_num,
        date,
        year,
        month,
        grand_total,
        landed_cost_per_unit,
        parsing_pass,
    }
}

/// Counts of degraded fields, for the run summary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanStats {
    pub rows: usize,
    pub parsing_pass: usize,
    pub dates_parsed: usize,
    pub unparsable_dates: usize,
    pub unparsable_numbers: usize,
}

impl std::fmt::Display for CleanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows: {}, parsing_pass: {}, dates: {}, unparsable dates: {}, unparsable numbers: {}",
            self.rows,
            self.parsing_pass,
            self.dates_parsed,
            self.unparsable_dates,
            self.unparsable_numbers
        )
    }
}

/// Clean every row of the table, preserving input order and row count
pub fn clean_table(patterns: &PatternLibrary, raw: &RawTable) -> (CleanedTable, CleanStats) {
    info!("Cleaning {} rows", raw.len());

    let mut stats = CleanStats::default();
    let mut records = Vec::with_capacity(raw.len());

    for (idx, record) in raw.records().enumerate() {
        let cleaned = clean_record(patterns, record);
        tally(&mut stats, idx, &record, &cleaned);
        records.push(cleaned);
    }

    info!("Cleaning complete: {}", stats);

    (
        CleanedTable {
            headers: raw.headers.clone(),
            records,
        },
        stats,
    )
}

fn tally(stats: &mut CleanStats, idx: usize, raw: &RawRecord<'_>, cleaned: &CleanedRecord) {
    stats.rows += 1;

    if cleaned.parsing_pass {
        stats.parsing_pass += 1;
    }

    if cleaned.date.is_some() {
        stats.dates_parsed += 1;
    } else if is_present(raw.shipment_date) {
        stats.unparsable_dates += 1;
        if stats.unparsable_dates <= 10 {
            // Only log first 10 per field
            debug!("Row {}: unparsable shipment date {:?}", idx, raw.shipment_date);
        }
    }

    let numeric = [
        (raw.unit_price, cleaned.unit_price_num),
        (raw.total_value, cleaned.total_value_num),
        (raw.duty_paid, cleaned.duty_paid_num),
        (raw.quantity, cleaned.quantity_num),
    ];
    for (source, coerced) in numeric {
        if coerced.is_none() && is_present(source) {
            stats.unparsable_numbers += 1;
            if stats.unparsable_numbers <= 10 {
                debug!("Row {}: unparsable number {:?}", idx, source);
            }
        }
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
