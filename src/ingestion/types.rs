//! Core data types for the trade pipeline

use chrono::NaiveDate;
use std::path::PathBuf;

// Source columns the cleaner reads
pub const COL_GOODS_DESCRIPTION: &str = "Goods Description";
pub const COL_UNIT: &str = "Unit";
pub const COL_UNIT_PRICE: &str = "Unit Price (INR)";
pub const COL_TOTAL_VALUE: &str = "Total Value (INR)";
pub const COL_DUTY_PAID: &str = "Duty Paid (INR)";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_SHIPMENT_DATE: &str = "Date of Shipment";

/// Columns appended by the cleaner, in output order
pub const DERIVED_COLUMNS: [&str; 19] = [
    "raw_description",
    "model_name",
    "model_number",
    "capacity_spec",
    "material",
    "embedded_quantity",
    "original_unit_price_usd",
    "parsing_confidence",
    "Unit_standard",
    "Unit Price (INR)_num",
    "Total Value (INR)_num",
    "Duty Paid (INR)_num",
    "Quantity_num",
    "Date",
    "Year",
    "Month",
    "Grand Total (INR)",
    "Landed Cost per Unit (INR)",
    "parsing_pass",
];

/// Raw input sources
#[derive(Debug)]
pub enum RawData {
    File(PathBuf),
    Csv(String),
}

/// Whole input table, every cell kept as optional text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Borrowed views of every row, resolved against the known source columns
    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> + '_ {
        let columns = SourceColumns::locate(self);
        self.rows.iter().map(move |row| columns.record(row))
    }
}

/// Positions of the known source columns; `None` when the input lacks one
#[derive(Debug, Clone, Copy)]
struct SourceColumns {
    goods_description: Option<usize>,
    unit: Option<usize>,
    unit_price: Option<usize>,
    total_value: Option<usize>,
    duty_paid: Option<usize>,
    quantity: Option<usize>,
    shipment_date: Option<usize>,
}

impl SourceColumns {
    fn locate(table: &RawTable) -> Self {
        SourceColumns {
            goods_description: table.column_index(COL_GOODS_DESCRIPTION),
            unit: table.column_index(COL_UNIT),
            unit_price: table.column_index(COL_UNIT_PRICE),
            total_value: table.column_index(COL_TOTAL_VALUE),
            duty_paid: table.column_index(COL_DUTY_PAID),
            quantity: table.column_index(COL_QUANTITY),
            shipment_date: table.column_index(COL_SHIPMENT_DATE),
        }
    }

    fn record<'a>(&self, row: &'a [Option<String>]) -> RawRecord<'a> {
        let cell = move |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|v| v.as_deref());

        RawRecord {
            values: row,
            goods_description: cell(self.goods_description),
            unit: cell(self.unit),
            unit_price: cell(self.unit_price),
            total_value: cell(self.total_value),
            duty_paid: cell(self.duty_paid),
            quantity: cell(self.quantity),
            shipment_date: cell(self.shipment_date),
        }
    }
}

/// One input row - all fields optional text
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    pub values: &'a [Option<String>],
    pub goods_description: Option<&'a str>,
    pub unit: Option<&'a str>,
    pub unit_price: Option<&'a str>,
    pub total_value: Option<&'a str>,
    pub duty_paid: Option<&'a str>,
    pub quantity: Option<&'a str>,
    pub shipment_date: Option<&'a str>,
}

/// Fields extracted from a goods description
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields {
    pub model_name: Option<String>,
    pub model_number: Option<String>,
    pub capacity_spec: Option<String>,
    pub material: Option<String>,
    pub embedded_quantity: Option<i64>,
    pub original_unit_price_usd: Option<f64>,
    pub parsing_confidence: f64, // additive, not clamped
}

/// Cleaned row: original cells plus parsed, coerced and derived fields
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub original: Vec<Option<String>>,
    pub raw_description: String,
    pub parsed: ParsedFields,
    pub unit_standard: Option<String>,

    // Coerced numeric columns
    pub unit_price_num: Option<f64>,
    pub total_value_num: Option<f64>,
    pub duty_paid_num: Option<f64>,
    pub quantity_num: Option<f64>,

    // Shipment date
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,

    // Financial derivations
    pub grand_total: f64,
    pub landed_cost_per_unit: Option<f64>,

    pub parsing_pass: bool,
}

/// Cleaned table; `headers` are the original input headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    pub headers: Vec<String>,
    pub records: Vec<CleanedRecord>,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Write operation statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteStats {
    pub inserted: usize,
    pub batches: usize,
}

impl std::fmt::Display for WriteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inserted: {}, batches: {}", self.inserted, self.batches)
    }
}
