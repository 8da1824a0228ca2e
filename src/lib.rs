// Library module for testable functions

pub mod config;
pub mod error;
pub mod ingestion;
pub mod logging;

/// Calculate Grand Total in INR
/// Formula: total_value + duty_paid, with missing values counted as zero
pub fn grand_total(total_value: Option<f64>, duty_paid: Option<f64>) -> f64 {
    total_value.unwrap_or(0.0) + duty_paid.unwrap_or(0.0)
}

/// Calculate Landed Cost per Unit in INR
/// Formula: grand_total / quantity, None when quantity is missing or zero
pub fn landed_cost_per_unit(grand_total: f64, quantity: Option<f64>) -> Option<f64> {
    match quantity {
        Some(qty) if qty != 0.0 => Some(grand_total / qty),
        _ => None,
    }
}
