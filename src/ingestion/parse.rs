//! Parse functions - extract structured fields from free-text goods descriptions

use crate::ingestion::patterns::PatternLibrary;
use crate::ingestion::types::ParsedFields;

/// Rows at or above this confidence are flagged as reliable parses
pub const PASS_THRESHOLD: f64 = 2.0;

/// Recognizers that contribute to the parsing confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognizer {
    UsdPrice,
    EmbeddedQuantity,
    Capacity,
    Material,
    ModelNumber,
    ModelName,
}

impl Recognizer {
    /// Fixed weight added when this recognizer matches
    pub fn weight(&self) -> f64 {
        match self {
            Recognizer::UsdPrice => 1.0,
            Recognizer::EmbeddedQuantity => 0.8,
            Recognizer::Capacity => 0.8,
            Recognizer::Material => 0.7,
            Recognizer::ModelNumber => 1.0,
            Recognizer::ModelName => 0.3,
        }
    }
}

/// Sum of the weights of the recognizers that matched
/// Additive and unclamped, so it can exceed 1.0
pub fn confidence_score(matched: &[Recognizer]) -> f64 {
    matched.iter().map(Recognizer::weight).sum()
}

pub fn parsing_pass(confidence: f64) -> bool {
    confidence >= PASS_THRESHOLD
}

/// Parse one goods description
/// Total: absent, blank or unmatched input yields the all-null record with confidence 0.0
pub fn parse_goods_description(patterns: &PatternLibrary, description: Option<&str>) -> ParsedFields {
    let mut out = ParsedFields::default();

    let raw = match description {
        Some(text) if !text.trim().is_empty() => text,
        _ => return out,
    };

    let mut matched = Vec::with_capacity(6);

    // USD price - conversion failures drop the field and its weight
    if let Some(found) = patterns.usd_price(raw) {
        if let Ok(usd) = found.amount.replace(',', "").parse::<f64>() {
            out.original_unit_price_usd = Some(usd);
            matched.push(Recognizer::UsdPrice);
        }
    }

    if let Some(qty) = patterns.embedded_quantity(raw) {
        if let Ok(qty) = qty.parse::<i64>() {
            out.embedded_quantity = Some(qty);
            matched.push(Recognizer::EmbeddedQuantity);
        }
    }

    if let Some(cap) = patterns.capacity(raw) {
        out.capacity_spec = Some(cap.to_string());
        matched.push(Recognizer::Capacity);
    }

    if let Some(material) = patterns.material(raw) {
        out.material = Some(material);
        matched.push(Recognizer::Material);
    }

    if let Some(model) = patterns.model_number(raw) {
        out.model_number = Some(model.to_string());
        matched.push(Recognizer::ModelNumber);
    }

    if let Some(name) = patterns.model_name(raw) {
        out.model_name = Some(name.to_string());
        matched.push(Recognizer::ModelName);
    }

    out.parsing_confidence = confidence_score(&matched);
    out
}
