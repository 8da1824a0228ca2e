//! Pattern library - compiled recognizers for goods descriptions and the unit table
//!
//! Patterns are compiled once per process into an immutable [`PatternLibrary`]
//! and handed to the parser by reference.

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency marker is optional; a bare number with a word boundary also matches
const USD_PRICE: &str = r"(?i)(?:(?:\bUSD|\bUS\$|\$)\s*|\b)(?P<usd>[0-9]{1,3}(?:[,.][0-9]{3})*(?:\.[0-9]+)?)\s*(?P<suffix>USD)?\b";
const EMBEDDED_QUANTITY: &str = r"(?i)\b(?P<qty>[0-9]{1,6})\b\s*(?:pcs|nos|pieces|units|set|sets)\b";
const CAPACITY: &str = r"(?i)(?P<cap>[0-9]{1,4}(?:\.[0-9]+)?\s*(?:ml|l|ltr|kg|g|mm|cm|in|inch|kw|hp))";
const MATERIAL: &str = r"(?i)\b(stainless\s*steel|steel|glass|borosilicate|opalware|plastic|wood|aluminium|brass|copper)\b";
const MODEL_NUMBER: &str = r"\b([A-Z0-9]{2,20}(?:[-/][A-Z0-9]{1,20})?)\b";
const NAME_SEPARATORS: &str = r"[\s,;|()/-]+";
const NUMERIC_TOKEN: &str = r"^\d+$";

/// Only the first few tokens are considered for the model name
const MODEL_NAME_WINDOW: usize = 6;

/// Raw unit spelling -> standard unit
const UNIT_MAP: &[(&str, &str)] = &[
    ("pcs", "pcs"),
    ("pcs.", "pcs"),
    ("pieces", "pcs"),
    ("nos", "pcs"),
    ("no.", "pcs"),
    ("no", "pcs"),
    ("units", "pcs"),
    ("kg", "kg"),
    ("kgs", "kg"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("mt", "mt"),
    ("ton", "mt"),
    ("tons", "mt"),
    ("set", "set"),
    ("sets", "set"),
];

static PATTERNS: Lazy<PatternLibrary> = Lazy::new(PatternLibrary::compile);

/// A USD price match; `marked` is true when a currency marker was present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdPriceMatch<'a> {
    pub amount: &'a str,
    pub marked: bool,
}

#[derive(Debug)]
pub struct PatternLibrary {
    usd_price: Regex,
    embedded_quantity: Regex,
    capacity: Regex,
    material: Regex,
    model_number: Regex,
    name_separators: Regex,
    numeric_token: Regex,
}

impl PatternLibrary {
    /// Process-wide compiled library
    pub fn global() -> &'static PatternLibrary {
        &PATTERNS
    }

    fn compile() -> Self {
        let compile = |pattern: &str| {
            Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
        };

        PatternLibrary {
            usd_price: compile(USD_PRICE),
            embedded_quantity: compile(EMBEDDED_QUANTITY),
            capacity: compile(CAPACITY),
            material: compile(MATERIAL),
            model_number: compile(MODEL_NUMBER),
            name_separators: compile(NAME_SEPARATORS),
            numeric_token: compile(NUMERIC_TOKEN),
        }
    }

    /// First price carrying a currency marker, else the first bare number
    pub fn usd_price<'a>(&self, text: &'a str) -> Option<UsdPriceMatch<'a>> {
        let mut first_bare = None;

        for caps in self.usd_price.captures_iter(text) {
            let (Some(whole), Some(amount)) = (caps.get(0), caps.name("usd")) else {
                continue;
            };
            let marked = whole.start() < amount.start() || caps.name("suffix").is_some();
            let found = UsdPriceMatch {
                amount: amount.as_str(),
                marked,
            };

            if marked {
                return Some(found);
            }
            first_bare.get_or_insert(found);
        }

        first_bare
    }

    /// Integer count followed by a piece/set unit word
    pub fn embedded_quantity<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.embedded_quantity
            .captures(text)
            .and_then(|caps| caps.name("qty"))
            .map(|m| m.as_str())
    }

    /// Number plus capacity/dimension unit, verbatim and trimmed
    pub fn capacity<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.capacity
            .captures(text)
            .and_then(|caps| caps.name("cap"))
            .map(|m| m.as_str().trim())
    }

    pub fn has_capacity(&self, text: &str) -> bool {
        self.capacity.is_match(text)
    }

    pub fn material(&self, text: &str) -> Option<String> {
        self.material
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    }

    pub fn has_material(&self, text: &str) -> bool {
        self.material.is_match(text)
    }

    /// Prefers the first code containing a digit, `/` or `-`; falls back to the first code
    pub fn model_number<'a>(&self, text: &'a str) -> Option<&'a str> {
        let mut first = None;

        for m in self.model_number.find_iter(text) {
            let token = m.as_str();
            if token.contains(|c: char| c.is_ascii_digit() || c == '/' || c == '-') {
                return Some(token);
            }
            first.get_or_insert(token);
        }

        first
    }

    /// First leading token that looks like a word rather than a number, size or material
    pub fn model_name<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.name_separators
            .split(text)
            .take(MODEL_NAME_WINDOW)
            .find(|token| {
                token.chars().count() > 2
                    && !self.numeric_token.is_match(token)
                    && !self.has_capacity(token)
                    && !self.has_material(token)
            })
    }
}

/// Map a raw unit spelling to its standard form
/// Unmapped units pass through lower-cased and trimmed; absent input stays absent
pub fn normalize_unit(unit: Option<&str>) -> Option<String> {
    let key = unit?.trim().to_lowercase();

    let standard = UNIT_MAP
        .iter()
        .find(|(raw, _)| *raw == key)
        .map(|(_, standard)| standard.to_string());

    Some(standard.unwrap_or(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Model ABC-123, 500 ml Stainless Steel Jar, 24 pcs, USD 12.50";

    #[test]
    fn test_usd_price_prefers_marked_amount() {
        let lib = PatternLibrary::global();
        let m = lib.usd_price(SAMPLE).unwrap();
        assert_eq!(m.amount, "12.50");
        assert!(m.marked);

        let m = lib.usd_price("Bowl set US$ 1,250.75 FOB").unwrap();
        assert_eq!(m.amount, "1,250.75");

        let m = lib.usd_price("Kettle $9.99").unwrap();
        assert_eq!(m.amount, "9.99");

        // Trailing marker
        let m = lib.usd_price("Tray 7.25 USD each").unwrap();
        assert_eq!(m.amount, "7.25");
        assert!(m.marked);
    }

    #[test]
    fn test_usd_price_bare_number_fallback() {
        let lib = PatternLibrary::global();
        let m = lib.usd_price("Lunch box 750").unwrap();
        assert_eq!(m.amount, "750");
        assert!(!m.marked);

        assert!(lib.usd_price("no digits at all").is_none());
    }

    #[test]
    fn test_embedded_quantity() {
        let lib = PatternLibrary::global();
        assert_eq!(lib.embedded_quantity(SAMPLE), Some("24"));
        assert_eq!(lib.embedded_quantity("Dinner set 6 Sets"), Some("6"));
        assert_eq!(lib.embedded_quantity("100 NOS bottles"), Some("100"));
        // Unit word glued to the number has no boundary
        assert_eq!(lib.embedded_quantity("24pcs"), None);
        // More than six digits
        assert_eq!(lib.embedded_quantity("1234567 pcs"), None);
    }

    #[test]
    fn test_capacity() {
        let lib = PatternLibrary::global();
        assert_eq!(lib.capacity(SAMPLE), Some("500 ml"));
        assert_eq!(lib.capacity("Kettle 1.5L electric"), Some("1.5L"));
        assert_eq!(lib.capacity("Motor 2 HP"), Some("2 HP"));
        assert_eq!(lib.capacity("Plain bowl"), None);
    }

    #[test]
    fn test_material() {
        let lib = PatternLibrary::global();
        assert_eq!(lib.material(SAMPLE), Some("stainless steel".to_string()));
        assert_eq!(lib.material("BOROSILICATE mixing bowl"), Some("borosilicate".to_string()));
        assert_eq!(lib.material("Steelcase chair"), None);
    }

    #[test]
    fn test_model_number_preference() {
        let lib = PatternLibrary::global();
        assert_eq!(lib.model_number(SAMPLE), Some("ABC-123"));
        // No qualifying code: first match wins
        assert_eq!(lib.model_number("JAR WITH LID"), Some("JAR"));
        // Digit-bearing code preferred over earlier plain code
        assert_eq!(lib.model_number("BOWL XL 45/B"), Some("45/B"));
        assert_eq!(lib.model_number("lowercase only"), None);
    }

    #[test]
    fn test_model_name() {
        let lib = PatternLibrary::global();
        assert_eq!(lib.model_name(SAMPLE), Some("Model"));
        // Skips short, numeric, capacity and material tokens
        assert_eq!(lib.model_name("12 x 500ml Glass Tumbler"), Some("Tumbler"));
        // Only the first six tokens are scanned
        assert_eq!(lib.model_name("1 2 3 4 5 6 Tumbler"), None);
        assert_eq!(lib.model_name(""), None);
        // Only decimal digits count as numeric
        assert_eq!(lib.model_name("½½½ Jar"), Some("½½½"));
        assert_eq!(lib.model_name("٣٣٣ Jar"), Some("Jar"));
    }

    #[test]
    fn test_normalize_unit() {
        assert_eq!(normalize_unit(Some(" PCS. ")), Some("pcs".to_string()));
        assert_eq!(normalize_unit(Some("Nos")), Some("pcs".to_string()));
        assert_eq!(normalize_unit(Some("Kilograms")), Some("kg".to_string()));
        assert_eq!(normalize_unit(Some("TONS")), Some("mt".to_string()));
        assert_eq!(normalize_unit(Some("Sets")), Some("set".to_string()));
        // Unmapped passes through lower-cased
        assert_eq!(normalize_unit(Some(" Dozen ")), Some("dozen".to_string()));
        assert_eq!(normalize_unit(None), None);
    }
}
