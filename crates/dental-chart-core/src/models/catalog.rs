//! Condition and procedure catalog models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monetary amount in integer cents.
///
/// Serialized as a two-decimal string (e.g., "120.00").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price {
    cents: i64,
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    pub fn from_cents(cents: i64) -> Option<Self> {
        (cents >= 0).then_some(Self { cents })
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Parse a decimal amount such as "120", "120.5" or "120.00".
    ///
    /// Negative amounts and more than two fractional digits are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };
        whole
            .checked_mul(100)?
            .checked_add(frac_cents)
            .and_then(Price::from_cents)
    }

    pub fn saturating_add(self, other: Price) -> Price {
        Price {
            cents: self.cents.saturating_add(other.cents),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl TryFrom<String> for Price {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Price::parse(&value).ok_or_else(|| format!("invalid price: {}", value))
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}

/// An entry in the condition catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionCatalogEntry {
    /// Catalog identifier
    pub id: i64,
    /// Condition name (e.g., "Cavity")
    pub name: String,
    /// Short code (e.g., "C01")
    pub code: String,
    /// Longer description
    pub description: String,
    /// Hex color used by charting front ends
    pub color_code: Option<String>,
    /// Icon name used by charting front ends
    pub icon: Option<String>,
    /// Whether this entry ships with the standard catalog
    pub is_standard: bool,
}

impl ConditionCatalogEntry {
    pub fn new(id: i64, name: String, code: String) -> Self {
        Self {
            id,
            name,
            code,
            description: String::new(),
            color_code: None,
            icon: None,
            is_standard: true,
        }
    }
}

/// An entry in the procedure catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcedureCatalogEntry {
    /// Catalog identifier
    pub id: i64,
    /// Procedure name (e.g., "Amalgam Filling (1 surface)")
    pub name: String,
    /// Procedure code (e.g., "D2140")
    pub code: String,
    /// Longer description
    pub description: String,
    /// Category (e.g., "restorative", "general")
    pub category: String,
    /// Price applied when a charted procedure omits one
    pub default_price: Price,
    /// Typical chair time
    pub duration_minutes: u32,
    /// Whether this entry ships with the standard catalog
    pub is_standard: bool,
}

impl ProcedureCatalogEntry {
    pub fn new(id: i64, name: String, code: String, default_price: Price) -> Self {
        Self {
            id,
            name,
            code,
            description: String::new(),
            category: String::new(),
            default_price,
            duration_minutes: 30,
            is_standard: true,
        }
    }
}

/// What a charted condition or procedure refers to.
///
/// Either a catalog entry (with its name and code embedded at read time) or
/// a custom definition stored inline on the charted entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryReference {
    Catalog {
        catalog_id: i64,
        name: String,
        code: String,
    },
    Custom {
        name: String,
        code: String,
        description: Option<String>,
    },
}

impl EntryReference {
    pub fn catalog_id(&self) -> Option<i64> {
        match self {
            EntryReference::Catalog { catalog_id, .. } => Some(*catalog_id),
            EntryReference::Custom { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntryReference::Catalog { name, .. } | EntryReference::Custom { name, .. } => name,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            EntryReference::Catalog { code, .. } | EntryReference::Custom { code, .. } => code,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, EntryReference::Custom { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_parse() {
        assert_eq!(Price::parse("120").unwrap().cents(), 12000);
        assert_eq!(Price::parse("120.5").unwrap().cents(), 12050);
        assert_eq!(Price::parse("120.05").unwrap().cents(), 12005);
        assert_eq!(Price::parse(" 0.99 ").unwrap().cents(), 99);
        assert!(Price::parse("-5").is_none());
        assert!(Price::parse("1.234").is_none());
        assert!(Price::parse("abc").is_none());
        assert!(Price::parse(".50").is_none());
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(12000).unwrap().to_string(), "120.00");
        assert_eq!(Price::from_cents(5).unwrap().to_string(), "0.05");
        assert!(Price::from_cents(-1).is_none());
    }

    #[test]
    fn test_price_serde() {
        let price = Price::parse("850").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"850.00\"");
        let back: Price = serde_json::from_str("\"850.00\"").unwrap();
        assert_eq!(back, price);
    }

    #[test]
    fn test_reference_accessors() {
        let custom = EntryReference::Custom {
            name: "Unusual Wear".into(),
            code: "CUST-1A2B3C".into(),
            description: None,
        };
        assert!(custom.is_custom());
        assert_eq!(custom.catalog_id(), None);
        assert_eq!(custom.name(), "Unusual Wear");

        let catalog = EntryReference::Catalog {
            catalog_id: 3,
            name: "Cavity".into(),
            code: "C01".into(),
        };
        assert_eq!(catalog.catalog_id(), Some(3));
        assert_eq!(catalog.code(), "C01");
    }
}
