use serde::{Deserialize, Serialize};

use crate::RiskLevel;

/// A numeric dataset cell, either already numeric or still text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view used for ordinal fields. Finite numbers truncate toward zero;
    /// text must be an integer literal.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(value.trunc() as i64),
            Self::Number(_) => None,
            Self::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub name: String,
    pub city: String,
    #[serde(rename = "type", alias = "property_type")]
    pub property_type: String,
    pub price: RawNumber,
    pub expected_roi: RawNumber,
    pub base_risk: RawNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Listing {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        property_type: impl Into<String>,
        price: f64,
        expected_roi: f64,
        base_risk: i64,
    ) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            property_type: property_type.into(),
            price: price.into(),
            expected_roi: expected_roi.into(),
            base_risk: base_risk.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Display-ready ranking output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub name: String,
    pub city: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub price: f64,
    pub roi: f64,
    pub risk: RiskLevel,
    pub risk_text: String,
    pub url: String,
}

impl RecommendationRecord {
    pub fn relative_budget_distance(&self, budget: f64) -> f64 {
        (self.price - budget).abs() / budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_number_accepts_numbers_and_numeric_text() {
        assert_eq!(RawNumber::from(2.5).as_f64(), Some(2.5));
        assert_eq!(RawNumber::from(" 0.09 ").as_f64(), Some(0.09));
        assert_eq!(RawNumber::from("2,000,000").as_f64(), None);
        assert_eq!(RawNumber::from("n/a").as_f64(), None);
    }

    #[test]
    fn raw_number_integer_view_truncates_and_rejects_non_finite() {
        assert_eq!(RawNumber::from(2.9).as_i64(), Some(2));
        assert_eq!(RawNumber::from("3").as_i64(), Some(3));
        assert_eq!(RawNumber::from("2.0").as_i64(), None);
        assert_eq!(RawNumber::from(f64::NAN).as_i64(), None);
        assert_eq!(RawNumber::from(f64::INFINITY).as_i64(), None);
    }

    #[test]
    fn listing_deserializes_mixed_numeric_cells() {
        let raw = r#"{
            "name": "Nile View",
            "city": "Cairo",
            "type": "apartment",
            "price": 2000000,
            "expected_roi": "0.09",
            "base_risk": 1
        }"#;

        let listing: Listing = serde_json::from_str(raw).expect("parse listing");

        assert_eq!(listing.price.as_f64(), Some(2_000_000.0));
        assert_eq!(listing.expected_roi.as_f64(), Some(0.09));
        assert_eq!(listing.base_risk.as_i64(), Some(1));
        assert_eq!(listing.url, None);
    }

    #[test]
    fn record_serializes_type_and_risk_text() {
        let record = RecommendationRecord {
            name: "Nile View".to_owned(),
            city: "Cairo".to_owned(),
            property_type: "apartment".to_owned(),
            price: 2_000_000.0,
            roi: 0.09,
            risk: RiskLevel::Low,
            risk_text: RiskLevel::Low.label().to_owned(),
            url: String::new(),
        };

        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(value["type"], "apartment");
        assert_eq!(value["risk"], "low");
        assert_eq!(value["risk_text"], "Low Risk");
    }
}
