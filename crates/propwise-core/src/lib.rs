use serde::{Deserialize, Serialize};

mod listing;
mod preferences;

pub use listing::{Listing, RawNumber, RecommendationRecord};
pub use preferences::{
    DEFAULT_W_BUDGET, DEFAULT_W_RISK, DEFAULT_W_ROI, PreferenceVector, PreferenceWeights,
};

pub const GUEST_USER_KEY: &str = "guest";
pub const ANY_FILTER: &str = "Any";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Ordinal dataset risk: 1 is low, 2 is medium, every other value is high.
    pub fn from_base_risk(value: i64) -> Self {
        match value {
            1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    Roi,
    Risk,
    Price,
    Learned,
}

impl RankMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Roi => "roi",
            Self::Risk => "risk",
            Self::Price => "price",
            Self::Learned => "learned",
        }
    }
}

/// Single-criterion emphasis a user can ask for during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    Roi,
    Risk,
    Price,
}

impl Focus {
    /// One-off weights that put this criterion well above the mode threshold.
    pub fn override_weights(self) -> PreferenceWeights {
        match self {
            Self::Roi => PreferenceWeights::new(0.85, 0.10, 0.05),
            Self::Risk => PreferenceWeights::new(0.10, 0.85, 0.05),
            Self::Price => PreferenceWeights::new(0.10, 0.05, 0.85),
        }
    }
}

impl std::str::FromStr for Focus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "roi" | "higher roi" | "more roi" => Ok(Self::Roi),
            "risk" | "lower risk" | "less risk" | "safe" | "safer" => Ok(Self::Risk),
            "price" | "lower price" | "cheaper" | "budget" => Ok(Self::Price),
            other => Err(format!(
                "invalid focus '{other}', expected one of: roi, risk, price"
            )),
        }
    }
}

pub fn normalize_user_key(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        GUEST_USER_KEY.to_owned()
    } else {
        key
    }
}
